//! Application error types.

use std::path::PathBuf;

use scrlock_core::{CaptureError, SessionError};
use thiserror::Error;

/// Errors that end a lock session.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No surface could be captured
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The display failed while locked; surfaces were released before this
    /// error was returned
    #[error("display failure: {0}")]
    Display(#[source] Box<dyn std::error::Error + Send + 'static>),

    /// The state machine refused an event
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The invoking user's credential cannot be resolved.
///
/// Always fatal at startup: locking without a way to unlock is worse than not
/// locking.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// passwd lookup failed
    #[error("cannot retrieve password entry: {0}")]
    Lookup(#[from] nix::errno::Errno),

    /// No passwd entry for the real uid
    #[error("no password entry for uid {uid}")]
    NoPasswdEntry {
        /// Real uid
        uid: u32,
    },

    /// Shadow file unreadable (not installed setuid/setgid?)
    #[error("cannot read shadow file {path}: {source}")]
    ShadowUnreadable {
        /// Shadow file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No shadow entry for the user
    #[error("no shadow entry for user {user}")]
    NoShadowEntry {
        /// User name
        user: String,
    },

    /// Stored hash is empty, locked or not valid text
    #[error("unusable password hash for user {user}")]
    UnusableHash {
        /// User name
        user: String,
    },

    /// setgid/setuid failed
    #[error("cannot drop privileges: {0}")]
    DropPrivileges(#[source] nix::errno::Errno),
}

/// Settings file errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the settings file
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid setting: {0}")]
    Invalid(String),
}
