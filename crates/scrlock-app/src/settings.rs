//! Settings file support.
//!
//! Settings are read from `~/.config/scrlock/config.toml`. Every key is
//! optional and falls back to the built-in defaults below.
//!
//! # Error Handling
//!
//! - If the file doesn't exist, default values are returned.
//! - If the file exists but is invalid, an error is returned (fail fast); a
//!   locker that silently ignores its settings is a locker you can't trust.
//!
//! # Example
//!
//! ```toml
//! [appearance]
//! idle_color = "black"
//! active_color = "#006600"
//! font = "-*-lucida-bold-r-*-*-20-140-*-*-*-*-iso8859-15"
//!
//! [message]
//! enabled = true
//! max_len = 50
//! hint = "Press ctrl + space to let a message"
//! log = ".scrlock/messages"        # relative to $HOME
//!
//! [side_effect]
//! enabled = true
//! command = "Prog/error.sh"        # relative to $HOME unless absolute
//! capture_dir = ".scrlock/captures"
//!
//! [capture]
//! max_attempts = 1000
//! delay_ms = 1
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use scrlock_core::{RetryPolicy, SessionConfig};
use serde::Deserialize;

use crate::error::SettingsError;

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Colors and font.
    pub appearance: Appearance,
    /// Message mode.
    pub message: MessageSettings,
    /// Helper launched on rejected attempts.
    pub side_effect: SideEffectSettings,
    /// Grab retry budget.
    pub capture: CaptureSettings,
}

/// Colors and font of the overlays.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Appearance {
    /// Color while nothing is typed
    pub idle_color: String,
    /// Color once something is typed
    pub active_color: String,
    /// Core X font used for hint and message text
    pub font: String,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            idle_color: "black".to_string(),
            active_color: "#006600".to_string(),
            font: "-*-lucida-bold-r-*-*-20-140-*-*-*-*-iso8859-15".to_string(),
        }
    }
}

/// Message mode settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageSettings {
    /// Allow ctrl+space to leave a message
    pub enabled: bool,
    /// Maximum message length
    pub max_len: usize,
    /// Text shown on the idle screen
    pub hint: String,
    /// Message log, relative to home unless absolute
    pub log: PathBuf,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_len: 50,
            hint: "Press ctrl + space to let a message".to_string(),
            log: PathBuf::from(".scrlock/messages"),
        }
    }
}

/// Side-effect helper settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SideEffectSettings {
    /// Launch the helper on every rejected attempt
    pub enabled: bool,
    /// Helper program, relative to home unless absolute
    pub command: PathBuf,
    /// Directory the helper writes into, relative to home unless absolute
    pub capture_dir: PathBuf,
}

impl Default for SideEffectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command: PathBuf::from("Prog/error.sh"),
            capture_dir: PathBuf::from(".scrlock/captures"),
        }
    }
}

/// Grab retry budget.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureSettings {
    /// Attempts per grab
    pub max_attempts: u32,
    /// Milliseconds between attempts
    pub delay_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self { max_attempts: policy.max_attempts, delay_ms: policy.delay.as_millis() as u64 }
    }
}

/// Longest message a single core-font text request can carry.
const MESSAGE_LEN_LIMIT: usize = 200;

impl Settings {
    /// `~/.config/scrlock/config.toml`, if a config directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scrlock").join("config.toml"))
    }

    /// Load from [`Self::default_path`]; defaults if there is no file.
    pub fn load() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`; defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.message.max_len == 0 || self.message.max_len > MESSAGE_LEN_LIMIT {
            return Err(SettingsError::Invalid(format!(
                "message.max_len must be between 1 and {MESSAGE_LEN_LIMIT}, got {}",
                self.message.max_len
            )));
        }
        if self.capture.max_attempts == 0 {
            return Err(SettingsError::Invalid("capture.max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Session limits and capabilities.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            message_max_len: self.message.max_len,
            message_enabled: self.message.enabled,
            side_effect_enabled: self.side_effect.enabled,
            ..SessionConfig::default()
        }
    }

    /// Grab retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.capture.max_attempts,
            delay: Duration::from_millis(self.capture.delay_ms),
        }
    }

    /// Idle-screen hint, only when message mode is available.
    pub fn hint(&self) -> Option<&str> {
        self.message.enabled.then_some(self.message.hint.as_str())
    }

    /// Message log location.
    pub fn message_log(&self, home: &Path) -> PathBuf {
        home.join(&self.message.log)
    }

    /// Helper program location.
    pub fn helper_command(&self, home: &Path) -> PathBuf {
        home.join(&self.side_effect.command)
    }

    /// Helper artifact directory.
    pub fn capture_dir(&self, home: &Path) -> PathBuf {
        home.join(&self.side_effect.capture_dir)
    }
}
