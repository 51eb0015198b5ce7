//! Application layer for scrlock
//!
//! Generic runtime that drives the pure [`scrlock_core::Session`] against a
//! [`scrlock_core::Display`], plus the collaborators the session's actions
//! need: side-effect helper supervision, message persistence and the
//! credential store.
//!
//! # Components
//!
//! - [`Runtime`]: capture, event loop, action execution, teardown
//! - [`SideEffectSupervisor`]: launches and reaps helper jobs
//! - [`MessageSink`]: persists messages left on the lock screen
//! - [`credentials`]: invoking user's hash lookup and privilege drop
//! - [`Settings`]: optional TOML settings file

#![forbid(unsafe_code)]

pub mod credentials;
mod error;
mod runtime;
mod settings;
mod sink;
mod supervisor;

pub use credentials::HashVerifier;
pub use error::{CredentialError, RuntimeError, SettingsError};
pub use runtime::{Outcome, Runtime};
pub use settings::{Appearance, CaptureSettings, MessageSettings, Settings, SideEffectSettings};
pub use sink::{FileMessageSink, MessageSink, format_record};
pub use supervisor::{CommandLauncher, Job, Launcher, SideEffectJob, SideEffectSupervisor};
