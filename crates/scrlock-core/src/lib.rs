//! scrlock session core
//!
//! Pure state machine logic for the screen locker, completely decoupled from
//! the windowing system, the credential store and process management.
//!
//! # Architecture
//!
//! The [`Session`] consumes normalized input events and produces declarative
//! [`LockAction`]s describing the effects it wants (redraw, bell, spawn a
//! helper, save a message, release the surfaces). A runtime interprets those
//! actions against real I/O; the simulation harness interprets them against
//! recorded fakes. Both run the same state machine.
//!
//! Surface acquisition is the one place where the core talks to the outside
//! world directly, and it does so only through the [`Display`] trait so that
//! capture faults can be injected deterministically.
//!
//! # Components
//!
//! - [`buffer`]: bounded input accumulator with zeroize-on-clear
//! - [`key`]: raw key press normalization
//! - [`session`]: lock-session state machine
//! - [`capture`]: multi-surface capture with bounded retry
//! - [`display`]: windowing collaborator abstraction
//! - [`verify`]: credential verifier abstraction
//! - [`config`]: capability flags and limits
//! - [`error`]: error types

#![forbid(unsafe_code)]

pub mod buffer;
pub mod capture;
pub mod config;
pub mod display;
pub mod error;
pub mod key;
pub mod session;
pub mod verify;

pub use buffer::InputBuffer;
pub use capture::{CaptureManager, SurfaceHandle};
pub use config::{RetryPolicy, SessionConfig};
pub use display::{Display, DisplayEvent, Screen};
pub use error::{CaptureError, SessionError, SurfaceFailure};
pub use key::{Key, KeyPress};
pub use session::{LockAction, LockEvent, LockState, Mode, Session};
pub use verify::{CredentialVerifier, Verdict};
