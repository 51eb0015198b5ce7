//! X11 screen locker
//!
//! A thin shell over [`scrlock_app::Runtime`] that provides X11-specific
//! I/O. All locking logic lives in the generic runtime and the
//! [`scrlock_core::Session`] state machine.

#![forbid(unsafe_code)]

pub mod color;
pub mod display;
pub mod keymap;

pub use display::{X11Display, X11Error, X11Overlay};
