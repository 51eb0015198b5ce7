//! Error types for surface capture and the session state machine.

use thiserror::Error;

use crate::session::LockState;

/// Why a single surface could not be captured.
///
/// These are recovered per surface by abandoning it; they only become fatal
/// through [`CaptureError::NothingCaptured`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceFailure {
    /// The overlay window or its colors could not be created
    #[error("surface {surface}: overlay setup failed: {reason}")]
    Overlay {
        /// Surface index
        surface: usize,
        /// Display-level error message
        reason: String,
    },

    /// Pointer grab still refused after the retry budget
    #[error("surface {surface}: cannot grab pointer after {attempts} attempts")]
    Pointer {
        /// Surface index
        surface: usize,
        /// Attempts made
        attempts: u32,
    },

    /// Keyboard grab still refused after the retry budget
    #[error("surface {surface}: cannot grab keyboard after {attempts} attempts")]
    Keyboard {
        /// Surface index
        surface: usize,
        /// Attempts made
        attempts: u32,
    },
}

impl SurfaceFailure {
    /// Index of the surface that failed.
    pub fn surface(&self) -> usize {
        match self {
            Self::Overlay { surface, .. }
            | Self::Pointer { surface, .. }
            | Self::Keyboard { surface, .. } => *surface,
        }
    }
}

/// Fatal capture outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Not a single surface could be captured, locking would be meaningless
    #[error("unable to capture any of {total} surfaces")]
    NothingCaptured {
        /// Number of surfaces the display reported
        total: usize,
        /// Why each one failed
        failures: Vec<SurfaceFailure>,
    },
}

/// Session state machine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Event delivered after the session reached a terminal state
    #[error("session already terminated in state {state:?}")]
    Terminated {
        /// Terminal state the session is in
        state: LockState,
    },
}
