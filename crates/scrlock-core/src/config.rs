//! Session capabilities and limits.

use std::time::Duration;

/// Limits and optional capabilities, evaluated once at session construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum password length in bytes
    pub password_max_len: usize,
    /// Maximum message length in bytes
    pub message_max_len: usize,
    /// Whether ctrl+space may switch to message mode
    pub message_enabled: bool,
    /// Whether a rejected attempt launches the side-effect helper
    pub side_effect_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            password_max_len: 255,
            message_max_len: 50,
            message_enabled: true,
            side_effect_enabled: true,
        }
    }
}

/// Bounded retry for pointer and keyboard grabs.
///
/// Another client may hold a grab for a short moment (a menu, a drag), so a
/// failed grab is retried up to `max_attempts` times with `delay` between
/// attempts before the surface is given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per grab, including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1000, delay: Duration::from_millis(1) }
    }
}
