//! World state after a scenario.
//!
//! The World collects everything observable about one finished lock session
//! and provides oracle verification helpers.

use scrlock_app::Outcome;
use scrlock_core::{CaptureError, LockState, Screen, SurfaceFailure};

use crate::sim_display::SimRecord;

/// Observable results of one scenario.
#[derive(Debug, Default)]
pub struct World {
    pub(crate) name: String,
    pub(crate) capture_error: Option<CaptureError>,
    pub(crate) capture_failures: Vec<SurfaceFailure>,
    pub(crate) outcome: Option<Outcome>,
    pub(crate) run_error: Option<String>,
    pub(crate) record: SimRecord,
    pub(crate) launched: u32,
    pub(crate) reaped: u32,
    pub(crate) messages: Vec<String>,
    pub(crate) verifications: u32,
}

impl World {
    pub(crate) fn new(name: String) -> Self {
        Self { name, ..Self::default() }
    }

    /// Scenario name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Why the session never started, if nothing could be captured.
    pub fn capture_error(&self) -> Option<&CaptureError> {
        self.capture_error.as_ref()
    }

    /// Surfaces abandoned while the session still started.
    pub fn capture_failures(&self) -> &[SurfaceFailure] {
        &self.capture_failures
    }

    /// How the event loop ended, if it ended cleanly.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Runtime error that ended the event loop.
    pub fn run_error(&self) -> Option<&str> {
        self.run_error.as_deref()
    }

    /// Whether the session ended in `Unlocking`.
    pub fn unlocked(&self) -> bool {
        self.outcome.is_some_and(|o| o.state == LockState::Unlocking)
    }

    /// Whether the event loop ever asked for an event.
    pub fn event_loop_entered(&self) -> bool {
        self.record.events_read > 0
    }

    /// Raw display record.
    pub fn record(&self) -> &SimRecord {
        &self.record
    }

    /// Surfaces that were fully captured (both grabs held at some point).
    pub fn captured_surfaces(&self) -> Vec<usize> {
        let failed: Vec<usize> = self.capture_failures.iter().map(SurfaceFailure::surface).collect();
        let mut captured: Vec<usize> =
            self.record.created.iter().copied().filter(|s| !failed.contains(s)).collect();
        captured.dedup();
        captured
    }

    /// Screens painted on `surface`, in order.
    pub fn draws_on(&self, surface: usize) -> Vec<&Screen> {
        self.record.draws_on(surface)
    }

    /// Last screen painted on `surface`.
    pub fn last_screen(&self, surface: usize) -> Option<&Screen> {
        self.draws_on(surface).last().copied()
    }

    /// Every overlay ever created was destroyed exactly once and no grab is
    /// still held.
    pub fn all_released(&self) -> bool {
        !self.record.grabbing()
            && self.record.created.iter().all(|&s| {
                let created = self.record.created.iter().filter(|&&c| c == s).count();
                let destroyed = self.record.destroyed.iter().filter(|&&d| d == s).count();
                created == destroyed
            })
    }

    /// Side-effect jobs launched.
    pub fn side_effects_launched(&self) -> u32 {
        self.launched
    }

    /// Side-effect jobs reaped.
    pub fn side_effects_reaped(&self) -> u32 {
        self.reaped
    }

    /// Message records saved, formatted as written to the log.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Password attempts passed to the verifier.
    pub fn verifications(&self) -> u32 {
        self.verifications
    }
}
