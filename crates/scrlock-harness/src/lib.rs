//! Deterministic simulation harness for scrlock.
//!
//! In-memory implementations of the [`scrlock_core::Display`],
//! [`scrlock_app::Launcher`] and [`scrlock_app::MessageSink`] seams so the
//! production [`scrlock_app::Runtime`] can be driven by scripted input and
//! injected faults.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fakes;
pub mod scenario;
pub mod sim_display;

pub use fakes::{AcceptOnly, CountingLauncher, FakeJob, MemorySink};
pub use sim_display::{SimDisplay, SimError, SimOverlay, SimRecord, SurfaceScript};
