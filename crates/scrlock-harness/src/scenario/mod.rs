//! Scenario tests with a mandatory oracle.
//!
//! A [`Scenario`] describes the surfaces, faults, settings and key script of
//! one lock session. Calling `.oracle()` is the only way to obtain something
//! runnable, so every scenario ends by checking the [`World`] it produced.

mod builder;
mod world;

pub use builder::{RunnableScenario, Scenario};
pub use world::World;

/// Verification run against the final world.
pub type OracleFn = Box<dyn FnOnce(&World) -> Result<(), String>>;
