#![deny(missing_docs)]

//! Forward-flux sampling coordinator.
//!
//! A run climbs a single order parameter through an [`ffs_core::InterfaceLadder`].
//! An unbiased phase collects first-interface crossings until a library of
//! seeds is frozen; every seed is then shot towards the next interface a fixed
//! number of times, and successful crossings become shooting points for the
//! interface above. Walkers synchronise through the collectives of
//! [`ffs_comm`], and world rank 0 keeps the index, results and library logs.

/// Rate estimates from the results log.
pub mod analysis;
/// YAML configuration schema and defaults.
pub mod config;
/// Per-walker coordinator and its step reports.
pub mod coordinator;
/// Deterministic seed derivation and dump naming.
pub mod determinism;
/// Pure phase transition rules.
pub mod phase;
/// Run summary serialization.
pub mod summary;

pub use analysis::{crossing_probabilities, rate_estimate, rate_from_results, RateEstimate, StageEstimate};
pub use config::{OutputConfig, RestartMode, RunConfig, SeedPolicy};
pub use coordinator::{ForwardFlux, StepAction, StepReport};
pub use phase::{CycleOutcome, RunPhase};
pub use summary::RunSummary;
