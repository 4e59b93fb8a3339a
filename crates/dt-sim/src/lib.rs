//! Tick-driven telemetry simulation.
//!
//! Provides:
//! - `SimulationLoop`: generate, log, publish, wait; repeated for N ticks
//! - `SimOptions` with validation
//! - per-tick progress and an end-of-run `SimSummary`

pub mod error;
pub mod sim;

pub use error::{SimError, SimResult};
pub use sim::{SimOptions, SimSummary, SimulationLoop, TickProgress};
