//! dt-telemetry: simulated sensor telemetry.
//!
//! Provides:
//! - the parameter table (`Parameter` -> `ParameterRule`)
//! - `TelemetryGenerator`: bounded-random values per tick
//! - `TelemetryPublisher`: pushes a tick onto existing twins
//! - `TelemetryLog`: append-only JSON Lines record of every tick

pub mod error;
pub mod generator;
pub mod log;
pub mod parameter;
pub mod publisher;

pub use error::{TelemetryError, TelemetryResult};
pub use generator::{TelemetryGenerator, TickOutcome, UnknownKey};
pub use log::{LogRecord, TelemetryLog, count_by_device};
pub use parameter::{Parameter, ParameterRule};
pub use publisher::{PublishReport, TelemetryPublisher};
