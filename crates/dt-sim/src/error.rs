//! Error types for simulation runs.

use dt_project::ProjectError;
use dt_telemetry::TelemetryError;
use thiserror::Error;

/// Errors that end a simulation run.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Writing back the source table failed: {0}")]
    WriteBack(#[from] ProjectError),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn is_connection(&self) -> bool {
        matches!(self, SimError::Telemetry(e) if e.is_connection())
    }
}
