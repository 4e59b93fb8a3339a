//! Error types for the dt-app service layer.

use dt_graph::GraphError;
use dt_project::{ProjectError, ValidationError};
use dt_sim::SimError;
use dt_store::StoreError;
use dt_telemetry::TelemetryError;

/// Unified error for CLI and other frontends.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    #[error("Project validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Whether the graph store was unreachable.
    pub fn is_connection(&self) -> bool {
        match self {
            AppError::Graph(e) => e.is_connection(),
            AppError::Store(e) => e.is_connection(),
            AppError::Telemetry(e) => e.is_connection(),
            AppError::Simulation(e) => e.is_connection(),
            _ => false,
        }
    }
}
