//! Shared application service layer for the twin simulator.
//!
//! Frontends call into this crate instead of wiring the backend crates
//! themselves: project loading, graph setup, simulation runs and read-only
//! queries over the graph and the telemetry log.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;

pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{LoadedProject, RunOverrides, load_project, validate_project};
pub use query::{GraphSummary, LogSummary, graph_summary, log_summary};
pub use run_service::{SetupResponse, setup, setup_with_progress, simulate, simulate_with_progress};
