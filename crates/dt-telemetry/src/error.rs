//! Error types for telemetry generation, logging and publishing.

use dt_core::DtError;
use dt_store::StoreError;
use thiserror::Error;

pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("No generation rule for parameter '{key}'")]
    UnknownParameter { key: String },

    #[error("Malformed init data for twin {twin_id}: {reason}")]
    Parse { twin_id: String, reason: String },

    #[error("Invalid data: {0}")]
    Core(DtError),

    #[error("Telemetry log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<DtError> for TelemetryError {
    fn from(err: DtError) -> Self {
        match err {
            DtError::InitData { twin_id, reason } => TelemetryError::Parse { twin_id, reason },
            other => TelemetryError::Core(other),
        }
    }
}

impl TelemetryError {
    pub fn is_connection(&self) -> bool {
        matches!(self, TelemetryError::Store(e) if e.is_connection())
    }
}
