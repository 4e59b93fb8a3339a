//! Graph-specific error types.

use dt_core::EntityFailure;
use dt_store::StoreError;
use thiserror::Error;

use crate::phase::ReconcilePhase;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Duplicate model id in upload set: {id}")]
    DuplicateModel { id: String },

    #[error("Duplicate twin id in source rows: {id}")]
    DuplicateTwin { id: String },

    #[error("Source row has an empty twin id")]
    EmptyTwinId,

    /// The batch create failed after the old models were deleted; the
    /// registry is left empty.
    #[error("Model upload failed after deleting {deleted} models: {source}")]
    ModelUpload {
        deleted: usize,
        #[source]
        source: StoreError,
    },

    #[error("{phase} failed for {} entities", failures.len())]
    ReconciliationStep {
        phase: ReconcilePhase,
        failures: Vec<EntityFailure>,
    },

    #[error("Reconciliation cancelled before {phase}")]
    Cancelled { phase: ReconcilePhase },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GraphError {
    /// Whether the store was unreachable (fatal to the run).
    pub fn is_connection(&self) -> bool {
        match self {
            GraphError::Store(e) | GraphError::ModelUpload { source: e, .. } => e.is_connection(),
            _ => false,
        }
    }
}
