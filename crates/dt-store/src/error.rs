//! Store error types.

use std::fmt;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Kind of graph entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Model,
    Twin,
    Relationship,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Model => write!(f, "Model"),
            EntityKind::Twin => write!(f, "Twin"),
            EntityKind::Relationship => write!(f, "Relationship"),
        }
    }
}

/// Errors reported by a graph store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached. Fatal to any run.
    #[error("Store unreachable: {message}")]
    Connection { message: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// The store refused the request (missing reference, conflict, bad payload).
    #[error("{kind} {id} rejected: {reason}")]
    Rejected {
        kind: EntityKind,
        id: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub(crate) fn rejected(kind: EntityKind, id: &str, reason: impl Into<String>) -> Self {
        StoreError::Rejected {
            kind,
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
