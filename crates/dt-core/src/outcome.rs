//! Per-entity outcome records shared by reconciliation and publishing reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An entity the store refused, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFailure {
    pub id: String,
    pub reason: String,
}

impl EntityFailure {
    pub fn new(id: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.reason)
    }
}
