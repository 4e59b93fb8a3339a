//! Reconciliation phases and strategies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reconciliation state machine.
///
/// `Idle -> DeletingRelationships -> DeletingTwins -> CreatingTwins ->
/// CreatingRelationships -> Done`, with `Error` reachable from any step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconcilePhase {
    #[default]
    Idle,
    DeletingRelationships,
    DeletingTwins,
    CreatingTwins,
    CreatingRelationships,
    Done,
    Error,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcilePhase::Idle => "idle",
            ReconcilePhase::DeletingRelationships => "deleting relationships",
            ReconcilePhase::DeletingTwins => "deleting twins",
            ReconcilePhase::CreatingTwins => "creating twins",
            ReconcilePhase::CreatingRelationships => "creating relationships",
            ReconcilePhase::Done => "done",
            ReconcilePhase::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// How a reconciliation run brings the store in line with the source rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Delete every relationship and twin, then recreate from the rows.
    #[default]
    Replace,
    /// Apply only the add/update/remove sets; untouched twins keep their properties.
    Diff,
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStrategy::Replace => write!(f, "replace"),
            ReconcileStrategy::Diff => write!(f, "diff"),
        }
    }
}
