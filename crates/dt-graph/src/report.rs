//! Structured outcomes of reconciliation steps.

use dt_core::EntityFailure;

use crate::phase::{ReconcilePhase, ReconcileStrategy};

/// Outcome of one reconciliation step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub phase: ReconcilePhase,
    /// Ids the step applied successfully.
    pub succeeded: Vec<String>,
    pub failed: Vec<EntityFailure>,
}

impl StepReport {
    pub fn new(phase: ReconcilePhase) -> Self {
        Self {
            phase,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of a full reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    pub strategy: ReconcileStrategy,
    pub steps: Vec<StepReport>,
}

impl ReconcileReport {
    pub fn new(strategy: ReconcileStrategy) -> Self {
        Self {
            strategy,
            steps: Vec::new(),
        }
    }

    fn count(&self, phase: ReconcilePhase) -> usize {
        self.steps
            .iter()
            .filter(|s| s.phase == phase)
            .map(|s| s.succeeded.len())
            .sum()
    }

    pub fn relationships_deleted(&self) -> usize {
        self.count(ReconcilePhase::DeletingRelationships)
    }

    pub fn twins_deleted(&self) -> usize {
        self.count(ReconcilePhase::DeletingTwins)
    }

    pub fn twins_created(&self) -> usize {
        self.count(ReconcilePhase::CreatingTwins)
    }

    pub fn relationships_created(&self) -> usize {
        self.count(ReconcilePhase::CreatingRelationships)
    }

    /// Every per-entity failure, tagged with the phase it happened in.
    pub fn failures(&self) -> impl Iterator<Item = (ReconcilePhase, &EntityFailure)> {
        self.steps
            .iter()
            .flat_map(|s| s.failed.iter().map(move |f| (s.phase, f)))
    }

    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(StepReport::is_clean)
    }
}
