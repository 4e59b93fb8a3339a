//! Twin and relationship reconciliation.
//!
//! The replace strategy deletes every relationship, then every twin, then
//! recreates both from the rows. Relationships go first because the store
//! refuses to delete a twin that still has relationships, and twins are
//! created before relationships because both endpoints must exist.
//!
//! The diff strategy computes a [`ReconcilePlan`] and applies each category
//! independently, so a failure only leaves its own category incomplete.

use std::collections::BTreeSet;

use dt_core::{
    CancelToken, DeviceRow, EntityFailure, ModelId, Relationship, RowSkipPolicy, TwinId, TwinPayload,
};
use dt_store::{GraphStore, StoreError, StoreResult, query_all_twins};
use tracing::{info, warn};

use crate::error::{GraphError, GraphResult};
use crate::listing::GraphListing;
use crate::phase::{ReconcilePhase, ReconcileStrategy};
use crate::plan::{ReconcilePlan, relationship_candidates, validate_rows};
use crate::report::{ReconcileReport, StepReport};

pub struct GraphReconciler<'s, S: GraphStore + ?Sized> {
    store: &'s mut S,
    relationship_policy: RowSkipPolicy,
    cancel: CancelToken,
    phase: ReconcilePhase,
}

impl<'s, S: GraphStore + ?Sized> GraphReconciler<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self {
            store,
            relationship_policy: RowSkipPolicy::default(),
            cancel: CancelToken::new(),
            phase: ReconcilePhase::Idle,
        }
    }

    pub fn with_relationship_policy(mut self, policy: RowSkipPolicy) -> Self {
        self.relationship_policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn phase(&self) -> ReconcilePhase {
        self.phase
    }

    /// Delete every relationship of every twin.
    pub fn delete_all_relationships(&mut self) -> GraphResult<StepReport> {
        let mut step = StepReport::new(ReconcilePhase::DeletingRelationships);
        for twin_id in self.all_twin_ids()? {
            let relationships = match self.store.list_relationships(&twin_id) {
                Ok(rels) => rels,
                // Deleted between the query and the listing.
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            for rel in relationships {
                let result = self.store.delete_relationship(&twin_id, &rel.id);
                record(&mut step, &rel.id, result)?;
            }
        }
        info!(deleted = step.succeeded.len(), "deleted relationships");
        Ok(step)
    }

    /// Delete every twin. Run after [`Self::delete_all_relationships`].
    pub fn delete_all_twins(&mut self) -> GraphResult<StepReport> {
        let mut step = StepReport::new(ReconcilePhase::DeletingTwins);
        for twin_id in self.all_twin_ids()? {
            let result = self.store.delete_twin(&twin_id);
            record(&mut step, &twin_id, result)?;
        }
        info!(deleted = step.succeeded.len(), "deleted twins");
        Ok(step)
    }

    /// Upsert one empty twin per row.
    pub fn create_twins(&mut self, rows: &[DeviceRow]) -> GraphResult<StepReport> {
        let twins: Vec<_> = rows
            .iter()
            .map(|r| (r.unique_id.clone(), r.model_id.clone()))
            .collect();
        self.upsert_twins(&twins)
    }

    /// Upsert the relationships the rows declare, after the skip policy.
    ///
    /// A relationship whose source or target twin is not in the store is
    /// reported as a failure and never sent.
    pub fn create_relationships(&mut self, rows: &[DeviceRow]) -> GraphResult<StepReport> {
        let candidates = relationship_candidates(rows, self.relationship_policy);
        self.upsert_relationships(&candidates)
    }

    /// Destructive full replace:
    /// delete relationships, delete twins, create twins, create relationships.
    ///
    /// A failed delete step stops the run (the graph may be left partially
    /// empty). Create failures are collected in the report.
    pub fn run(&mut self, rows: &[DeviceRow]) -> GraphResult<ReconcileReport> {
        validate_rows(rows)?;
        let mut report = ReconcileReport::new(ReconcileStrategy::Replace);

        self.enter(ReconcilePhase::DeletingRelationships)?;
        let step = self.track(|r| r.delete_all_relationships())?;
        self.require_clean(step, &mut report)?;

        self.enter(ReconcilePhase::DeletingTwins)?;
        let step = self.track(|r| r.delete_all_twins())?;
        self.require_clean(step, &mut report)?;

        self.enter(ReconcilePhase::CreatingTwins)?;
        report.steps.push(self.track(|r| r.create_twins(rows))?);

        self.enter(ReconcilePhase::CreatingRelationships)?;
        report.steps.push(self.track(|r| r.create_relationships(rows))?);

        self.phase = ReconcilePhase::Done;
        log_summary(&report);
        Ok(report)
    }

    /// Diff-based reconciliation: apply only what differs.
    pub fn run_diff(&mut self, rows: &[DeviceRow]) -> GraphResult<ReconcileReport> {
        let plan = self.track(|r| ReconcilePlan::compute(&*r.store, rows, r.relationship_policy))?;
        info!(
            twins_added = plan.twins_to_add.len(),
            twins_updated = plan.twins_to_update.len(),
            twins_removed = plan.twins_to_remove.len(),
            relationships_added = plan.relationships_to_add.len(),
            relationships_updated = plan.relationships_to_update.len(),
            relationships_removed = plan.relationships_to_remove.len(),
            "computed reconcile plan"
        );
        self.apply_plan(&plan)
    }

    /// Run with the given strategy.
    pub fn reconcile(
        &mut self,
        strategy: ReconcileStrategy,
        rows: &[DeviceRow],
    ) -> GraphResult<ReconcileReport> {
        match strategy {
            ReconcileStrategy::Replace => self.run(rows),
            ReconcileStrategy::Diff => self.run_diff(rows),
        }
    }

    /// Apply a precomputed plan, one category at a time.
    pub fn apply_plan(&mut self, plan: &ReconcilePlan) -> GraphResult<ReconcileReport> {
        let mut report = ReconcileReport::new(ReconcileStrategy::Diff);

        self.enter(ReconcilePhase::DeletingRelationships)?;
        let step = self.track(|r| {
            let mut step = StepReport::new(ReconcilePhase::DeletingRelationships);
            for rel in &plan.relationships_to_remove {
                let result = r.store.delete_relationship(&rel.source, &rel.id);
                record(&mut step, &rel.id, result)?;
            }
            Ok(step)
        })?;
        report.steps.push(step);

        self.enter(ReconcilePhase::DeletingTwins)?;
        let step = self.track(|r| {
            let mut step = StepReport::new(ReconcilePhase::DeletingTwins);
            for id in &plan.twins_to_remove {
                let result = r.store.delete_twin(id);
                record(&mut step, id, result)?;
            }
            Ok(step)
        })?;
        report.steps.push(step);

        self.enter(ReconcilePhase::CreatingTwins)?;
        let twins: Vec<_> = plan
            .twins_to_add
            .iter()
            .chain(&plan.twins_to_update)
            .cloned()
            .collect();
        report.steps.push(self.track(|r| r.upsert_twins(&twins))?);

        self.enter(ReconcilePhase::CreatingRelationships)?;
        let relationships: Vec<_> = plan
            .relationships_to_add
            .iter()
            .chain(&plan.relationships_to_update)
            .cloned()
            .collect();
        report
            .steps
            .push(self.track(|r| r.upsert_relationships(&relationships))?);

        self.phase = ReconcilePhase::Done;
        log_summary(&report);
        Ok(report)
    }

    /// Read-only enumeration of every twin id and relationship id.
    pub fn list_all(&self) -> GraphResult<GraphListing> {
        GraphListing::read(&*self.store)
    }

    fn all_twin_ids(&self) -> GraphResult<Vec<TwinId>> {
        Ok(query_all_twins(&*self.store).collect::<StoreResult<_>>()?)
    }

    fn upsert_twins(&mut self, twins: &[(TwinId, ModelId)]) -> GraphResult<StepReport> {
        let mut step = StepReport::new(ReconcilePhase::CreatingTwins);
        for (id, model_id) in twins {
            let result = self.store.upsert_twin(id, &TwinPayload::empty(model_id.as_str()));
            record(&mut step, id, result)?;
        }
        info!(created = step.succeeded.len(), failed = step.failed.len(), "upserted twins");
        Ok(step)
    }

    fn upsert_relationships(&mut self, relationships: &[Relationship]) -> GraphResult<StepReport> {
        let mut step = StepReport::new(ReconcilePhase::CreatingRelationships);
        let existing: BTreeSet<TwinId> = self.all_twin_ids()?.into_iter().collect();
        for rel in relationships {
            if let Some(missing) = [&rel.source, &rel.target]
                .into_iter()
                .find(|id| !existing.contains(*id))
            {
                warn!(relationship = %rel.id, twin = %missing, "endpoint missing; relationship not sent");
                step.failed.push(EntityFailure::new(
                    rel.id.as_str(),
                    format!("twin {missing} does not exist"),
                ));
                continue;
            }
            let result = self.store.upsert_relationship(&rel.source, &rel.id, rel);
            record(&mut step, &rel.id, result)?;
        }
        info!(
            created = step.succeeded.len(),
            failed = step.failed.len(),
            "upserted relationships"
        );
        Ok(step)
    }

    fn enter(&mut self, phase: ReconcilePhase) -> GraphResult<()> {
        if self.cancel.is_cancelled() {
            warn!(%phase, "reconciliation cancelled");
            self.phase = ReconcilePhase::Error;
            return Err(GraphError::Cancelled { phase });
        }
        self.phase = phase;
        Ok(())
    }

    /// Run a step, moving to `Error` if it fails.
    fn track<T>(&mut self, step: impl FnOnce(&mut Self) -> GraphResult<T>) -> GraphResult<T> {
        let result = step(self);
        if let Err(e) = &result {
            warn!(phase = %self.phase, error = %e, "reconciliation step failed");
            self.phase = ReconcilePhase::Error;
        }
        result
    }

    fn require_clean(&mut self, step: StepReport, report: &mut ReconcileReport) -> GraphResult<()> {
        if step.is_clean() {
            report.steps.push(step);
            return Ok(());
        }
        self.phase = ReconcilePhase::Error;
        Err(GraphError::ReconciliationStep {
            phase: step.phase,
            failures: step.failed,
        })
    }
}

/// Record one entity's result. Connection failures abort the step.
fn record(step: &mut StepReport, id: &str, result: StoreResult<()>) -> GraphResult<()> {
    match result {
        Ok(()) => {
            step.succeeded.push(id.to_string());
            Ok(())
        }
        Err(e @ StoreError::Connection { .. }) => Err(e.into()),
        Err(e) => {
            warn!(phase = %step.phase, id, error = %e, "entity failed");
            step.failed.push(EntityFailure::new(id, &e));
            Ok(())
        }
    }
}

fn log_summary(report: &ReconcileReport) {
    info!(
        strategy = %report.strategy,
        relationships_deleted = report.relationships_deleted(),
        twins_deleted = report.twins_deleted(),
        twins_created = report.twins_created(),
        relationships_created = report.relationships_created(),
        failures = report.failures().count(),
        "reconciliation finished"
    );
}
