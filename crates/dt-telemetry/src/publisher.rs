//! Pushes one generated tick onto twins that already exist.

use dt_core::{DeviceRow, EntityFailure, RowSkipPolicy, Tick, TwinId, TwinPayload};
use dt_store::{GraphStore, StoreError};
use tracing::{info, warn};

use crate::error::TelemetryResult;

/// Per-twin outcome of one publish call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishReport {
    pub published: Vec<TwinId>,
    pub failed: Vec<EntityFailure>,
    /// Rows with no values in the tick (their generation was skipped).
    pub skipped: Vec<TwinId>,
}

impl PublishReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct TelemetryPublisher<'s, S: GraphStore + ?Sized> {
    store: &'s mut S,
    policy: RowSkipPolicy,
}

impl<'s, S: GraphStore + ?Sized> TelemetryPublisher<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self {
            store,
            policy: RowSkipPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RowSkipPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Upsert `{model, tick values}` onto each row's twin, after the skip policy.
    ///
    /// Twins are never created here: a twin missing from the store is a
    /// per-twin failure. Only connection failures end the call early.
    pub fn publish(&mut self, tick: &Tick, rows: &[DeviceRow]) -> TelemetryResult<PublishReport> {
        let mut report = PublishReport::default();

        for row in self.policy.apply(rows) {
            let Some(values) = tick.values.get(&row.unique_id) else {
                report.skipped.push(row.unique_id.clone());
                continue;
            };

            match self.store.get_twin(&row.unique_id) {
                Ok(_) => {}
                Err(e @ StoreError::Connection { .. }) => return Err(e.into()),
                Err(e) => {
                    warn!(twin = %row.unique_id, error = %e, "twin not publishable");
                    report.failed.push(EntityFailure::new(row.unique_id.as_str(), &e));
                    continue;
                }
            }

            let payload = TwinPayload {
                model_id: row.model_id.clone(),
                properties: values.clone(),
            };
            match self.store.upsert_twin(&row.unique_id, &payload) {
                Ok(()) => report.published.push(row.unique_id.clone()),
                Err(e @ StoreError::Connection { .. }) => return Err(e.into()),
                Err(e) => {
                    warn!(twin = %row.unique_id, error = %e, "telemetry upsert failed");
                    report.failed.push(EntityFailure::new(row.unique_id.as_str(), &e));
                }
            }
        }

        info!(
            published = report.published.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "published tick"
        );
        Ok(report)
    }
}
