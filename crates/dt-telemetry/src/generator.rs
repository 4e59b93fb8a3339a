//! Per-tick telemetry generation.

use std::str::FromStr;

use chrono::NaiveDateTime;
use dt_core::{Clock, DeviceRow, EntityFailure, PropertyMap, Tick, TwinId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TelemetryResult;
use crate::log::TelemetryLog;
use crate::parameter::Parameter;

/// A key in some row's `Init Data` that has no generation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKey {
    pub twin_id: TwinId,
    pub key: String,
}

/// Result of generating one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub tick: Tick,
    /// Rows left out of the tick because their `Init Data` did not parse.
    pub skipped: Vec<EntityFailure>,
    /// Keys that kept their previous value because no rule exists for them.
    pub unknown: Vec<UnknownKey>,
}

/// Draws fresh parameter values from the parameter table.
pub struct TelemetryGenerator<R = StdRng> {
    rng: R,
}

impl TelemetryGenerator<StdRng> {
    /// Deterministic generator.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> TelemetryGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// New value for one parameter key.
    ///
    /// Fails with `UnknownParameter` for keys outside the table.
    pub fn generate(&mut self, key: &str) -> TelemetryResult<Value> {
        let parameter = Parameter::from_str(key)?;
        Ok(parameter.rule().sample(&mut self.rng))
    }

    /// Regenerate every `Init Data` key of every row.
    ///
    /// Rows whose `Init Data` does not parse are skipped; unknown keys keep
    /// their previous value. Both are reported in the outcome.
    pub fn build_tick(&mut self, rows: &[DeviceRow], timestamp: NaiveDateTime) -> TickOutcome {
        let mut outcome = TickOutcome {
            tick: Tick::new(timestamp),
            skipped: Vec::new(),
            unknown: Vec::new(),
        };

        for row in rows {
            let previous = match row.parse_init_data() {
                Ok(values) => values,
                Err(e) => {
                    warn!(twin = %row.unique_id, error = %e, "skipping row with malformed init data");
                    outcome
                        .skipped
                        .push(EntityFailure::new(row.unique_id.as_str(), &e));
                    continue;
                }
            };

            let mut values = PropertyMap::new();
            for (key, old) in previous {
                match self.generate(&key) {
                    Ok(new) => {
                        values.insert(key, new);
                    }
                    Err(_) => {
                        warn!(twin = %row.unique_id, key = %key, "no generation rule; keeping previous value");
                        outcome.unknown.push(UnknownKey {
                            twin_id: row.unique_id.clone(),
                            key: key.clone(),
                        });
                        values.insert(key, old);
                    }
                }
            }
            outcome.tick.values.insert(row.unique_id.clone(), values);
        }

        debug!(
            rows = outcome.tick.values.len(),
            skipped = outcome.skipped.len(),
            unknown = outcome.unknown.len(),
            "built tick"
        );
        outcome
    }

    /// Build a tick stamped by `clock` and append it to `log`.
    pub fn generate_tick<C: Clock + ?Sized>(
        &mut self,
        rows: &[DeviceRow],
        clock: &C,
        log: &mut TelemetryLog,
    ) -> TelemetryResult<TickOutcome> {
        let outcome = self.build_tick(rows, clock.now());
        log.append(&outcome.tick, rows)?;
        Ok(outcome)
    }
}
