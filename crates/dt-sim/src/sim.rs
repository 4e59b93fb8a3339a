//! The simulation loop.

use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use dt_core::{CancelToken, Clock, DeviceRow, EntityFailure, RowSkipPolicy, SystemClock};
use dt_project::TabularSource;
use dt_store::GraphStore;
use dt_telemetry::{PublishReport, TelemetryGenerator, TelemetryLog, TelemetryPublisher};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::error::{SimError, SimResult};

/// Options for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimOptions {
    /// Number of ticks to run.
    pub max_ticks: u32,
    /// Wait between the end of one tick and the start of the next.
    pub interval: Duration,
    /// Which rows receive published telemetry.
    pub publish_policy: RowSkipPolicy,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            max_ticks: 20,
            interval: Duration::from_secs(10),
            publish_policy: RowSkipPolicy::default(),
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if self.max_ticks == 0 {
            return Err(SimError::InvalidArg {
                what: "max_ticks must be positive",
            });
        }
        Ok(())
    }
}

/// Emitted after every completed tick.
#[derive(Debug, Clone)]
pub struct TickProgress {
    /// 1-based tick number.
    pub tick: u32,
    pub max_ticks: u32,
    pub timestamp: NaiveDateTime,
    pub logged: usize,
    pub publish: PublishReport,
    pub skipped_rows: usize,
    pub unknown_keys: usize,
}

impl TickProgress {
    pub fn fraction_complete(&self) -> f64 {
        f64::from(self.tick) / f64::from(self.max_ticks)
    }
}

/// Totals over a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimSummary {
    pub ticks_run: u32,
    pub cancelled: bool,
    pub records_logged: usize,
    pub published: usize,
    pub publish_failures: Vec<EntityFailure>,
    pub skipped_rows: usize,
    pub unknown_keys: usize,
    pub elapsed_wall_s: f64,
}

/// Drives ticks: generate and log, fold values into the cached rows,
/// optionally write the table back, publish, then wait.
///
/// The rows are loaded once and cached for the whole run; each tick's values
/// become the previous values of the next.
pub struct SimulationLoop<'a, S: GraphStore + ?Sized, R: Rng = StdRng> {
    store: &'a mut S,
    rows: Vec<DeviceRow>,
    generator: TelemetryGenerator<R>,
    log: TelemetryLog,
    clock: &'a dyn Clock,
    write_back: Option<&'a dyn TabularSource>,
    cancel: CancelToken,
    options: SimOptions,
}

impl<'a, S: GraphStore + ?Sized, R: Rng> SimulationLoop<'a, S, R> {
    pub fn new(
        store: &'a mut S,
        rows: Vec<DeviceRow>,
        generator: TelemetryGenerator<R>,
        log: TelemetryLog,
    ) -> Self {
        Self {
            store,
            rows,
            generator,
            log,
            clock: &SystemClock,
            write_back: None,
            cancel: CancelToken::new(),
            options: SimOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SimOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Persist the regenerated values into `source` after every tick.
    pub fn with_write_back(mut self, source: &'a dyn TabularSource) -> Self {
        self.write_back = Some(source);
        self
    }

    /// Current cached rows.
    pub fn rows(&self) -> &[DeviceRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<DeviceRow> {
        self.rows
    }

    /// Run up to `max_ticks` ticks.
    ///
    /// Cancellation is checked between ticks and interrupts the wait; a tick
    /// that has started always finishes. Connection failures end the run.
    /// Per-twin publish failures are logged and the run continues.
    pub fn run(
        &mut self,
        mut progress_cb: Option<&mut dyn FnMut(&TickProgress)>,
    ) -> SimResult<SimSummary> {
        self.options.validate()?;
        let started = Instant::now();
        let mut summary = SimSummary::default();
        let max_ticks = self.options.max_ticks;

        info!(
            max_ticks,
            interval_s = self.options.interval.as_secs_f64(),
            rows = self.rows.len(),
            "simulation started"
        );

        for tick in 1..=max_ticks {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let progress = self.step(tick)?;
            summary.ticks_run = tick;
            summary.records_logged += progress.logged;
            summary.published += progress.publish.published.len();
            summary
                .publish_failures
                .extend(progress.publish.failed.iter().cloned());
            summary.skipped_rows += progress.skipped_rows;
            summary.unknown_keys += progress.unknown_keys;

            if let Some(cb) = progress_cb.as_deref_mut() {
                cb(&progress);
            }

            if tick < max_ticks && self.cancel.wait(self.options.interval) {
                summary.cancelled = true;
                break;
            }
        }

        summary.elapsed_wall_s = started.elapsed().as_secs_f64();
        if summary.cancelled {
            warn!(ticks_run = summary.ticks_run, "simulation cancelled");
        }
        info!(
            ticks_run = summary.ticks_run,
            published = summary.published,
            publish_failures = summary.publish_failures.len(),
            "simulation finished"
        );
        Ok(summary)
    }

    fn step(&mut self, tick: u32) -> SimResult<TickProgress> {
        let outcome = self
            .generator
            .generate_tick(&self.rows, self.clock, &mut self.log)?;

        for row in &mut self.rows {
            if let Some(values) = outcome.tick.values.get(&row.unique_id) {
                row.set_init_data(values);
            }
        }
        if let Some(source) = self.write_back {
            source.store(&self.rows)?;
        }

        let publish = TelemetryPublisher::new(&mut *self.store)
            .with_policy(self.options.publish_policy)
            .publish(&outcome.tick, &self.rows)?;

        info!(
            tick,
            max_ticks = self.options.max_ticks,
            date = %outcome.tick.date(),
            time = %outcome.tick.time(),
            published = publish.published.len(),
            failed = publish.failed.len(),
            "tick complete"
        );

        Ok(TickProgress {
            tick,
            max_ticks: self.options.max_ticks,
            timestamp: outcome.tick.timestamp,
            logged: self.rows.len(),
            publish,
            skipped_rows: outcome.skipped.len(),
            unknown_keys: outcome.unknown.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = SimOptions::default();
        assert_eq!(opts.max_ticks, 20);
        assert_eq!(opts.interval, Duration::from_secs(10));
        assert_eq!(opts.publish_policy, RowSkipPolicy::SkipFirst);
        opts.validate().unwrap();
    }

    #[test]
    fn zero_ticks_rejected() {
        let opts = SimOptions {
            max_ticks: 0,
            ..SimOptions::default()
        };
        assert!(matches!(opts.validate(), Err(SimError::InvalidArg { .. })));
    }
}
