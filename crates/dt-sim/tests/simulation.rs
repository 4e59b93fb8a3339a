//! Simulation loop runs against an in-memory graph.

use std::time::{Duration, Instant};

use chrono::{NaiveDate, TimeDelta};
use dt_core::{
    CancelToken, DeviceRow, FixedClock, Model, Relationship, RowSkipPolicy, Twin, TwinId,
    TwinPayload,
};
use dt_graph::{GraphReconciler, ModelRegistry};
use dt_project::{JsonTableSource, TabularSource};
use dt_sim::{SimError, SimOptions, SimulationLoop};
use dt_store::{GraphStore, MemoryGraphStore, Page, StoreError, StoreResult};
use dt_telemetry::{TelemetryGenerator, TelemetryLog};
use serde_json::json;

fn scenario_rows() -> Vec<DeviceRow> {
    vec![
        DeviceRow::new("Room", "RoomModel"),
        DeviceRow::new("AC", "ACModel")
            .with_relationship("Room", "contains")
            .with_init_data(r#"{"powerConsumed": 0.4, "temperature": 21}"#),
        DeviceRow::new("Light", "LightModel")
            .with_relationship("Room", "contains")
            .with_init_data(r#"{"brightness": 50}"#),
    ]
}

fn reconciled_store(rows: &[DeviceRow]) -> MemoryGraphStore {
    let mut store = MemoryGraphStore::new();
    let models: Vec<Model> = ["RoomModel", "ACModel", "LightModel"]
        .into_iter()
        .map(|id| Model::from_document(json!({"@id": id})).unwrap())
        .collect();
    ModelRegistry::new(&mut store).upload_all(&models).unwrap();
    GraphReconciler::new(&mut store).run(rows).unwrap();
    store
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("dt_sim_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn clock() -> FixedClock {
    FixedClock::new(
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
    )
    .with_step(TimeDelta::seconds(10))
}

fn fast(max_ticks: u32) -> SimOptions {
    SimOptions {
        max_ticks,
        interval: Duration::ZERO,
        publish_policy: RowSkipPolicy::SkipFirst,
    }
}

#[test]
fn runs_every_tick_and_logs_each_device() {
    let rows = scenario_rows();
    let mut store = reconciled_store(&rows);
    let dir = temp_dir("ticks");
    let log = TelemetryLog::new(dir.join("telemetry.jsonl"));
    let clock = clock();
    let mut seen = Vec::new();

    let mut sim = SimulationLoop::new(&mut store, rows, TelemetryGenerator::seeded(1), log.clone())
        .with_options(fast(3))
        .with_clock(&clock);
    let mut on_tick = |p: &dt_sim::TickProgress| seen.push((p.tick, p.fraction_complete()));
    let summary = sim.run(Some(&mut on_tick)).unwrap();

    assert_eq!(summary.ticks_run, 3);
    assert!(!summary.cancelled);
    assert_eq!(summary.records_logged, 9);
    assert_eq!(summary.published, 6);
    assert!(summary.publish_failures.is_empty());
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2], (3, 1.0));

    let records = log.read_all().unwrap();
    assert_eq!(records.len(), 9);
    let times: Vec<_> = records.iter().map(|r| r.time.as_str()).collect();
    assert_eq!(&times[..3], ["08:00:00"; 3]);
    assert_eq!(&times[6..], ["08:00:20"; 3]);
    assert!(log.device_counts().unwrap().values().all(|&n| n == 3));
}

#[test]
fn tick_values_become_the_next_previous_values() {
    let rows = scenario_rows();
    let mut store = reconciled_store(&rows);
    let dir = temp_dir("fold");
    let log = TelemetryLog::new(dir.join("telemetry.jsonl"));
    let clock = clock();

    let mut sim = SimulationLoop::new(&mut store, rows, TelemetryGenerator::seeded(2), log)
        .with_options(fast(2))
        .with_clock(&clock);
    sim.run(None).unwrap();
    let rows = sim.into_rows();

    let light = rows[2].parse_init_data().unwrap();
    let published = store.get_twin("Light").unwrap().properties;
    assert_eq!(light, published);
    assert_eq!(rows[0].parse_init_data().unwrap().len(), 0);
}

#[test]
fn writes_regenerated_values_back_to_the_source() {
    let rows = scenario_rows();
    let mut store = reconciled_store(&rows);
    let dir = temp_dir("write_back");
    let source = JsonTableSource::new(dir.join("devices.json"));
    source.store(&rows).unwrap();
    let log = TelemetryLog::new(dir.join("telemetry.jsonl"));
    let clock = clock();

    let mut sim = SimulationLoop::new(&mut store, rows, TelemetryGenerator::seeded(3), log)
        .with_options(fast(1))
        .with_clock(&clock)
        .with_write_back(&source);
    sim.run(None).unwrap();
    let cached = sim.rows().to_vec();

    assert_eq!(source.load().unwrap(), cached);
    let ac = cached[1].parse_init_data().unwrap();
    assert!((18..=23).contains(&ac["temperature"].as_i64().unwrap()));
}

#[test]
fn no_wait_after_the_last_tick() {
    let rows = scenario_rows();
    let mut store = reconciled_store(&rows);
    let dir = temp_dir("no_trailing_wait");
    let log = TelemetryLog::new(dir.join("telemetry.jsonl"));
    let clock = clock();

    let started = Instant::now();
    SimulationLoop::new(&mut store, rows, TelemetryGenerator::seeded(4), log)
        .with_options(SimOptions {
            max_ticks: 1,
            interval: Duration::from_secs(5),
            ..SimOptions::default()
        })
        .with_clock(&clock)
        .run(None)
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn cancel_stops_between_ticks() {
    let rows = scenario_rows();
    let mut store = reconciled_store(&rows);
    let dir = temp_dir("cancel");
    let log = TelemetryLog::new(dir.join("telemetry.jsonl"));
    let clock = clock();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();

    let mut sim = SimulationLoop::new(&mut store, rows, TelemetryGenerator::seeded(5), log.clone())
        .with_options(SimOptions {
            max_ticks: 5,
            interval: Duration::from_secs(30),
            ..SimOptions::default()
        })
        .with_clock(&clock)
        .with_cancel(cancel);
    let started = Instant::now();
    let mut on_tick = |_: &dt_sim::TickProgress| trigger.cancel();
    let summary = sim.run(Some(&mut on_tick)).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.ticks_run, 1);
    assert_eq!(log.read_all().unwrap().len(), 3);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn huge_interval_still_cancels() {
    let rows = scenario_rows();
    let mut store = reconciled_store(&rows);
    let dir = temp_dir("cancel_huge");
    let log = TelemetryLog::new(dir.join("telemetry.jsonl"));
    let clock = clock();
    let cancel = CancelToken::new();
    let trigger = cancel.clone();

    let mut sim = SimulationLoop::new(&mut store, rows, TelemetryGenerator::seeded(9), log)
        .with_options(SimOptions {
            max_ticks: 2,
            interval: Duration::from_secs(u64::MAX),
            ..SimOptions::default()
        })
        .with_clock(&clock)
        .with_cancel(cancel);
    let mut on_tick = |_: &dt_sim::TickProgress| trigger.cancel();
    let summary = sim.run(Some(&mut on_tick)).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.ticks_run, 1);
}

#[test]
fn cancelled_before_start_runs_nothing() {
    let rows = scenario_rows();
    let mut store = reconciled_store(&rows);
    let dir = temp_dir("cancel_early");
    let log = TelemetryLog::new(dir.join("telemetry.jsonl"));
    let cancel = CancelToken::new();
    cancel.cancel();

    let summary = SimulationLoop::new(&mut store, rows, TelemetryGenerator::seeded(6), log.clone())
        .with_options(fast(3))
        .with_cancel(cancel)
        .run(None)
        .unwrap();
    assert_eq!(summary.ticks_run, 0);
    assert!(log.read_all().unwrap().is_empty());
}

#[test]
fn missing_twin_does_not_stop_the_run() {
    let rows = scenario_rows();
    let mut store = reconciled_store(&rows[..2]);
    let dir = temp_dir("missing");
    let log = TelemetryLog::new(dir.join("telemetry.jsonl"));
    let clock = clock();

    let summary = SimulationLoop::new(&mut store, rows, TelemetryGenerator::seeded(7), log)
        .with_options(fast(2))
        .with_clock(&clock)
        .run(None)
        .unwrap();
    assert_eq!(summary.ticks_run, 2);
    assert_eq!(summary.published, 2);
    assert_eq!(summary.publish_failures.len(), 2);
    assert!(summary.publish_failures.iter().all(|f| f.id == "Light"));
}

/// Store that loses its connection after a number of twin upserts.
struct DroppingStore {
    inner: MemoryGraphStore,
    upserts_left: usize,
}

impl DroppingStore {
    fn check(&self) -> StoreResult<()> {
        if self.upserts_left == 0 {
            return Err(StoreError::Connection {
                message: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

impl GraphStore for DroppingStore {
    fn list_models_page(&self, continuation: Option<&str>) -> StoreResult<Page<Model>> {
        self.inner.list_models_page(continuation)
    }
    fn create_models(&mut self, models: &[Model]) -> StoreResult<()> {
        self.inner.create_models(models)
    }
    fn delete_model(&mut self, id: &str) -> StoreResult<()> {
        self.inner.delete_model(id)
    }
    fn get_twin(&self, id: &str) -> StoreResult<Twin> {
        self.check()?;
        self.inner.get_twin(id)
    }
    fn upsert_twin(&mut self, id: &str, payload: &TwinPayload) -> StoreResult<()> {
        self.check()?;
        self.upserts_left -= 1;
        self.inner.upsert_twin(id, payload)
    }
    fn delete_twin(&mut self, id: &str) -> StoreResult<()> {
        self.inner.delete_twin(id)
    }
    fn query_twins_page(&self, continuation: Option<&str>) -> StoreResult<Page<TwinId>> {
        self.inner.query_twins_page(continuation)
    }
    fn list_relationships(&self, twin_id: &str) -> StoreResult<Vec<Relationship>> {
        self.inner.list_relationships(twin_id)
    }
    fn upsert_relationship(
        &mut self,
        source_id: &str,
        id: &str,
        relationship: &Relationship,
    ) -> StoreResult<()> {
        self.inner.upsert_relationship(source_id, id, relationship)
    }
    fn delete_relationship(&mut self, source_id: &str, id: &str) -> StoreResult<()> {
        self.inner.delete_relationship(source_id, id)
    }
}

#[test]
fn connection_loss_ends_the_run() {
    let rows = scenario_rows();
    let mut store = DroppingStore {
        inner: reconciled_store(&rows),
        upserts_left: 3,
    };
    let dir = temp_dir("connection");
    let log = TelemetryLog::new(dir.join("telemetry.jsonl"));
    let clock = clock();
    let mut ticks = 0;

    let mut sim = SimulationLoop::new(&mut store, rows, TelemetryGenerator::seeded(8), log.clone())
        .with_options(fast(5))
        .with_clock(&clock);
    let mut on_tick = |_: &dt_sim::TickProgress| ticks += 1;
    let err = sim.run(Some(&mut on_tick)).unwrap_err();

    assert!(err.is_connection());
    assert!(matches!(err, SimError::Telemetry(_)));
    assert_eq!(ticks, 1);
    // The second tick was logged before its publish failed.
    assert_eq!(log.read_all().unwrap().len(), 6);
}
