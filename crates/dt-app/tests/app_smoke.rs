//! Service layer smoke tests over a temporary site directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use dt_app::{
    AppError, RunOverrides, RunProgressEvent, RunStage, graph_summary, load_project, log_summary,
    setup, setup_with_progress, simulate, simulate_with_progress,
};
use dt_core::{CancelToken, FixedClock};
use dt_graph::ReconcileStrategy;
use dt_project::TabularSource;
use dt_store::MemoryGraphStore;

fn site(name: &str, extra_config: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dt_app_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("models")).unwrap();
    fs::write(
        dir.join("devices.json"),
        r#"[
          {"ModelID": "RoomModel", "ID (unique)": "Room", "Init Data": ""},
          {"ModelID": "ACModel", "ID (unique)": "AC", "Relationship (From)": "Room",
           "Relationship Name": "contains", "Init Data": "{\"powerConsumed\": 0.4}"},
          {"ModelID": "LightModel", "ID (unique)": "Light", "Relationship (From)": "Room",
           "Relationship Name": "contains", "Init Data": "{\"brightness\": 50}"}
        ]"#,
    )
    .unwrap();
    for id in ["RoomModel", "ACModel", "LightModel"] {
        fs::write(
            dir.join("models").join(format!("{id}.json")),
            format!(r#"{{"@id": "{id}", "@type": "Interface"}}"#),
        )
        .unwrap();
    }
    fs::write(
        dir.join("site.yaml"),
        format!(
            "source: devices.json\nmodels: models\ntelemetry_log: out/telemetry.jsonl\n\
             simulation:\n  max_ticks: 2\n  interval_s: 0\nseed: 1\n{extra_config}"
        ),
    )
    .unwrap();
    dir
}

fn clock() -> FixedClock {
    FixedClock::new(
        NaiveDate::from_ymd_opt(2024, 7, 4)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
    )
}

fn config(dir: &Path) -> PathBuf {
    dir.join("site.yaml")
}

#[test]
fn setup_then_simulate() {
    let dir = site("full", "");
    let project = load_project(&config(&dir), &RunOverrides::default()).unwrap();
    let mut store = MemoryGraphStore::new();
    let cancel = CancelToken::new();

    let response = setup(&project, &mut store, &cancel).unwrap();
    assert_eq!(response.models.created, 3);
    assert_eq!(response.reconcile.twins_created(), 3);
    assert_eq!(response.reconcile.relationships_created(), 1);
    assert!(response.verify.is_consistent());
    assert_eq!(
        response.listing.relationships.iter().collect::<Vec<_>>(),
        vec!["RoomContainsLight"]
    );

    let summary = simulate(&project, &mut store, &clock(), &cancel).unwrap();
    assert_eq!(summary.ticks_run, 2);
    assert_eq!(summary.published, 4);

    let logged = log_summary(&project.config.telemetry_log).unwrap();
    assert_eq!(logged.records, 6);
    assert!(logged.devices.values().all(|&n| n == 2));
    assert_eq!(logged.first.as_deref(), Some("2024-07-04 12:00:00"));

    // The source table now carries the last tick's values.
    let rows = project.source().load().unwrap();
    let graph = graph_summary(&store).unwrap();
    let light = graph.twins.iter().find(|t| t.id == "Light").unwrap();
    assert_eq!(rows[2].parse_init_data().unwrap(), light.properties);
}

#[test]
fn progress_stages_are_reported_in_order() {
    let dir = site("progress", "");
    let project = load_project(&config(&dir), &RunOverrides::default()).unwrap();
    let mut store = MemoryGraphStore::new();
    let cancel = CancelToken::new();

    let mut events: Vec<RunProgressEvent> = Vec::new();
    setup_with_progress(&project, &mut store, &cancel, Some(&mut |e| events.push(e))).unwrap();
    simulate_with_progress(&project, &mut store, &clock(), &cancel, Some(&mut |e| events.push(e)))
        .unwrap();

    let stages: Vec<RunStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            RunStage::UploadingModels,
            RunStage::Reconciling,
            RunStage::Verifying,
            RunStage::Completed,
            RunStage::Simulating,
            RunStage::Simulating,
            RunStage::Simulating,
            RunStage::Completed,
        ]
    );
    let ticks: Vec<u32> = events.iter().filter_map(|e| e.tick.as_ref()).map(|t| t.tick).collect();
    assert_eq!(ticks, vec![1, 2]);
}

#[test]
fn overrides_take_precedence_over_the_file() {
    let dir = site("overrides", "reconcile:\n  strategy: replace\nwrite_back_source: false\n");
    let overrides = RunOverrides {
        max_ticks: Some(1),
        interval_s: Some(0),
        seed: Some(99),
        strategy: Some(ReconcileStrategy::Diff),
    };
    let project = load_project(&config(&dir), &overrides).unwrap();
    assert_eq!(project.config.simulation.max_ticks, 1);
    assert_eq!(project.config.seed, Some(99));
    assert_eq!(project.config.reconcile.strategy, ReconcileStrategy::Diff);

    let mut store = MemoryGraphStore::new();
    let cancel = CancelToken::new();
    setup(&project, &mut store, &cancel).unwrap();
    let before = fs::read_to_string(&project.config.source).unwrap();
    simulate(&project, &mut store, &clock(), &cancel).unwrap();
    assert_eq!(fs::read_to_string(&project.config.source).unwrap(), before);

    // A second diff setup over a reconciled graph changes nothing.
    let again = setup(&project, &mut store, &cancel).unwrap();
    assert_eq!(again.reconcile.twins_created(), 0);
    assert_eq!(again.reconcile.relationships_created(), 0);
    assert!(again.verify.is_consistent());
}

#[test]
fn invalid_table_fails_before_touching_the_store() {
    let dir = site("invalid", "");
    fs::write(
        dir.join("devices.json"),
        r#"[{"ModelID": "TVModel", "ID (unique)": "TV"}]"#,
    )
    .unwrap();
    let err = load_project(&config(&dir), &RunOverrides::default()).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(!err.is_connection());
}
