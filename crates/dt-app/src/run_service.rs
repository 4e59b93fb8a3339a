//! Graph setup and simulation runs.

use std::time::{Duration, Instant};

use dt_core::{CancelToken, Clock};
use dt_graph::{
    GraphListing, GraphReconciler, ModelRegistry, ModelUploadReport, ReconcileReport, VerifyReport,
};
use dt_sim::{SimOptions, SimSummary, SimulationLoop, TickProgress};
use dt_store::GraphStore;
use dt_telemetry::{TelemetryGenerator, TelemetryLog};
use tracing::{info, warn};

use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service::LoadedProject;

/// Everything `setup` did to the graph.
#[derive(Debug, Clone)]
pub struct SetupResponse {
    pub models: ModelUploadReport,
    pub reconcile: ReconcileReport,
    pub listing: GraphListing,
    pub verify: VerifyReport,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    tick: Option<TickProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            tick,
        });
    }
}

/// Upload the models, reconcile the graph against the rows, then list and
/// verify the result.
pub fn setup<S: GraphStore + ?Sized>(
    project: &LoadedProject,
    store: &mut S,
    cancel: &CancelToken,
) -> AppResult<SetupResponse> {
    setup_with_progress(project, store, cancel, None)
}

pub fn setup_with_progress<S: GraphStore + ?Sized>(
    project: &LoadedProject,
    store: &mut S,
    cancel: &CancelToken,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<SetupResponse> {
    let started = Instant::now();
    let config = &project.config;

    emit_progress(
        &mut progress_cb,
        RunStage::UploadingModels,
        started,
        Some(format!("Uploading {} models", project.models.len())),
        None,
    );
    let models = ModelRegistry::new(&mut *store).upload_all(&project.models)?;

    emit_progress(
        &mut progress_cb,
        RunStage::Reconciling,
        started,
        Some(format!("Reconciling {} rows ({})", project.rows.len(), config.reconcile.strategy)),
        None,
    );
    let reconcile = GraphReconciler::new(&mut *store)
        .with_relationship_policy(config.policy.relationships)
        .with_cancel(cancel.clone())
        .reconcile(config.reconcile.strategy, &project.rows)?;

    emit_progress(
        &mut progress_cb,
        RunStage::Verifying,
        started,
        Some("Listing graph".to_string()),
        None,
    );
    let listing = GraphListing::read(&*store)?;
    let verify = listing.verify(&project.rows, config.policy.relationships);
    if verify.is_consistent() {
        info!(
            twins = listing.twins.len(),
            relationships = listing.relationships.len(),
            "graph matches the source table"
        );
    } else {
        warn!(
            missing_twins = ?verify.missing_twins,
            unexpected_twins = ?verify.unexpected_twins,
            missing_relationships = ?verify.missing_relationships,
            unexpected_relationships = ?verify.unexpected_relationships,
            "graph does not match the source table"
        );
    }

    emit_progress(&mut progress_cb, RunStage::Completed, started, None, None);
    Ok(SetupResponse {
        models,
        reconcile,
        listing,
        verify,
    })
}

/// Run the configured number of telemetry ticks against an already set up graph.
pub fn simulate<S: GraphStore + ?Sized>(
    project: &LoadedProject,
    store: &mut S,
    clock: &dyn Clock,
    cancel: &CancelToken,
) -> AppResult<SimSummary> {
    simulate_with_progress(project, store, clock, cancel, None)
}

pub fn simulate_with_progress<S: GraphStore + ?Sized>(
    project: &LoadedProject,
    store: &mut S,
    clock: &dyn Clock,
    cancel: &CancelToken,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<SimSummary> {
    let started = Instant::now();
    let config = &project.config;
    let options = SimOptions {
        max_ticks: config.simulation.max_ticks,
        interval: Duration::from_secs(config.simulation.interval_s),
        publish_policy: config.policy.publish,
    };
    let generator = match config.seed {
        Some(seed) => TelemetryGenerator::seeded(seed),
        None => TelemetryGenerator::from_entropy(),
    };
    let log = TelemetryLog::new(&config.telemetry_log);
    let source = project.source();

    let mut sim = SimulationLoop::new(store, project.rows.clone(), generator, log)
        .with_options(options)
        .with_clock(clock)
        .with_cancel(cancel.clone());
    if config.write_back_source {
        sim = sim.with_write_back(&source);
    }

    emit_progress(
        &mut progress_cb,
        RunStage::Simulating,
        started,
        Some(format!("Simulating {} ticks", options.max_ticks)),
        None,
    );
    let summary = {
        let mut on_tick = |tick: &TickProgress| {
            emit_progress(
                &mut progress_cb,
                RunStage::Simulating,
                started,
                Some(format!("Tick {}/{}", tick.tick, tick.max_ticks)),
                Some(tick.clone()),
            )
        };
        sim.run(Some(&mut on_tick))?
    };

    emit_progress(&mut progress_cb, RunStage::Completed, started, None, None);
    Ok(summary)
}
