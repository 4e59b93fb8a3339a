//! Project loading and validation.

use std::path::Path;

use dt_core::{DeviceRow, Model};
use dt_graph::ReconcileStrategy;
use dt_project::{JsonTableSource, RunConfig, TabularSource, load_models, validate_setup};
use tracing::info;

use crate::error::AppResult;

/// A configuration together with the inputs it points at.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub config: RunConfig,
    pub rows: Vec<DeviceRow>,
    pub models: Vec<Model>,
}

impl LoadedProject {
    pub fn source(&self) -> JsonTableSource {
        JsonTableSource::new(&self.config.source)
    }
}

/// Command line overrides applied on top of the configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub max_ticks: Option<u32>,
    pub interval_s: Option<u64>,
    pub seed: Option<u64>,
    pub strategy: Option<ReconcileStrategy>,
}

impl RunOverrides {
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(max_ticks) = self.max_ticks {
            config.simulation.max_ticks = max_ticks;
        }
        if let Some(interval_s) = self.interval_s {
            config.simulation.interval_s = interval_s;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(strategy) = self.strategy {
            config.reconcile.strategy = strategy;
        }
    }
}

/// Load the configuration, apply overrides, then read and validate the
/// device table and model documents.
pub fn load_project(path: &Path, overrides: &RunOverrides) -> AppResult<LoadedProject> {
    let mut config = dt_project::load_config(path)?;
    overrides.apply(&mut config);
    dt_project::validate_config(&config)?;

    let rows = JsonTableSource::new(&config.source).load()?;
    let models = load_models(&config.models)?;
    let project = LoadedProject {
        config,
        rows,
        models,
    };
    validate_project(&project)?;

    info!(
        rows = project.rows.len(),
        models = project.models.len(),
        "loaded project"
    );
    Ok(project)
}

pub fn validate_project(project: &LoadedProject) -> AppResult<()> {
    validate_setup(&project.rows, &project.models)?;
    Ok(())
}
