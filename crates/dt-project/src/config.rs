//! Run configuration schema.

use std::path::{Path, PathBuf};

use dt_core::RowSkipPolicy;
use dt_graph::ReconcileStrategy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Device table (JSON array of rows).
    pub source: PathBuf,
    /// Directory of `*.json` model documents.
    pub models: PathBuf,
    pub telemetry_log: PathBuf,
    #[serde(default)]
    pub simulation: SimulationDef,
    #[serde(default)]
    pub reconcile: ReconcileDef,
    #[serde(default)]
    pub policy: PolicyDef,
    #[serde(default = "default_true")]
    pub write_back_source: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationDef {
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,
    #[serde(default = "default_interval_s")]
    pub interval_s: u64,
}

impl Default for SimulationDef {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            interval_s: default_interval_s(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileDef {
    #[serde(default)]
    pub strategy: ReconcileStrategy,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDef {
    #[serde(default)]
    pub relationships: RowSkipPolicy,
    #[serde(default)]
    pub publish: RowSkipPolicy,
}

fn default_true() -> bool {
    true
}

fn default_max_ticks() -> u32 {
    20
}

fn default_interval_s() -> u64 {
    10
}

impl RunConfig {
    pub fn new(
        source: impl Into<PathBuf>,
        models: impl Into<PathBuf>,
        telemetry_log: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            models: models.into(),
            telemetry_log: telemetry_log.into(),
            simulation: SimulationDef::default(),
            reconcile: ReconcileDef::default(),
            policy: PolicyDef::default(),
            write_back_source: true,
            seed: None,
        }
    }

    /// Make relative paths relative to `base` (the config file's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.source, &mut self.models, &mut self.telemetry_log] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
