//! Progress events streamed to frontends during setup and simulation.

use dt_sim::TickProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    UploadingModels,
    Reconciling,
    Verifying,
    Simulating,
    Completed,
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            RunStage::UploadingModels => "uploading models",
            RunStage::Reconciling => "reconciling",
            RunStage::Verifying => "verifying",
            RunStage::Simulating => "simulating",
            RunStage::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub tick: Option<TickProgress>,
}
