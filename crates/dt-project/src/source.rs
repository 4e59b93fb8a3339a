//! The authoritative device table.

use std::fs;
use std::path::{Path, PathBuf};

use dt_core::{DeviceRow, TableRecord};
use tracing::debug;

use crate::{ProjectError, ProjectResult};

/// Loads and persists the device table.
pub trait TabularSource {
    fn load(&self) -> ProjectResult<Vec<DeviceRow>>;

    /// Replace the stored table with `rows`.
    fn store(&self, rows: &[DeviceRow]) -> ProjectResult<()>;
}

/// Device table kept as a JSON array of row objects keyed by column header.
#[derive(Debug, Clone)]
pub struct JsonTableSource {
    path: PathBuf,
}

impl JsonTableSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabularSource for JsonTableSource {
    fn load(&self) -> ProjectResult<Vec<DeviceRow>> {
        let content = fs::read_to_string(&self.path).map_err(ProjectError::io(&self.path))?;
        let records: Vec<TableRecord> = serde_json::from_str(&content)?;
        debug!(path = %self.path.display(), rows = records.len(), "loaded device table");
        Ok(records.into_iter().map(DeviceRow::from).collect())
    }

    fn store(&self, rows: &[DeviceRow]) -> ProjectResult<()> {
        let records: Vec<TableRecord> = rows.iter().map(TableRecord::from).collect();
        let content = serde_json::to_string_pretty(&records)?;
        // Readers never see a partially written table.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(ProjectError::io(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(ProjectError::io(&self.path))?;
        Ok(())
    }
}
