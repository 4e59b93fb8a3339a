//! Append-only telemetry log (JSON Lines).

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use dt_core::{DeviceRow, PropertyMap, TableRecord, Tick, TwinId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::TelemetryResult;

/// One logged device row: the source columns plus the tick's date and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(flatten)]
    pub row: TableRecord,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
}

impl LogRecord {
    /// Logged parameter values, if the `Init Data` column is a JSON object.
    pub fn values(&self) -> Option<PropertyMap> {
        match serde_json::from_str(&self.row.init_data) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// Handle on a telemetry log file. Writes only ever append.
#[derive(Debug, Clone)]
pub struct TelemetryLog {
    path: PathBuf,
}

impl TelemetryLog {
    /// Log at `path`. The file and its directory are created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per row, stamped with the tick's date and time.
    ///
    /// Rows present in the tick are logged with their regenerated values;
    /// rows left out of the tick keep their current `Init Data` text.
    pub fn append(&mut self, tick: &Tick, rows: &[DeviceRow]) -> TelemetryResult<usize> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        let date = tick.date();
        let time = tick.time();

        for row in rows {
            let mut record = TableRecord::from(row);
            if let Some(values) = tick.values.get(&row.unique_id) {
                record.init_data = Value::Object(values.clone()).to_string();
            }
            let line = serde_json::to_string(&LogRecord {
                row: record,
                date: date.clone(),
                time: time.clone(),
            })?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), rows = rows.len(), "appended telemetry");
        Ok(rows.len())
    }

    /// Every record in file order. A missing log is empty.
    pub fn read_all(&self) -> TelemetryResult<Vec<LogRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(line)?);
            }
        }
        Ok(records)
    }

    /// Number of logged records per device id.
    pub fn device_counts(&self) -> TelemetryResult<BTreeMap<TwinId, usize>> {
        Ok(count_by_device(&self.read_all()?))
    }
}

/// Number of records per device id.
pub fn count_by_device(records: &[LogRecord]) -> BTreeMap<TwinId, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.row.unique_id.clone()).or_insert(0) += 1;
    }
    counts
}
