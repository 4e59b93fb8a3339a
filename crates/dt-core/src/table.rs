//! Tabular row schema shared by the source table and the telemetry log.

use serde::{Deserialize, Serialize};

use crate::model::DeviceRow;

/// One row as it appears in the tabular files, keyed by column header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    #[serde(rename = "ModelID")]
    pub model_id: String,
    #[serde(rename = "ID (unique)", alias = "ID (must be unique)")]
    pub unique_id: String,
    #[serde(rename = "Relationship (From)", default)]
    pub relationship_source: Option<String>,
    #[serde(rename = "Relationship Name", default)]
    pub relationship_name: Option<String>,
    #[serde(rename = "Init Data", default)]
    pub init_data: String,
}

impl From<TableRecord> for DeviceRow {
    fn from(record: TableRecord) -> Self {
        DeviceRow {
            unique_id: record.unique_id.trim().to_string(),
            model_id: record.model_id.trim().to_string(),
            relationship_source: non_blank(record.relationship_source),
            relationship_name: non_blank(record.relationship_name),
            init_data: record.init_data,
        }
    }
}

impl From<&DeviceRow> for TableRecord {
    fn from(row: &DeviceRow) -> Self {
        TableRecord {
            model_id: row.model_id.clone(),
            unique_id: row.unique_id.clone(),
            relationship_source: row.relationship_source.clone(),
            relationship_name: row.relationship_name.clone(),
            init_data: row.init_data.clone(),
        }
    }
}

// Spreadsheet exports leave empty cells as "" rather than omitting them.
fn non_blank(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
