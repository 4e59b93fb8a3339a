//! Read-only views of the graph and the telemetry log.

use std::collections::BTreeMap;
use std::path::Path;

use dt_core::{Relationship, Twin, TwinId};
use dt_graph::GraphListing;
use dt_store::GraphStore;
use dt_telemetry::{TelemetryLog, count_by_device};
use serde::Serialize;

use crate::error::AppResult;

/// Twins (with their current properties) and relationships in the store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphSummary {
    pub twins: Vec<Twin>,
    pub relationships: Vec<Relationship>,
}

pub fn graph_summary<S: GraphStore + ?Sized>(store: &S) -> AppResult<GraphSummary> {
    let listing = GraphListing::read(store)?;
    let mut summary = GraphSummary::default();
    for id in &listing.twins {
        summary.twins.push(store.get_twin(id)?);
        summary.relationships.extend(store.list_relationships(id)?);
    }
    summary.relationships.sort();
    Ok(summary)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogSummary {
    pub records: usize,
    pub devices: BTreeMap<TwinId, usize>,
    /// `Date Time` of the first and last record.
    pub first: Option<String>,
    pub last: Option<String>,
}

pub fn log_summary(path: &Path) -> AppResult<LogSummary> {
    let records = TelemetryLog::new(path).read_all()?;
    let stamp = |i: usize| records.get(i).map(|r| format!("{} {}", r.date, r.time));
    Ok(LogSummary {
        records: records.len(),
        devices: count_by_device(&records),
        first: stamp(0),
        last: records.len().checked_sub(1).and_then(stamp),
    })
}
