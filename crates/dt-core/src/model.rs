//! Core data model: schema models, twins, relationships, source rows and ticks.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DtError, DtResult};
use crate::ids::{ModelId, RelationshipId, TwinId, relationship_id_for};

/// Property bag carried by a twin (parameter name -> value).
pub type PropertyMap = serde_json::Map<String, Value>;

/// A named type definition that twins conform to.
///
/// `schema` is the full model document as uploaded; `id` mirrors its `@id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub schema: Value,
}

impl Model {
    /// Build a model from a model document, taking the id from its `@id` field.
    pub fn from_document(schema: Value) -> DtResult<Self> {
        let id = schema
            .get("@id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(DtError::MissingModelId)?
            .to_string();
        Ok(Self { id, schema })
    }
}

/// Body of a twin upsert: the model it conforms to and its full property set.
///
/// Upserts replace the stored property set wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwinPayload {
    pub model_id: ModelId,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl TwinPayload {
    /// Payload for a freshly created twin (no properties yet).
    pub fn empty(model_id: impl Into<ModelId>) -> Self {
        Self {
            model_id: model_id.into(),
            properties: PropertyMap::new(),
        }
    }
}

/// A node in the remote graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Twin {
    pub id: TwinId,
    pub model_id: ModelId,
    #[serde(default)]
    pub properties: PropertyMap,
}

/// A named, directed edge between two twins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub source: TwinId,
    pub target: TwinId,
    pub name: String,
}

/// One row of the authoritative source table: one twin-to-be.
///
/// `init_data` keeps the raw JSON text of the `Init Data` cell so a malformed
/// cell only affects its own row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRow {
    pub unique_id: TwinId,
    pub model_id: ModelId,
    pub relationship_source: Option<TwinId>,
    pub relationship_name: Option<String>,
    pub init_data: String,
}

impl DeviceRow {
    pub fn new(unique_id: impl Into<TwinId>, model_id: impl Into<ModelId>) -> Self {
        Self {
            unique_id: unique_id.into(),
            model_id: model_id.into(),
            relationship_source: None,
            relationship_name: None,
            init_data: "{}".to_string(),
        }
    }

    /// Attach the incoming relationship `source --name--> self`.
    pub fn with_relationship(mut self, source: impl Into<TwinId>, name: impl Into<String>) -> Self {
        self.relationship_source = Some(source.into());
        self.relationship_name = Some(name.into());
        self
    }

    pub fn with_init_data(mut self, init_data: impl Into<String>) -> Self {
        self.init_data = init_data.into();
        self
    }

    /// Parse the `Init Data` cell. A blank cell is an empty object.
    pub fn parse_init_data(&self) -> DtResult<PropertyMap> {
        if self.init_data.trim().is_empty() {
            return Ok(PropertyMap::new());
        }
        match serde_json::from_str::<Value>(&self.init_data) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(DtError::InitData {
                twin_id: self.unique_id.clone(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(DtError::InitData {
                twin_id: self.unique_id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Replace the `Init Data` cell with `values`.
    pub fn set_init_data(&mut self, values: &PropertyMap) {
        self.init_data = Value::Object(values.clone()).to_string();
    }

    /// Relationship this row declares, if it names a source twin.
    pub fn relationship(&self) -> Option<Relationship> {
        let source = self.relationship_source.as_ref()?;
        Some(Relationship {
            id: relationship_id_for(&self.unique_id),
            source: source.clone(),
            target: self.unique_id.clone(),
            name: self.relationship_name.clone().unwrap_or_default(),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One simulation cycle's generated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: NaiveDateTime,
    /// Twin id -> regenerated parameter values.
    pub values: BTreeMap<TwinId, PropertyMap>,
}

impl Tick {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// `YYYY-MM-DD` stamp of the tick.
    pub fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }

    /// `HH:MM:SS` stamp of the tick.
    pub fn time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}
