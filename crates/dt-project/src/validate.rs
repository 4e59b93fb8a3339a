//! Static checks on a configuration and the inputs it points at.

use std::collections::HashSet;

use dt_core::{DeviceRow, Model};

use crate::config::RunConfig;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

pub fn validate_config(config: &RunConfig) -> Result<(), ValidationError> {
    if config.simulation.max_ticks == 0 {
        return Err(ValidationError::InvalidValue {
            field: "simulation.max_ticks".to_string(),
            value: "0".to_string(),
            reason: "must run at least one tick".to_string(),
        });
    }
    for (field, path) in [
        ("source", &config.source),
        ("models", &config.models),
        ("telemetry_log", &config.telemetry_log),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                value: String::new(),
                reason: "path must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

/// Check that `rows` can be reconciled against `models`.
///
/// Malformed `Init Data` is not an error here: that row is only skipped at
/// tick time.
pub fn validate_setup(rows: &[DeviceRow], models: &[Model]) -> Result<(), ValidationError> {
    let mut model_ids = HashSet::new();
    for model in models {
        if !model_ids.insert(model.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: model.id.clone(),
                context: "models".to_string(),
            });
        }
    }

    let mut twin_ids = HashSet::new();
    for row in rows {
        if row.unique_id.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "ID (unique)".to_string(),
                value: String::new(),
                reason: format!("row with model {} has no id", row.model_id),
            });
        }
        if !twin_ids.insert(row.unique_id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: row.unique_id.clone(),
                context: "device table".to_string(),
            });
        }
        if !model_ids.contains(row.model_id.as_str()) {
            return Err(ValidationError::MissingReference {
                id: row.model_id.clone(),
                context: format!("model of twin {}", row.unique_id),
            });
        }
    }

    for row in rows {
        if let Some(source) = &row.relationship_source
            && !twin_ids.contains(source.as_str())
        {
            return Err(ValidationError::MissingReference {
                id: source.clone(),
                context: format!("relationship source of twin {}", row.unique_id),
            });
        }
    }
    Ok(())
}
