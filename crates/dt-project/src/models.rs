//! Model document directory.

use std::fs;
use std::path::{Path, PathBuf};

use dt_core::Model;
use serde_json::Value;
use tracing::debug;

use crate::{ProjectError, ProjectResult};

/// Read every `*.json` model document in `dir`, in file name order.
pub fn load_models(dir: &Path) -> ProjectResult<Vec<Model>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(ProjectError::io(dir))? {
        let path = entry.map_err(ProjectError::io(dir))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut models = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(&path).map_err(ProjectError::io(&path))?;
        let document: Value = serde_json::from_str(&content)?;
        let model = Model::from_document(document)
            .map_err(|source| ProjectError::Model { path: path.clone(), source })?;
        debug!(path = %path.display(), model = %model.id, "loaded model document");
        models.push(model);
    }
    Ok(models)
}
