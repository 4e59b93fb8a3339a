//! Wholesale replacement of the store's model set.

use std::collections::BTreeSet;

use dt_core::Model;
use dt_store::{GraphStore, StoreResult, list_models};
use tracing::{info, warn};

use crate::error::{GraphError, GraphResult};

/// Counts from a successful [`ModelRegistry::upload_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelUploadReport {
    pub deleted: usize,
    pub created: usize,
}

/// Replaces the set of schema models held by the store.
pub struct ModelRegistry<'s, S: GraphStore + ?Sized> {
    store: &'s mut S,
}

impl<'s, S: GraphStore + ?Sized> ModelRegistry<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    /// Lazily enumerate the models currently in the store.
    pub fn list_models(&self) -> impl Iterator<Item = StoreResult<Model>> + '_ {
        list_models(&*self.store)
    }

    /// Delete every model. Models that vanish concurrently are not an error.
    ///
    /// Returns the number of models deleted.
    pub fn delete_all(&mut self) -> GraphResult<usize> {
        // Collect first: deleting while paging would shift the continuation.
        let ids: Vec<String> = self
            .list_models()
            .map(|m| m.map(|m| m.id))
            .collect::<StoreResult<_>>()?;

        let mut deleted = 0;
        for id in &ids {
            match self.store.delete_model(id) {
                Ok(()) => deleted += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(deleted, "deleted existing models");
        Ok(deleted)
    }

    /// Replace the store's models with `models`.
    ///
    /// Duplicate ids are rejected before anything is deleted. If the batch
    /// create fails the old models are already gone and the store is left
    /// without models; nothing is retried or rolled back.
    pub fn upload_all(&mut self, models: &[Model]) -> GraphResult<ModelUploadReport> {
        let mut seen = BTreeSet::new();
        for model in models {
            if !seen.insert(model.id.as_str()) {
                return Err(GraphError::DuplicateModel {
                    id: model.id.clone(),
                });
            }
        }

        let deleted = self.delete_all()?;
        if let Err(source) = self.store.create_models(models) {
            warn!(deleted, error = %source, "model upload failed; store has no models");
            if source.is_connection() {
                return Err(source.into());
            }
            return Err(GraphError::ModelUpload { deleted, source });
        }
        info!(created = models.len(), "models uploaded");
        Ok(ModelUploadReport {
            deleted,
            created: models.len(),
        })
    }
}
