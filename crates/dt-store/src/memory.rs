//! In-process graph store.
//!
//! Enforces the same invariants a remote store would: twins reference an
//! existing model, relationships reference existing twins, and a twin cannot
//! be deleted while relationships still touch it. Listings are paginated with
//! keyset continuation tokens (the last id of the previous page).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use dt_core::{Model, ModelId, Relationship, RelationshipId, Twin, TwinId, TwinPayload};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EntityKind, StoreError, StoreResult};
use crate::page::Page;
use crate::store::GraphStore;

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryGraphStore {
    #[serde(default)]
    models: BTreeMap<ModelId, Model>,
    #[serde(default)]
    twins: BTreeMap<TwinId, Twin>,
    /// source twin -> relationship id -> relationship
    #[serde(default)]
    relationships: BTreeMap<TwinId, BTreeMap<RelationshipId, Relationship>>,
    #[serde(skip, default = "default_page_size")]
    page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self {
            models: BTreeMap::new(),
            twins: BTreeMap::new(),
            relationships: BTreeMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listing page size (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Load a snapshot written by [`MemoryGraphStore::save`].
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let store = serde_json::from_str(&content)?;
        Ok(store)
    }

    /// Load a snapshot if the file exists, otherwise start empty.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn model_ids(&self) -> BTreeSet<ModelId> {
        self.models.keys().cloned().collect()
    }

    pub fn twins(&self) -> impl Iterator<Item = &Twin> {
        self.twins.values()
    }

    pub fn twin_ids(&self) -> BTreeSet<TwinId> {
        self.twins.keys().cloned().collect()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values().flat_map(|by_id| by_id.values())
    }

    pub fn relationship_ids(&self) -> BTreeSet<RelationshipId> {
        self.relationships().map(|r| r.id.clone()).collect()
    }

    fn page_of<T: Clone>(
        &self,
        map: &BTreeMap<String, T>,
        continuation: Option<&str>,
    ) -> Page<T> {
        let mut entries: Box<dyn Iterator<Item = (&String, &T)>> = match continuation {
            Some(after) => Box::new(
                map.range::<str, _>((std::ops::Bound::Excluded(after), std::ops::Bound::Unbounded)),
            ),
            None => Box::new(map.iter()),
        };

        let mut items = Vec::with_capacity(self.page_size);
        let mut last_key = None;
        for (key, value) in entries.by_ref().take(self.page_size) {
            items.push(value.clone());
            last_key = Some(key.clone());
        }
        let continuation = if entries.next().is_some() {
            last_key
        } else {
            None
        };
        Page {
            items,
            continuation,
        }
    }

    fn is_referenced(&self, twin_id: &str) -> bool {
        let outgoing = self
            .relationships
            .get(twin_id)
            .is_some_and(|by_id| !by_id.is_empty());
        outgoing || self.relationships().any(|r| r.target == twin_id)
    }
}

impl GraphStore for MemoryGraphStore {
    fn list_models_page(&self, continuation: Option<&str>) -> StoreResult<Page<Model>> {
        Ok(self.page_of(&self.models, continuation))
    }

    fn create_models(&mut self, models: &[Model]) -> StoreResult<()> {
        let mut batch = BTreeSet::new();
        for model in models {
            if model.id.is_empty() {
                return Err(StoreError::rejected(EntityKind::Model, "", "empty model id"));
            }
            if self.models.contains_key(&model.id) || !batch.insert(model.id.as_str()) {
                return Err(StoreError::rejected(
                    EntityKind::Model,
                    &model.id,
                    "model already exists",
                ));
            }
        }
        for model in models {
            self.models.insert(model.id.clone(), model.clone());
        }
        debug!(count = models.len(), "created models");
        Ok(())
    }

    fn delete_model(&mut self, id: &str) -> StoreResult<()> {
        self.models.remove(id);
        Ok(())
    }

    fn get_twin(&self, id: &str) -> StoreResult<Twin> {
        self.twins
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Twin,
                id: id.to_string(),
            })
    }

    fn upsert_twin(&mut self, id: &str, payload: &TwinPayload) -> StoreResult<()> {
        if id.is_empty() {
            return Err(StoreError::rejected(EntityKind::Twin, id, "empty twin id"));
        }
        if !self.models.contains_key(&payload.model_id) {
            return Err(StoreError::rejected(
                EntityKind::Twin,
                id,
                format!("model {} does not exist", payload.model_id),
            ));
        }
        self.twins.insert(
            id.to_string(),
            Twin {
                id: id.to_string(),
                model_id: payload.model_id.clone(),
                properties: payload.properties.clone(),
            },
        );
        Ok(())
    }

    fn delete_twin(&mut self, id: &str) -> StoreResult<()> {
        if !self.twins.contains_key(id) {
            return Ok(());
        }
        if self.is_referenced(id) {
            return Err(StoreError::rejected(
                EntityKind::Twin,
                id,
                "twin still has relationships",
            ));
        }
        self.twins.remove(id);
        self.relationships.remove(id);
        Ok(())
    }

    fn query_twins_page(&self, continuation: Option<&str>) -> StoreResult<Page<TwinId>> {
        let page = self.page_of(&self.twins, continuation);
        Ok(Page {
            items: page.items.into_iter().map(|twin| twin.id).collect(),
            continuation: page.continuation,
        })
    }

    fn list_relationships(&self, twin_id: &str) -> StoreResult<Vec<Relationship>> {
        if !self.twins.contains_key(twin_id) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Twin,
                id: twin_id.to_string(),
            });
        }
        Ok(self
            .relationships
            .get(twin_id)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert_relationship(
        &mut self,
        source_id: &str,
        id: &str,
        relationship: &Relationship,
    ) -> StoreResult<()> {
        let reject = |reason: String| StoreError::rejected(EntityKind::Relationship, id, reason);
        if relationship.source != source_id || relationship.id != id {
            return Err(reject(format!(
                "payload {}/{} does not match path {source_id}/{id}",
                relationship.source, relationship.id
            )));
        }
        if relationship.name.is_empty() {
            return Err(reject("empty relationship name".to_string()));
        }
        for endpoint in [&relationship.source, &relationship.target] {
            if !self.twins.contains_key(endpoint) {
                return Err(reject(format!("twin {endpoint} does not exist")));
            }
        }
        self.relationships
            .entry(source_id.to_string())
            .or_default()
            .insert(id.to_string(), relationship.clone());
        Ok(())
    }

    fn delete_relationship(&mut self, source_id: &str, id: &str) -> StoreResult<()> {
        if let Some(by_id) = self.relationships.get_mut(source_id) {
            by_id.remove(id);
            if by_id.is_empty() {
                self.relationships.remove(source_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(id: &str) -> Model {
        Model {
            id: id.to_string(),
            schema: json!({"@id": id}),
        }
    }

    fn edge(source: &str, target: &str) -> Relationship {
        Relationship {
            id: dt_core::relationship_id_for(target),
            source: source.to_string(),
            target: target.to_string(),
            name: "contains".to_string(),
        }
    }

    fn seeded() -> MemoryGraphStore {
        let mut store = MemoryGraphStore::new();
        store.create_models(&[model("RoomModel"), model("ACModel")]).unwrap();
        store.upsert_twin("Room", &TwinPayload::empty("RoomModel")).unwrap();
        store.upsert_twin("AC", &TwinPayload::empty("ACModel")).unwrap();
        store
    }

    #[test]
    fn create_models_is_all_or_nothing() {
        let mut store = MemoryGraphStore::new();
        store.create_models(&[model("A")]).unwrap();
        let err = store.create_models(&[model("B"), model("A")]).unwrap_err();
        assert!(matches!(err, StoreError::Rejected { kind: EntityKind::Model, .. }));
        assert_eq!(store.model_ids().len(), 1);

        assert!(store.create_models(&[model("C"), model("C")]).is_err());
        assert!(!store.model_ids().contains("C"));
    }

    #[test]
    fn twin_requires_model() {
        let mut store = MemoryGraphStore::new();
        let err = store.upsert_twin("Room", &TwinPayload::empty("RoomModel")).unwrap_err();
        assert!(matches!(err, StoreError::Rejected { kind: EntityKind::Twin, .. }));
    }

    #[test]
    fn upsert_replaces_properties() {
        let mut store = seeded();
        let mut payload = TwinPayload::empty("ACModel");
        payload.properties.insert("powerConsumed".into(), json!(0.4));
        store.upsert_twin("AC", &payload).unwrap();
        store.upsert_twin("AC", &TwinPayload::empty("ACModel")).unwrap();
        assert!(store.get_twin("AC").unwrap().properties.is_empty());
    }

    #[test]
    fn relationship_requires_both_endpoints() {
        let mut store = seeded();
        let dangling = edge("Room", "Light");
        assert!(store.upsert_relationship("Room", &dangling.id, &dangling).is_err());

        let ok = edge("Room", "AC");
        store.upsert_relationship("Room", &ok.id, &ok).unwrap();
        assert_eq!(store.list_relationships("Room").unwrap(), vec![ok]);
    }

    #[test]
    fn relationship_payload_must_match_path() {
        let mut store = seeded();
        let rel = edge("Room", "AC");
        assert!(store.upsert_relationship("AC", &rel.id, &rel).is_err());
        assert!(store.upsert_relationship("Room", "Other", &rel).is_err());
    }

    #[test]
    fn referenced_twin_cannot_be_deleted() {
        let mut store = seeded();
        let rel = edge("Room", "AC");
        store.upsert_relationship("Room", &rel.id, &rel).unwrap();

        assert!(store.delete_twin("AC").is_err());
        assert!(store.delete_twin("Room").is_err());

        store.delete_relationship("Room", &rel.id).unwrap();
        store.delete_twin("AC").unwrap();
        store.delete_twin("Room").unwrap();
        assert!(store.twin_ids().is_empty());
    }

    #[test]
    fn deletes_are_idempotent() {
        let mut store = seeded();
        store.delete_model("Missing").unwrap();
        store.delete_twin("Missing").unwrap();
        store.delete_relationship("Room", "Missing").unwrap();
        store.delete_relationship("Missing", "Missing").unwrap();
    }

    #[test]
    fn list_relationships_of_missing_twin_is_not_found() {
        let store = seeded();
        assert!(store.list_relationships("Missing").unwrap_err().is_not_found());
    }

    #[test]
    fn keyset_pages() {
        let store = seeded().with_page_size(1);
        let first = store.query_twins_page(None).unwrap();
        assert_eq!(first.items, vec!["AC".to_string()]);
        assert_eq!(first.continuation.as_deref(), Some("AC"));

        let second = store.query_twins_page(first.continuation.as_deref()).unwrap();
        assert_eq!(second.items, vec!["Room".to_string()]);
        assert_eq!(second.continuation, None);
    }
}
