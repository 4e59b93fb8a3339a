//! The `GraphStore` client interface.

use dt_core::{Model, Relationship, Twin, TwinId, TwinPayload};

use crate::error::StoreResult;
use crate::page::{Page, Paged};

/// Blocking client for the remote graph store.
///
/// Every mutating call must be idempotent: deleting something that is already
/// gone succeeds, and upserting the same payload twice leaves the same state.
pub trait GraphStore {
    /// One page of the uploaded models.
    fn list_models_page(&self, continuation: Option<&str>) -> StoreResult<Page<Model>>;

    /// Create a set of models in one batch. All or nothing.
    fn create_models(&mut self, models: &[Model]) -> StoreResult<()>;

    fn delete_model(&mut self, id: &str) -> StoreResult<()>;

    fn get_twin(&self, id: &str) -> StoreResult<Twin>;

    /// Create or replace a twin. The payload's model must already exist.
    fn upsert_twin(&mut self, id: &str, payload: &TwinPayload) -> StoreResult<()>;

    /// Delete a twin. Refused while any relationship still references it.
    fn delete_twin(&mut self, id: &str) -> StoreResult<()>;

    /// One page of the full-graph twin query.
    fn query_twins_page(&self, continuation: Option<&str>) -> StoreResult<Page<TwinId>>;

    /// Outgoing relationships of a twin.
    fn list_relationships(&self, twin_id: &str) -> StoreResult<Vec<Relationship>>;

    /// Create or replace a relationship. Both endpoints must already exist.
    fn upsert_relationship(
        &mut self,
        source_id: &str,
        id: &str,
        relationship: &Relationship,
    ) -> StoreResult<()>;

    fn delete_relationship(&mut self, source_id: &str, id: &str) -> StoreResult<()>;
}

/// Lazily enumerate every model in the store.
pub fn list_models<S: GraphStore + ?Sized>(
    store: &S,
) -> Paged<Model, impl FnMut(Option<String>) -> StoreResult<Page<Model>> + '_> {
    Paged::new(move |token: Option<String>| store.list_models_page(token.as_deref()))
}

/// Lazily enumerate the id of every twin in the graph.
pub fn query_all_twins<S: GraphStore + ?Sized>(
    store: &S,
) -> Paged<TwinId, impl FnMut(Option<String>) -> StoreResult<Page<TwinId>> + '_> {
    Paged::new(move |token: Option<String>| store.query_twins_page(token.as_deref()))
}
