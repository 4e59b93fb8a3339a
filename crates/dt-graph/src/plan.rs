//! Diff between the store's graph and the graph the source rows describe.

use std::collections::{BTreeMap, BTreeSet};

use dt_core::{DeviceRow, ModelId, Relationship, RelationshipId, RowSkipPolicy, TwinId};
use dt_store::{GraphStore, StoreResult, query_all_twins};

use crate::error::{GraphError, GraphResult};

/// Relationships the rows ask for, in row order, after the skip policy.
///
/// Only rows that name a relationship source are candidates; the policy is
/// applied to that candidate sequence.
pub fn relationship_candidates(rows: &[DeviceRow], policy: RowSkipPolicy) -> Vec<Relationship> {
    policy
        .apply(rows.iter().filter_map(DeviceRow::relationship))
        .collect()
}

/// Reject row sets that would break twin id uniqueness.
pub(crate) fn validate_rows(rows: &[DeviceRow]) -> GraphResult<()> {
    let mut seen = BTreeSet::new();
    for row in rows {
        if row.unique_id.is_empty() {
            return Err(GraphError::EmptyTwinId);
        }
        if !seen.insert(row.unique_id.as_str()) {
            return Err(GraphError::DuplicateTwin {
                id: row.unique_id.clone(),
            });
        }
    }
    Ok(())
}

/// Add/update/remove sets for a diff reconciliation, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub twins_to_add: Vec<(TwinId, ModelId)>,
    /// Twins whose model changed. Twins with an unchanged model are left alone.
    pub twins_to_update: Vec<(TwinId, ModelId)>,
    pub twins_to_remove: Vec<TwinId>,
    pub relationships_to_add: Vec<Relationship>,
    /// Relationships whose target or name changed.
    pub relationships_to_update: Vec<Relationship>,
    pub relationships_to_remove: Vec<Relationship>,
}

impl ReconcilePlan {
    /// Compare the store against `rows`.
    pub fn compute<S: GraphStore + ?Sized>(
        store: &S,
        rows: &[DeviceRow],
        policy: RowSkipPolicy,
    ) -> GraphResult<Self> {
        validate_rows(rows)?;

        let current_ids: Vec<TwinId> = query_all_twins(store).collect::<StoreResult<_>>()?;
        let mut current_twins: BTreeMap<TwinId, ModelId> = BTreeMap::new();
        let mut current_relationships: BTreeMap<(TwinId, RelationshipId), Relationship> =
            BTreeMap::new();
        for id in current_ids {
            let twin = store.get_twin(&id)?;
            for rel in store.list_relationships(&id)? {
                current_relationships.insert((rel.source.clone(), rel.id.clone()), rel);
            }
            current_twins.insert(id, twin.model_id);
        }

        let mut plan = ReconcilePlan::default();

        let desired_twins: BTreeMap<&str, &str> = rows
            .iter()
            .map(|r| (r.unique_id.as_str(), r.model_id.as_str()))
            .collect();
        for row in rows {
            match current_twins.get(&row.unique_id) {
                None => plan
                    .twins_to_add
                    .push((row.unique_id.clone(), row.model_id.clone())),
                Some(model) if *model != row.model_id => plan
                    .twins_to_update
                    .push((row.unique_id.clone(), row.model_id.clone())),
                Some(_) => {}
            }
        }
        plan.twins_to_remove = current_twins
            .keys()
            .filter(|id| !desired_twins.contains_key(id.as_str()))
            .cloned()
            .collect();

        let mut desired_keys = BTreeSet::new();
        for rel in relationship_candidates(rows, policy) {
            let key = (rel.source.clone(), rel.id.clone());
            match current_relationships.get(&key) {
                None => plan.relationships_to_add.push(rel),
                Some(existing) if *existing != rel => plan.relationships_to_update.push(rel),
                Some(_) => {}
            }
            desired_keys.insert(key);
        }
        plan.relationships_to_remove = current_relationships
            .into_iter()
            .filter(|(key, _)| !desired_keys.contains(key))
            .map(|(_, rel)| rel)
            .collect();

        Ok(plan)
    }

    pub fn is_empty(&self) -> bool {
        self.twins_to_add.is_empty()
            && self.twins_to_update.is_empty()
            && self.twins_to_remove.is_empty()
            && self.relationships_to_add.is_empty()
            && self.relationships_to_update.is_empty()
            && self.relationships_to_remove.is_empty()
    }
}
