//! Read-only graph enumeration and post-reconciliation verification.

use std::collections::BTreeSet;

use dt_core::{DeviceRow, RelationshipId, RowSkipPolicy, TwinId};
use dt_store::{GraphStore, StoreResult, query_all_twins};

use crate::error::GraphResult;
use crate::plan::relationship_candidates;

/// Every twin id (in query order) and every relationship id in the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphListing {
    pub twins: Vec<TwinId>,
    pub relationships: BTreeSet<RelationshipId>,
}

impl GraphListing {
    pub fn read<S: GraphStore + ?Sized>(store: &S) -> GraphResult<Self> {
        let twins: Vec<TwinId> = query_all_twins(store).collect::<StoreResult<_>>()?;
        let mut relationships = BTreeSet::new();
        for id in &twins {
            for rel in store.list_relationships(id)? {
                relationships.insert(rel.id);
            }
        }
        Ok(Self {
            twins,
            relationships,
        })
    }

    /// Compare the listing with what reconciling `rows` should have produced.
    pub fn verify(&self, rows: &[DeviceRow], policy: RowSkipPolicy) -> VerifyReport {
        let expected_twins: BTreeSet<TwinId> = rows.iter().map(|r| r.unique_id.clone()).collect();
        let expected_relationships: BTreeSet<RelationshipId> = relationship_candidates(rows, policy)
            .into_iter()
            .map(|r| r.id)
            .collect();
        let actual_twins: BTreeSet<TwinId> = self.twins.iter().cloned().collect();

        VerifyReport {
            missing_twins: expected_twins.difference(&actual_twins).cloned().collect(),
            unexpected_twins: actual_twins.difference(&expected_twins).cloned().collect(),
            missing_relationships: expected_relationships
                .difference(&self.relationships)
                .cloned()
                .collect(),
            unexpected_relationships: self
                .relationships
                .difference(&expected_relationships)
                .cloned()
                .collect(),
        }
    }
}

/// Differences between the store and the rows it should mirror.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyReport {
    pub missing_twins: Vec<TwinId>,
    pub unexpected_twins: Vec<TwinId>,
    pub missing_relationships: Vec<RelationshipId>,
    pub unexpected_relationships: Vec<RelationshipId>,
}

impl VerifyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_twins.is_empty()
            && self.unexpected_twins.is_empty()
            && self.missing_relationships.is_empty()
            && self.unexpected_relationships.is_empty()
    }
}
