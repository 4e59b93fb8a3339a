/// Domain-specific ID aliases for clarity (no runtime cost).
pub type TwinId = String;
pub type ModelId = String;
pub type RelationshipId = String;

/// Prefix of every synthesized relationship id.
pub const RELATIONSHIP_ID_PREFIX: &str = "RoomContains";

/// Relationship id for the edge that targets `target`.
///
/// Ids only need to be unique per source twin, and every row targets its own
/// unique id, so the target alone keys the edge.
pub fn relationship_id_for(target: &str) -> RelationshipId {
    format!("{RELATIONSHIP_ID_PREFIX}{target}")
}
