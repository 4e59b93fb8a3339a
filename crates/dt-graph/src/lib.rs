//! dt-graph: keeps the remote graph in step with the source table.
//!
//! Provides:
//! - `ModelRegistry`: wholesale replacement of the uploaded model set
//! - `GraphReconciler`: destructive replace or diff-based reconciliation of
//!   twins and relationships
//! - `ReconcilePlan`: the add/update/remove sets a diff run applies
//! - `GraphListing`: read-only enumeration used to verify a run

pub mod error;
pub mod listing;
pub mod phase;
pub mod plan;
pub mod reconciler;
pub mod registry;
pub mod report;

pub use error::{GraphError, GraphResult};
pub use listing::{GraphListing, VerifyReport};
pub use phase::{ReconcilePhase, ReconcileStrategy};
pub use plan::{ReconcilePlan, relationship_candidates};
pub use reconciler::GraphReconciler;
pub use registry::{ModelRegistry, ModelUploadReport};
pub use report::{ReconcileReport, StepReport};
