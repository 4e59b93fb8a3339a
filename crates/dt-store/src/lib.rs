//! dt-store: the remote graph store seen through a blocking client interface.
//!
//! Provides:
//! - the `GraphStore` trait every component talks to
//! - continuation-token pagination (`Page`, `Paged`, `list_models`, `query_all_twins`)
//! - `MemoryGraphStore`, an in-process store that enforces the graph invariants
//!   and persists itself as a JSON snapshot

pub mod error;
pub mod memory;
pub mod page;
pub mod store;

pub use error::{EntityKind, StoreError, StoreResult};
pub use memory::MemoryGraphStore;
pub use page::{Page, Paged};
pub use store::{GraphStore, list_models, query_all_twins};
