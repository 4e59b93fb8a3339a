//! dt-core: stable foundation for the twin simulator.
//!
//! Contains:
//! - ids (twin/model/relationship id aliases and relationship id synthesis)
//! - model (Model, Twin, Relationship, DeviceRow, Tick)
//! - table (the tabular row schema shared by the source table and the telemetry log)
//! - policy (explicit row-skip policy)
//! - clock (injectable wall clock)
//! - cancel (cooperative cancellation)
//! - outcome (per-entity failure records)
//! - error (shared error types)

pub mod cancel;
pub mod clock;
pub mod error;
pub mod ids;
pub mod model;
pub mod outcome;
pub mod policy;
pub mod table;

// Re-exports: nice ergonomics for downstream crates
pub use cancel::CancelToken;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DtError, DtResult};
pub use ids::*;
pub use model::*;
pub use outcome::EntityFailure;
pub use policy::RowSkipPolicy;
pub use table::TableRecord;
