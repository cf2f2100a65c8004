//! Table materialization layer
//!
//! Everything between a [`ColumnBatch`] and a durable, versioned table:
//!
//! - **TableStore**: the seam between decision logic and storage engine
//! - **DeltaTableStore**: the Delta Lake binding
//! - **TableMaterializer**: create-or-append branching and failure isolation
//! - **arrow**: batch-to-Arrow conversion and type coercion
//!
//! [`ColumnBatch`]: super::batcher::ColumnBatch

pub mod arrow;
pub mod delta;
pub mod materializer;
pub mod store;

pub use delta::DeltaTableStore;
pub use materializer::{MaterializeOutcome, TableMaterializer};
pub use store::{ColumnType, TableProbe, TableSchema, TableStore, WriteSummary};
