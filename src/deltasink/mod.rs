//! Record transformation and Delta Lake persistence for streaming pipelines.
//!
//! Two components, consumed leaf-first:
//!
//! - **Columnar Batcher** ([`batcher`]): converts an ordered sequence of
//!   heterogeneous keyed records into a single column-oriented batch,
//!   preserving per-record order within each column.
//! - **Table Materializer** ([`table`]): durably persists a batch into a
//!   versioned Delta table - creating it if absent, appending or updating
//!   otherwise - and isolates failures so one lost batch never aborts the
//!   host pipeline.
//!
//! [`pipeline::DeltaSinkStage`] wires the two together behind a single
//! `process` call for the host.

pub mod batcher;
pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod table;
pub mod types;

// Re-export the types a host needs to wire the stage
pub use batcher::{ColumnBatch, Enricher};
pub use config::{Credentials, TableLocation, WriteMode};
pub use error::{BatchError, ConfigError, MaterializeError};
pub use observability::{
    BatchEvent, CommitEvent, FailureReport, LogObservabilitySink, ObservabilityRef,
    ObservabilitySink,
};
pub use pipeline::DeltaSinkStage;
pub use table::{
    DeltaTableStore, MaterializeOutcome, TableMaterializer, TableProbe, TableSchema, TableStore,
    WriteSummary,
};
pub use types::{FieldValue, Payload, SourceRecord};
