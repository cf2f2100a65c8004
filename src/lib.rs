//! # delta-sink
//!
//! A record-transformation stage for streaming CDC pipelines: converts batches
//! of keyed change-records into column-oriented batches and durably persists
//! them into Delta Lake tables on object storage.
//!
//! ## Features
//!
//! - **Columnar Batching**: Single-pass conversion of heterogeneous keyed
//!   records into column-oriented batches with deterministic column ordering
//! - **Create-or-Append Materialization**: Tri-state table existence probing
//!   with idempotent table creation and schema-checked appends
//! - **Failure Isolation**: Write failures are reported, never propagated -
//!   one lost batch never halts ingestion of later batches
//! - **Asynchronous Processing**: Built on `deltalake` & `tokio` for
//!   non-blocking storage round-trips
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use delta_sink::deltasink::{
//!     Credentials, DeltaSinkStage, SourceRecord, TableLocation, WriteMode,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let location = TableLocation::new("s3://my-bucket/deltas/customer_order")?;
//!     let credentials = Credentials::from_env()?;
//!
//!     let stage = DeltaSinkStage::new(location, credentials, WriteMode::Append);
//!
//!     let records: Vec<SourceRecord> = vec![/* from the upstream source */];
//!     let outcome = stage.process(&records).await?;
//!     println!("materialized: {:?}", outcome);
//!
//!     // `records` is untouched and can go to the downstream archival writer
//!     Ok(())
//! }
//! ```

pub mod deltasink;
