//! Shared test fixtures: in-memory and failure-injecting table stores plus a
//! collecting observability sink.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use delta_sink::deltasink::table::arrow::infer_schema;
use delta_sink::deltasink::{
    BatchEvent, ColumnBatch, CommitEvent, Credentials, FailureReport, FieldValue,
    MaterializeError, ObservabilitySink, SourceRecord, TableLocation, TableProbe, TableSchema,
    TableStore, WriteSummary,
};

/// Initialize logging for test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Build a source record with the given payload object
pub fn record(payload: serde_json::Value) -> SourceRecord {
    SourceRecord::new(json!({ "payload": payload }))
}

#[derive(Debug)]
pub struct MemoryTable {
    pub schema: TableSchema,
    pub commits: Vec<ColumnBatch>,
    pub version: i64,
}

/// In-memory [`TableStore`] with shared state across clones, so tests can
/// hand one handle to the stage and keep another for assertions.
#[derive(Clone, Default)]
pub struct MemoryTableStore {
    tables: Arc<Mutex<HashMap<String, MemoryTable>>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self, uri: &str) -> Option<i64> {
        self.tables.lock().unwrap().get(uri).map(|t| t.version)
    }

    pub fn row_count(&self, uri: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(uri)
            .map(|t| t.commits.iter().map(ColumnBatch::num_rows).sum())
            .unwrap_or(0)
    }

    /// Concatenated values of one column across all commits
    pub fn column_values(&self, uri: &str, name: &str) -> Vec<FieldValue> {
        self.tables
            .lock()
            .unwrap()
            .get(uri)
            .map(|t| {
                t.commits
                    .iter()
                    .flat_map(|c| c.column(name).unwrap_or(&[]).to_vec())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn probe(&self, location: &TableLocation, _credentials: &Credentials) -> TableProbe {
        match self.tables.lock().unwrap().get(location.as_str()) {
            Some(table) => TableProbe::Exists(table.schema.clone()),
            None => TableProbe::Absent,
        }
    }

    async fn create(
        &self,
        location: &TableLocation,
        _credentials: &Credentials,
        batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError> {
        let schema = infer_schema(batch)?;
        let mut tables = self.tables.lock().unwrap();
        // Idempotent at the location level: a lost create race degrades to
        // an append, like the real store
        let table = tables
            .entry(location.as_str().to_string())
            .or_insert_with(|| MemoryTable {
                schema,
                commits: Vec::new(),
                version: -1,
            });
        table.commits.push(batch.clone());
        table.version += 1;
        Ok(WriteSummary {
            rows: batch.num_rows(),
            version: table.version,
        })
    }

    async fn append(
        &self,
        location: &TableLocation,
        _credentials: &Credentials,
        batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError> {
        let batch_schema = infer_schema(batch)?;
        let mut tables = self.tables.lock().unwrap();
        let table = tables.get_mut(location.as_str()).ok_or_else(|| {
            MaterializeError::store_write(
                location.as_str(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such table"),
            )
        })?;
        // Schema merge: adopt columns the table has not seen before
        for (name, column_type) in batch_schema.columns() {
            if table.schema.get(name).is_none() {
                table.schema.push(name, column_type.clone());
            }
        }
        table.commits.push(batch.clone());
        table.version += 1;
        Ok(WriteSummary {
            rows: batch.num_rows(),
            version: table.version,
        })
    }

    async fn overwrite(
        &self,
        location: &TableLocation,
        _credentials: &Credentials,
        batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError> {
        let schema = infer_schema(batch)?;
        let mut tables = self.tables.lock().unwrap();
        let table = tables.get_mut(location.as_str()).ok_or_else(|| {
            MaterializeError::store_write(
                location.as_str(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such table"),
            )
        })?;
        table.schema = schema;
        table.commits = vec![batch.clone()];
        table.version += 1;
        Ok(WriteSummary {
            rows: batch.num_rows(),
            version: table.version,
        })
    }
}

/// Store whose writes always fail, with a configurable probe result.
/// Write attempts are counted so tests can assert what was (not) tried.
#[derive(Clone)]
pub struct FailingTableStore {
    probe: TableProbe,
    pub write_attempts: Arc<AtomicUsize>,
}

impl FailingTableStore {
    /// Probe reports absence; every write fails
    pub fn write_failure() -> Self {
        Self {
            probe: TableProbe::Absent,
            write_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Probe itself fails for a non-absence reason
    pub fn probe_indeterminate(reason: &str) -> Self {
        Self {
            probe: TableProbe::Indeterminate(reason.to_string()),
            write_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn fail(&self, location: &TableLocation) -> Result<WriteSummary, MaterializeError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(MaterializeError::store_write(
            location.as_str(),
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "injected write failure"),
        ))
    }
}

#[async_trait]
impl TableStore for FailingTableStore {
    async fn probe(&self, _location: &TableLocation, _credentials: &Credentials) -> TableProbe {
        self.probe.clone()
    }

    async fn create(
        &self,
        location: &TableLocation,
        _credentials: &Credentials,
        _batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError> {
        self.fail(location)
    }

    async fn append(
        &self,
        location: &TableLocation,
        _credentials: &Credentials,
        _batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError> {
        self.fail(location)
    }

    async fn overwrite(
        &self,
        location: &TableLocation,
        _credentials: &Credentials,
        _batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError> {
        self.fail(location)
    }
}

/// Observability sink that records everything it is handed
#[derive(Default)]
pub struct CollectingSink {
    pub batches: Mutex<Vec<BatchEvent>>,
    pub commits: Mutex<Vec<CommitEvent>>,
    pub failures: Mutex<Vec<FailureReport>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failure_kinds(&self) -> Vec<&'static str> {
        self.failures.lock().unwrap().iter().map(|f| f.kind).collect()
    }
}

impl ObservabilitySink for CollectingSink {
    fn batch_processed(&self, event: &BatchEvent) {
        self.batches.lock().unwrap().push(event.clone());
    }

    fn write_committed(&self, event: &CommitEvent) {
        self.commits.lock().unwrap().push(event.clone());
    }

    fn failure(&self, report: &FailureReport) {
        self.failures.lock().unwrap().push(report.clone());
    }
}
