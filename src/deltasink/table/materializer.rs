//! Create-or-append materialization with failure isolation.
//!
//! One `materialize` call is one self-contained unit of work: probe the
//! table, branch on existence, perform at most one write. Every error raised
//! along the way is caught at this boundary, reported through the
//! observability sink, and converted into a non-fatal outcome - losing one
//! batch's durability must not halt ingestion of later batches. Callers
//! needing retry-on-transient-failure simply re-invoke with the same batch:
//! create is idempotent, append and overwrite are safe to repeat after a
//! failed commit.

use std::sync::Arc;

use crate::deltasink::batcher::ColumnBatch;
use crate::deltasink::config::{Credentials, TableLocation, WriteMode};
use crate::deltasink::error::MaterializeError;
use crate::deltasink::observability::{
    CommitEvent, FailureReport, LogObservabilitySink, ObservabilityRef,
};

use super::arrow::infer_schema;
use super::delta::DeltaTableStore;
use super::store::{TableProbe, TableStore, WriteSummary};

/// Result of one materialization call.
///
/// Failure is data, not an `Err`: the host pipeline keeps processing
/// subsequent batches whatever happened to this one.
#[derive(Debug)]
pub enum MaterializeOutcome {
    /// The table was created with this batch as its initial content
    Created(WriteSummary),
    /// Rows were appended to the existing table
    Appended(WriteSummary),
    /// Existing table content was replaced
    Updated(WriteSummary),
    /// The batch had no columns; nothing to write
    Skipped,
    /// The write failed; the error was reported and the table is unchanged
    Failed(MaterializeError),
}

impl MaterializeOutcome {
    /// Whether this batch is now durable in the table
    pub fn is_durable(&self) -> bool {
        matches!(
            self,
            MaterializeOutcome::Created(_)
                | MaterializeOutcome::Appended(_)
                | MaterializeOutcome::Updated(_)
        )
    }

    fn committed(&self) -> Option<(&'static str, &WriteSummary)> {
        match self {
            MaterializeOutcome::Created(summary) => Some(("create", summary)),
            MaterializeOutcome::Appended(summary) => Some(("append", summary)),
            MaterializeOutcome::Updated(summary) => Some(("update", summary)),
            _ => None,
        }
    }
}

/// Durably persists column batches into a versioned table
pub struct TableMaterializer<S: TableStore = DeltaTableStore> {
    store: S,
    observability: ObservabilityRef,
}

impl TableMaterializer<DeltaTableStore> {
    /// Materializer against Delta Lake, reporting through the `log` facade
    pub fn new() -> Self {
        Self::with_store(DeltaTableStore::new())
    }
}

impl Default for TableMaterializer<DeltaTableStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TableStore> TableMaterializer<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            observability: Arc::new(LogObservabilitySink),
        }
    }

    pub fn with_observability(mut self, observability: ObservabilityRef) -> Self {
        self.observability = observability;
        self
    }

    /// Persist `batch` into the table at `location`, isolating failures.
    ///
    /// Probe strictly precedes the chosen write; both are the only
    /// suspension points. Credentials are read-only and never retained
    /// beyond this call.
    pub async fn materialize(
        &self,
        batch: &ColumnBatch,
        location: &TableLocation,
        credentials: &Credentials,
        mode: WriteMode,
    ) -> MaterializeOutcome {
        match self.try_materialize(batch, location, credentials, mode).await {
            Ok(outcome) => {
                if let Some((operation, summary)) = outcome.committed() {
                    self.observability.write_committed(&CommitEvent {
                        table: location.to_string(),
                        operation,
                        rows: summary.rows,
                        version: summary.version,
                    });
                }
                outcome
            }
            Err(error) => {
                log::error!("materialization failed for '{}': {}", location, error);
                self.observability
                    .failure(&FailureReport::from_error(location.to_string(), &error));
                MaterializeOutcome::Failed(error)
            }
        }
    }

    /// The propagating variant of [`materialize`](Self::materialize), for
    /// callers that want to handle errors themselves
    pub async fn try_materialize(
        &self,
        batch: &ColumnBatch,
        location: &TableLocation,
        credentials: &Credentials,
        mode: WriteMode,
    ) -> Result<MaterializeOutcome, MaterializeError> {
        if batch.is_empty() {
            return Ok(MaterializeOutcome::Skipped);
        }

        // Coercion and shape problems surface before any storage round-trip
        let batch_schema = infer_schema(batch)?;

        match self.store.probe(location, credentials).await {
            TableProbe::Absent => {
                let summary = self.store.create(location, credentials, batch).await?;
                Ok(MaterializeOutcome::Created(summary))
            }
            TableProbe::Indeterminate(reason) => {
                // Not conflated with absence: creating a table on top of an
                // auth or network fault would fork history
                Err(MaterializeError::ProbeIndeterminate {
                    table: location.to_string(),
                    reason,
                })
            }
            TableProbe::Exists(table_schema) => match mode {
                WriteMode::Update => {
                    let summary = self.store.overwrite(location, credentials, batch).await?;
                    Ok(MaterializeOutcome::Updated(summary))
                }
                // A requested create against an existing table upgrades to
                // an append, keeping retried creates idempotent
                WriteMode::Append | WriteMode::Create => {
                    table_schema.check_covered_by(&batch_schema).map_err(|reason| {
                        MaterializeError::SchemaMismatch {
                            table: location.to_string(),
                            reason,
                        }
                    })?;
                    let summary = self.store.append(location, credentials, batch).await?;
                    Ok(MaterializeOutcome::Appended(summary))
                }
            },
        }
    }
}
