//! The host-facing pipeline stage.
//!
//! [`DeltaSinkStage`] wires the columnar batcher into the table
//! materializer: extract payloads (enriching when configured), build the
//! column batch, report the batch event, materialize with failure isolation.
//! Records are borrowed and never mutated, so the host hands the same slice
//! to its downstream archival writer afterwards.

use std::sync::Arc;

use super::batcher::{ColumnBatch, Enricher};
use super::config::{Credentials, TableLocation, WriteMode};
use super::error::BatchError;
use super::observability::{BatchEvent, LogObservabilitySink, ObservabilityRef};
use super::table::{DeltaTableStore, MaterializeOutcome, TableMaterializer, TableStore};
use super::types::SourceRecord;

/// One transformation-and-persist stage of the host pipeline
pub struct DeltaSinkStage<S: TableStore = DeltaTableStore> {
    materializer: TableMaterializer<S>,
    location: TableLocation,
    credentials: Credentials,
    mode: WriteMode,
    enricher: Option<Arc<dyn Enricher>>,
    observability: ObservabilityRef,
}

impl DeltaSinkStage<DeltaTableStore> {
    /// Stage writing to Delta Lake at `location`
    pub fn new(location: TableLocation, credentials: Credentials, mode: WriteMode) -> Self {
        Self::with_store(DeltaTableStore::new(), location, credentials, mode)
    }
}

impl<S: TableStore> DeltaSinkStage<S> {
    pub fn with_store(
        store: S,
        location: TableLocation,
        credentials: Credentials,
        mode: WriteMode,
    ) -> Self {
        let observability: ObservabilityRef = Arc::new(LogObservabilitySink);
        Self {
            materializer: TableMaterializer::with_store(store)
                .with_observability(observability.clone()),
            location,
            credentials,
            mode,
            enricher: None,
            observability,
        }
    }

    /// Attach a payload enrichment collaborator, applied per record before
    /// batching
    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Replace the default log-backed observability sink
    pub fn with_observability(mut self, observability: ObservabilityRef) -> Self {
        self.observability = observability.clone();
        self.materializer = self.materializer.with_observability(observability);
        self
    }

    /// Process one finite slice of the record stream.
    ///
    /// Batching and enrichment errors are fatal to the batch and propagate;
    /// materializer errors are isolated inside the returned outcome and the
    /// host keeps going. In both cases `records` is left untouched for the
    /// downstream archival writer.
    pub async fn process(
        &self,
        records: &[SourceRecord],
    ) -> Result<MaterializeOutcome, BatchError> {
        let batch = self.build_batch(records).await?;

        self.observability.batch_processed(&BatchEvent {
            table: self.location.to_string(),
            records: records.len(),
            columns: batch.num_columns(),
        });

        Ok(self
            .materializer
            .materialize(&batch, &self.location, &self.credentials, self.mode)
            .await)
    }

    async fn build_batch(&self, records: &[SourceRecord]) -> Result<ColumnBatch, BatchError> {
        let enricher = match &self.enricher {
            None => return ColumnBatch::from_records(records),
            Some(enricher) => enricher,
        };

        let mut payloads = Vec::with_capacity(records.len());
        for record in records {
            let payload = record.payload()?;
            let enriched =
                enricher
                    .enrich(payload)
                    .await
                    .map_err(|source| BatchError::Enrichment {
                        record: record.describe(),
                        source,
                    })?;
            payloads.push(enriched);
        }
        Ok(ColumnBatch::from_payloads(payloads))
    }
}
