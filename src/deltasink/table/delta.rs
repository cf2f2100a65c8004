//! Delta Lake table store implementation
//!
//! Binds the [`TableStore`] seam to delta-rs. A create-write is performed as
//! an append against the bare URI: the Delta commit protocol creates version
//! 0 atomically when the location is empty and appends when a concurrent
//! creator won the race, which is what makes retried create-writes
//! idempotent. Conflicting concurrent commits are serialized by the Delta
//! log's optimistic concurrency.

use async_trait::async_trait;
use std::sync::Once;

use deltalake::kernel::{DataType as DeltaDataType, PrimitiveType};
use deltalake::operations::write::SchemaMode;
use deltalake::protocol::SaveMode;
use deltalake::{DeltaOps, DeltaTable, DeltaTableError, ObjectStoreError};

use crate::deltasink::batcher::ColumnBatch;
use crate::deltasink::config::{Credentials, TableLocation};
use crate::deltasink::error::MaterializeError;

use super::arrow::to_record_batch;
use super::store::{ColumnType, TableProbe, TableSchema, TableStore, WriteSummary};

/// [`TableStore`] backed by Delta Lake on object storage
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaTableStore;

impl DeltaTableStore {
    pub fn new() -> Self {
        DeltaTableStore
    }

    async fn write(
        &self,
        location: &TableLocation,
        credentials: &Credentials,
        batch: &ColumnBatch,
        save_mode: SaveMode,
        schema_mode: Option<SchemaMode>,
    ) -> Result<WriteSummary, MaterializeError> {
        ensure_object_store_handlers(location);

        let record_batch = to_record_batch(batch)?;
        let rows = record_batch.num_rows();

        let ops = DeltaOps::try_from_uri_with_storage_options(
            location.as_str(),
            credentials.storage_options(),
        )
        .await
        .map_err(|e| MaterializeError::store_write(location.as_str(), e))?;

        let mut builder = ops.write(vec![record_batch]).with_save_mode(save_mode);
        if let Some(schema_mode) = schema_mode {
            builder = builder.with_schema_mode(schema_mode);
        }

        let table = builder
            .await
            .map_err(|e| MaterializeError::store_write(location.as_str(), e))?;

        Ok(WriteSummary {
            rows,
            version: table.version(),
        })
    }
}

#[async_trait]
impl TableStore for DeltaTableStore {
    async fn probe(&self, location: &TableLocation, credentials: &Credentials) -> TableProbe {
        ensure_object_store_handlers(location);

        match deltalake::open_table_with_storage_options(
            location.as_str(),
            credentials.storage_options(),
        )
        .await
        {
            Ok(table) => match read_schema(&table) {
                Ok(schema) => TableProbe::Exists(schema),
                Err(e) => TableProbe::Indeterminate(e.to_string()),
            },
            // No _delta_log at the location, or the path does not exist at
            // all: the table genuinely is not there yet
            Err(DeltaTableError::NotATable(_)) => TableProbe::Absent,
            Err(DeltaTableError::ObjectStore {
                source: ObjectStoreError::NotFound { .. },
            }) => TableProbe::Absent,
            Err(e) => TableProbe::Indeterminate(e.to_string()),
        }
    }

    async fn create(
        &self,
        location: &TableLocation,
        credentials: &Credentials,
        batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError> {
        // Append semantics: creates version 0 on an empty location, cleanly
        // appends if another writer created the table since the probe
        self.write(location, credentials, batch, SaveMode::Append, None)
            .await
    }

    async fn append(
        &self,
        location: &TableLocation,
        credentials: &Credentials,
        batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError> {
        // Schema merge admits the extra columns of a superset batch; the
        // materializer has already checked the batch covers the table schema
        self.write(
            location,
            credentials,
            batch,
            SaveMode::Append,
            Some(SchemaMode::Merge),
        )
        .await
    }

    async fn overwrite(
        &self,
        location: &TableLocation,
        credentials: &Credentials,
        batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError> {
        self.write(
            location,
            credentials,
            batch,
            SaveMode::Overwrite,
            Some(SchemaMode::Overwrite),
        )
        .await
    }
}

fn read_schema(table: &DeltaTable) -> Result<TableSchema, DeltaTableError> {
    let schema = table.get_schema()?;
    let mut table_schema = TableSchema::new();
    for field in schema.fields() {
        table_schema.push(field.name(), column_type(field.data_type()));
    }
    Ok(table_schema)
}

fn column_type(data_type: &DeltaDataType) -> ColumnType {
    match data_type {
        DeltaDataType::Primitive(
            PrimitiveType::Long | PrimitiveType::Integer | PrimitiveType::Short | PrimitiveType::Byte,
        ) => ColumnType::Integer,
        DeltaDataType::Primitive(PrimitiveType::Double | PrimitiveType::Float) => ColumnType::Float,
        DeltaDataType::Primitive(PrimitiveType::Boolean) => ColumnType::Boolean,
        DeltaDataType::Primitive(PrimitiveType::String) => ColumnType::String,
        other => ColumnType::Other(format!("{:?}", other)),
    }
}

/// Register the S3 object store handlers once per process; local filesystem
/// locations need no registration.
fn ensure_object_store_handlers(location: &TableLocation) {
    static S3_HANDLERS: Once = Once::new();
    if location.is_s3() {
        S3_HANDLERS.call_once(|| deltalake::aws::register_handlers(None));
    }
}
