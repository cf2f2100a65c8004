//! Sink-stage error types with proper context preservation
//!
//! Two boundaries, two taxonomies: batching errors are fatal to the current
//! batch and propagate to the caller; materializer errors are caught at the
//! materializer boundary, reported, and converted into a non-fatal outcome.

/// Errors raised while turning source records into a columnar batch.
///
/// These surface immediately - no partial batch is ever materialized.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A record's `payload` field is missing or not an object
    #[error("record {record}: payload is {reason}")]
    InputShape { record: String, reason: String },

    /// An external enrichment collaborator rejected a payload
    #[error("record {record}: enrichment failed")]
    Enrichment {
        record: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors raised while persisting a columnar batch into a table.
///
/// Everything here is caught at the [`TableMaterializer`] boundary and turned
/// into a [`MaterializeOutcome::Failed`], so a single batch's write failure
/// never aborts the host pipeline.
///
/// [`TableMaterializer`]: super::table::TableMaterializer
/// [`MaterializeOutcome::Failed`]: super::table::MaterializeOutcome::Failed
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// The existence probe failed for a reason other than genuine absence
    /// (auth, network). The materializer does not fall through to a
    /// create-write in this case.
    #[error("existence probe for table '{table}' was indeterminate: {reason}")]
    ProbeIndeterminate { table: String, reason: String },

    /// Append-mode write whose batch schema does not cover the existing
    /// table schema
    #[error("schema mismatch appending to table '{table}': {reason}")]
    SchemaMismatch { table: String, reason: String },

    /// A column's values have no common representable type
    #[error("column '{column}' has no common representable type: {reason}")]
    TypeCoercion { column: String, reason: String },

    /// Columns of differing lengths cannot be written as table rows
    #[error("column '{column}' has {actual} values but the batch has {expected} rows")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Assembling the Arrow representation of the batch failed
    #[error("failed to assemble arrow batch")]
    ArrowBatch {
        #[source]
        source: deltalake::arrow::error::ArrowError,
    },

    /// The underlying store rejected or failed the write
    #[error("write to table '{table}' failed")]
    StoreWrite {
        table: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl MaterializeError {
    /// Create a store write error from any underlying store failure
    pub fn store_write<E>(table: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StoreWrite {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Stable error kind tag for structured failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProbeIndeterminate { .. } => "probe_indeterminate",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::TypeCoercion { .. } => "type_coercion",
            Self::RaggedColumns { .. } => "ragged_columns",
            Self::ArrowBatch { .. } => "arrow_batch",
            Self::StoreWrite { .. } => "store_write",
        }
    }
}

/// Errors constructing sink configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Table location URI failed validation
    #[error("table location '{uri}' is invalid: {reason}")]
    InvalidLocation { uri: String, reason: String },

    /// A required environment variable is missing or empty
    #[error("missing required environment variable '{name}'")]
    MissingEnv { name: String },
}

/// Result type alias for batching operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Result type alias for materializer operations
pub type MaterializeResult<T> = Result<T, MaterializeError>;
