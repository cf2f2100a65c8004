//! Table store abstraction traits
//!
//! [`TableStore`] is the seam between the materializer's create-or-append
//! decision logic and the concrete storage engine. The production
//! implementation is [`DeltaTableStore`]; tests plug in in-memory and
//! failure-injecting fakes.
//!
//! [`DeltaTableStore`]: super::delta::DeltaTableStore

use async_trait::async_trait;
use std::fmt;

use crate::deltasink::batcher::ColumnBatch;
use crate::deltasink::config::{Credentials, TableLocation};
use crate::deltasink::error::MaterializeError;

/// The representable column types after coercion.
///
/// `Other` only appears when probing tables created outside this stage; the
/// write path never emits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    String,
    Other(std::string::String),
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::String => write!(f, "string"),
            ColumnType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Ordered column name/type pairs describing a table or a batch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSchema {
    columns: Vec<(String, ColumnType)>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, column_type: ColumnType) {
        self.columns.push((name.into(), column_type));
    }

    pub fn get(&self, name: &str) -> Option<&ColumnType> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnType)> {
        self.columns.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check that `batch` covers this table schema: every table column must
    /// be present in the batch with an equal coerced type. Extra batch
    /// columns are allowed (superset-or-equal) and handled by the store's
    /// schema merge.
    pub fn check_covered_by(&self, batch: &TableSchema) -> Result<(), String> {
        for (name, table_type) in self.columns() {
            match batch.get(name) {
                None => {
                    return Err(format!("batch is missing table column '{}'", name));
                }
                Some(batch_type) if batch_type != table_type => {
                    return Err(format!(
                        "column '{}' is {} in the table but {} in the batch",
                        name, table_type, batch_type
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, ColumnType)> for TableSchema {
    fn from_iter<I: IntoIterator<Item = (String, ColumnType)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Tri-state result of the table existence probe.
///
/// "Absent" and "errored" are distinct outcomes: an indeterminate probe
/// (auth failure, network fault) must not fall through to a create-write.
#[derive(Debug, Clone, PartialEq)]
pub enum TableProbe {
    /// The table exists; its current schema is attached
    Exists(TableSchema),
    /// The location holds no table yet
    Absent,
    /// The probe failed for a reason other than genuine absence
    Indeterminate(String),
}

/// Summary of one committed write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// Rows written by this commit
    pub rows: usize,
    /// Table version after the commit
    pub version: i64,
}

/// Core trait for versioned, column-oriented table stores.
///
/// One probe and at most one write per materialization call; atomicity of a
/// single write is the store's transaction/versioning primitive, and
/// conflicting concurrent writers are serialized by the store's own
/// optimistic concurrency.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Probe whether a table exists at `location`
    async fn probe(&self, location: &TableLocation, credentials: &Credentials) -> TableProbe;

    /// Create-write: establish the table with `batch` as its initial content.
    ///
    /// Must be idempotent at the location level: if a concurrent creator won
    /// the race between probe and write, this cleanly becomes an append.
    async fn create(
        &self,
        location: &TableLocation,
        credentials: &Credentials,
        batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError>;

    /// Add rows after existing table content
    async fn append(
        &self,
        location: &TableLocation,
        credentials: &Credentials,
        batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError>;

    /// Replace existing table content with `batch`
    async fn overwrite(
        &self,
        location: &TableLocation,
        credentials: &Credentials,
        batch: &ColumnBatch,
    ) -> Result<WriteSummary, MaterializeError>;
}
