//! Observability sink for batch events and caught failures.
//!
//! The materializer never aborts the host pipeline on a write failure;
//! instead every caught error is turned into a structured [`FailureReport`]
//! and handed to the configured [`ObservabilitySink`]. Informational events
//! are emitted for each batch processed and each committed write.

use std::error::Error;
use std::sync::Arc;

use super::error::MaterializeError;

/// Informational event emitted once per batch handed to the stage
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEvent {
    /// Target table URI
    pub table: String,
    /// Number of records in the incoming slice
    pub records: usize,
    /// Number of columns in the resulting batch
    pub columns: usize,
}

/// Informational event emitted after a durable write commits
#[derive(Debug, Clone, PartialEq)]
pub struct CommitEvent {
    pub table: String,
    /// How the write landed: "create", "append" or "update"
    pub operation: &'static str,
    /// Rows written by this commit
    pub rows: usize,
    /// Table version after the commit
    pub version: i64,
}

/// Structured report for a failure caught at the materializer boundary
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    pub table: String,
    /// Stable error kind tag (see [`MaterializeError::kind`])
    pub kind: &'static str,
    /// Rendered error chain for the observability backend
    pub detail: String,
}

impl FailureReport {
    pub fn from_error(table: impl Into<String>, error: &MaterializeError) -> Self {
        Self {
            table: table.into(),
            kind: error.kind(),
            detail: render_chain(error),
        }
    }
}

/// Render an error with its source chain, innermost last
fn render_chain(error: &MaterializeError) -> String {
    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

/// External collaborator receiving events and failure reports.
///
/// The host supplies its own implementation (Sentry, metrics pipeline, ...);
/// [`LogObservabilitySink`] is the default and writes through the `log`
/// facade.
pub trait ObservabilitySink: Send + Sync {
    fn batch_processed(&self, event: &BatchEvent);
    fn write_committed(&self, event: &CommitEvent);
    fn failure(&self, report: &FailureReport);
}

/// Default observability sink backed by the `log` crate
pub struct LogObservabilitySink;

impl ObservabilitySink for LogObservabilitySink {
    fn batch_processed(&self, event: &BatchEvent) {
        log::info!(
            "batch for table '{}': {} records, {} columns",
            event.table,
            event.records,
            event.columns
        );
    }

    fn write_committed(&self, event: &CommitEvent) {
        log::info!(
            "{} committed to table '{}': {} rows, now at version {}",
            event.operation,
            event.table,
            event.rows,
            event.version
        );
    }

    fn failure(&self, report: &FailureReport) {
        log::error!(
            "materialization failed for table '{}' ({}): {}",
            report.table,
            report.kind,
            report.detail
        );
    }
}

/// Shared handle to an observability sink
pub type ObservabilityRef = Arc<dyn ObservabilitySink>;
