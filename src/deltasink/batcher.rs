//! Columnar batching: reshaping keyed records into column-oriented form.
//!
//! The batcher is a pure, single-pass transformation: for each record's
//! payload, each `(key, value)` pair is appended to that key's column in the
//! accumulating [`ColumnBatch`], creating the column on first sight. Records
//! with differing key sets are expected, not an error - schema drift across a
//! change stream is normal.

use async_trait::async_trait;
use std::collections::HashMap;

use super::error::BatchError;
use super::types::{FieldValue, Payload, SourceRecord};

/// A column-oriented batch: one ordered value sequence per column.
///
/// Column order is first-seen order across the record sequence, which makes
/// the output deterministic for a deterministic input. Columns may have
/// different lengths when records are heterogeneous; [`ColumnBatch::num_rows`]
/// reports the longest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnBatch {
    columns: Vec<(String, Vec<FieldValue>)>,
    index: HashMap<String, usize>,
}

impl ColumnBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to a column, creating the column on first sight
    pub fn push(&mut self, name: &str, value: FieldValue) {
        match self.index.get(name) {
            Some(&i) => self.columns[i].1.push(value),
            None => {
                self.index.insert(name.to_string(), self.columns.len());
                self.columns.push((name.to_string(), vec![value]));
            }
        }
    }

    /// Build a batch from a finite record slice in a single left-to-right
    /// pass.
    ///
    /// Every scalar under every record's payload appears exactly once in the
    /// result, in record-arrival order within its column. An empty slice
    /// yields an empty batch. A record with a missing or malformed payload
    /// fails the whole batch - no partial batch is produced.
    pub fn from_records(records: &[SourceRecord]) -> Result<Self, BatchError> {
        let mut batch = ColumnBatch::new();
        for record in records {
            batch.push_payload(record.payload()?);
        }
        Ok(batch)
    }

    /// Build a batch from already-extracted payloads (the enrichment path)
    pub fn from_payloads(payloads: impl IntoIterator<Item = Payload>) -> Self {
        let mut batch = ColumnBatch::new();
        for payload in payloads {
            batch.push_payload(payload);
        }
        batch
    }

    fn push_payload(&mut self, payload: Payload) {
        for (key, value) in payload {
            self.push(&key, value);
        }
    }

    pub fn column(&self, name: &str) -> Option<&[FieldValue]> {
        self.index
            .get(name)
            .map(|&i| self.columns[i].1.as_slice())
    }

    /// Iterate columns in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldValue])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Length of the longest column
    pub fn num_rows(&self) -> usize {
        self.columns
            .iter()
            .map(|(_, values)| values.len())
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether all columns have the same length (a prerequisite for
    /// materializing the batch as table rows)
    pub fn is_rectangular(&self) -> bool {
        let rows = self.num_rows();
        self.columns.iter().all(|(_, values)| values.len() == rows)
    }
}

/// External payload enrichment collaborator.
///
/// Invoked per record before batching when configured on the stage, e.g. to
/// attach derived fields such as geocoordinates. Enrichment failures
/// propagate exactly like malformed input: fatal to the current batch.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(
        &self,
        payload: Payload,
    ) -> Result<Payload, Box<dyn std::error::Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> SourceRecord {
        SourceRecord::new(value)
    }

    #[test]
    fn test_empty_input_yields_empty_batch() {
        let batch = ColumnBatch::from_records(&[]).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.num_rows(), 0);
    }

    #[test]
    fn test_columns_accumulate_in_arrival_order() {
        let records = vec![
            record(json!({"payload": {"id": 1, "name": "a"}})),
            record(json!({"payload": {"id": 2, "name": "b"}})),
        ];
        let batch = ColumnBatch::from_records(&records).unwrap();

        assert_eq!(batch.num_columns(), 2);
        assert_eq!(
            batch.column("id").unwrap(),
            &[FieldValue::Integer(1), FieldValue::Integer(2)]
        );
        assert_eq!(
            batch.column("name").unwrap(),
            &[
                FieldValue::String("a".to_string()),
                FieldValue::String("b".to_string())
            ]
        );
    }

    #[test]
    fn test_heterogeneous_key_sets() {
        let records = vec![
            record(json!({"payload": {"id": 3}})),
            record(json!({"payload": {"id": 4, "extra": "x"}})),
        ];
        let batch = ColumnBatch::from_records(&records).unwrap();

        assert_eq!(
            batch.column("id").unwrap(),
            &[FieldValue::Integer(3), FieldValue::Integer(4)]
        );
        assert_eq!(
            batch.column("extra").unwrap(),
            &[FieldValue::String("x".to_string())]
        );
        assert!(!batch.is_rectangular());
    }

    #[test]
    fn test_column_order_is_first_seen() {
        let records = vec![
            record(json!({"payload": {"b": 1, "a": 2}})),
            record(json!({"payload": {"c": 3, "a": 4}})),
        ];
        let batch = ColumnBatch::from_records(&records).unwrap();
        let names: Vec<&str> = batch.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_batching_is_deterministic() {
        let records = vec![
            record(json!({"payload": {"id": 1, "name": "a", "qty": 2.5}})),
            record(json!({"payload": {"name": "b", "id": 2}})),
        ];
        let first = ColumnBatch::from_records(&records).unwrap();
        let second = ColumnBatch::from_records(&records).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_payload_fails_whole_batch() {
        let records = vec![
            record(json!({"payload": {"id": 1}})),
            record(json!({"payload": "oops"})),
        ];
        let err = ColumnBatch::from_records(&records).unwrap_err();
        assert!(matches!(err, BatchError::InputShape { .. }));
    }
}
