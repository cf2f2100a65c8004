//! Column batch to Arrow conversion and type coercion.
//!
//! The store's native type inference works per column: a sequence of
//! all-integer values becomes an integer column, mixed integer/float widens
//! to float, and the presence of any string (or nested structure, which is
//! stringified as JSON) widens the whole column to a string column. Nulls
//! are type-transparent. Booleans stay booleans; mixing a boolean with a
//! numeric value has no common supertype and fails coercion.

use std::sync::Arc;

use deltalake::arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use deltalake::arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use deltalake::arrow::record_batch::RecordBatch;

use crate::deltasink::batcher::ColumnBatch;
use crate::deltasink::error::MaterializeError;
use crate::deltasink::types::FieldValue;

use super::store::{ColumnType, TableSchema};

/// Infer the coerced schema of a batch.
///
/// Also validates that the batch is rectangular - Arrow rows require equal
/// column lengths, so a ragged batch (heterogeneous records) cannot be
/// materialized and fails before any storage round-trip.
pub fn infer_schema(batch: &ColumnBatch) -> Result<TableSchema, MaterializeError> {
    let rows = batch.num_rows();
    let mut schema = TableSchema::new();
    for (name, values) in batch.iter() {
        if values.len() != rows {
            return Err(MaterializeError::RaggedColumns {
                column: name.to_string(),
                expected: rows,
                actual: values.len(),
            });
        }
        schema.push(name, coerce_column(name, values)?);
    }
    Ok(schema)
}

/// Convert a rectangular batch into a single Arrow record batch
pub fn to_record_batch(batch: &ColumnBatch) -> Result<RecordBatch, MaterializeError> {
    let schema = infer_schema(batch)?;

    let mut fields = Vec::with_capacity(schema.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.len());

    for ((name, values), (_, column_type)) in batch.iter().zip(schema.columns()) {
        fields.push(Field::new(name, arrow_type(column_type), true));
        arrays.push(build_array(column_type, values));
    }

    RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), arrays)
        .map_err(|source| MaterializeError::ArrowBatch { source })
}

/// Widen a column's values to their narrowest common representable type
fn coerce_column(name: &str, values: &[FieldValue]) -> Result<ColumnType, MaterializeError> {
    let mut column_type: Option<ColumnType> = None;

    for value in values {
        let value_type = match value {
            FieldValue::Null => continue,
            FieldValue::Integer(_) => ColumnType::Integer,
            FieldValue::Float(_) => ColumnType::Float,
            FieldValue::Boolean(_) => ColumnType::Boolean,
            // Strings and nested structures both land in string columns
            FieldValue::String(_) | FieldValue::Struct(_) | FieldValue::Array(_) => {
                ColumnType::String
            }
        };

        column_type = Some(match column_type {
            None => value_type,
            Some(current) if current == value_type => current,
            Some(ColumnType::Integer) if value_type == ColumnType::Float => ColumnType::Float,
            Some(ColumnType::Float) if value_type == ColumnType::Integer => ColumnType::Float,
            // Anything widens to string once a string is involved
            Some(ColumnType::String) => ColumnType::String,
            Some(_) if value_type == ColumnType::String => ColumnType::String,
            Some(current) => {
                return Err(MaterializeError::TypeCoercion {
                    column: name.to_string(),
                    reason: format!(
                        "cannot widen {} and {} ({} value '{}')",
                        current,
                        value_type,
                        value.type_name(),
                        value
                    ),
                });
            }
        });
    }

    // An all-null (or empty) column has no evidence either way; a nullable
    // string column accepts every later widening
    Ok(column_type.unwrap_or(ColumnType::String))
}

fn arrow_type(column_type: &ColumnType) -> DataType {
    match column_type {
        ColumnType::Integer => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Boolean => DataType::Boolean,
        // The write path only infers the four concrete types above
        ColumnType::String | ColumnType::Other(_) => DataType::Utf8,
    }
}

fn build_array(column_type: &ColumnType, values: &[FieldValue]) -> ArrayRef {
    match column_type {
        ColumnType::Integer => Arc::new(Int64Array::from(
            values
                .iter()
                .map(|v| match v {
                    FieldValue::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Float => Arc::new(Float64Array::from(
            values
                .iter()
                .map(|v| match v {
                    FieldValue::Integer(i) => Some(*i as f64),
                    FieldValue::Float(f) => Some(*f),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Boolean => Arc::new(BooleanArray::from(
            values
                .iter()
                .map(|v| match v {
                    FieldValue::Boolean(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::String | ColumnType::Other(_) => Arc::new(StringArray::from(
            values
                .iter()
                .map(|v| match v {
                    FieldValue::Null => None,
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltalake::arrow::array::Array;
    use serde_json::json;

    use crate::deltasink::types::SourceRecord;

    fn batch_of(values: Vec<serde_json::Value>) -> ColumnBatch {
        let records: Vec<SourceRecord> = values
            .into_iter()
            .map(|payload| SourceRecord::new(json!({ "payload": payload })))
            .collect();
        ColumnBatch::from_records(&records).unwrap()
    }

    #[test]
    fn test_all_integer_column_stays_integer() {
        let batch = batch_of(vec![json!({"id": 1}), json!({"id": 2})]);
        let schema = infer_schema(&batch).unwrap();
        assert_eq!(schema.get("id"), Some(&ColumnType::Integer));
    }

    #[test]
    fn test_integer_float_mix_widens_to_float() {
        let batch = batch_of(vec![json!({"qty": 1}), json!({"qty": 2.5})]);
        let schema = infer_schema(&batch).unwrap();
        assert_eq!(schema.get("qty"), Some(&ColumnType::Float));

        let record_batch = to_record_batch(&batch).unwrap();
        let column = record_batch
            .column(0)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(column.value(0), 1.0);
        assert_eq!(column.value(1), 2.5);
    }

    #[test]
    fn test_string_widens_everything() {
        let batch = batch_of(vec![json!({"v": 1}), json!({"v": "x"}), json!({"v": true})]);
        let schema = infer_schema(&batch).unwrap();
        assert_eq!(schema.get("v"), Some(&ColumnType::String));

        let record_batch = to_record_batch(&batch).unwrap();
        let column = record_batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(column.value(0), "1");
        assert_eq!(column.value(1), "x");
        assert_eq!(column.value(2), "true");
    }

    #[test]
    fn test_boolean_and_numeric_has_no_supertype() {
        let batch = batch_of(vec![json!({"flag": true}), json!({"flag": 1})]);
        let err = infer_schema(&batch).unwrap_err();
        assert!(matches!(err, MaterializeError::TypeCoercion { .. }));
    }

    #[test]
    fn test_nulls_are_type_transparent() {
        let batch = batch_of(vec![
            json!({"id": null}),
            json!({"id": 7}),
            json!({"id": null}),
        ]);
        let schema = infer_schema(&batch).unwrap();
        assert_eq!(schema.get("id"), Some(&ColumnType::Integer));

        let record_batch = to_record_batch(&batch).unwrap();
        let column = record_batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert!(column.is_null(0));
        assert_eq!(column.value(1), 7);
    }

    #[test]
    fn test_all_null_column_becomes_nullable_string() {
        let batch = batch_of(vec![json!({"v": null})]);
        let schema = infer_schema(&batch).unwrap();
        assert_eq!(schema.get("v"), Some(&ColumnType::String));
    }

    #[test]
    fn test_nested_struct_is_stringified_as_json() {
        let batch = batch_of(vec![json!({"geo": {"lat": 1.5, "lon": 2.0}})]);
        let record_batch = to_record_batch(&batch).unwrap();
        let column = record_batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(column.value(0), r#"{"lat":1.5,"lon":2.0}"#);
    }

    #[test]
    fn test_ragged_batch_is_rejected() {
        let batch = batch_of(vec![json!({"id": 3}), json!({"id": 4, "extra": "x"})]);
        let err = infer_schema(&batch).unwrap_err();
        match err {
            MaterializeError::RaggedColumns {
                column,
                expected,
                actual,
            } => {
                assert_eq!(column, "extra");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected ragged columns error, got {:?}", other),
        }
    }
}
