//! Core record and value types for the sink stage.
//!
//! This module contains the fundamental data types consumed by the stage:
//! - [`FieldValue`] - the closed value variant carried by record payloads
//! - [`Payload`] - an insertion-ordered mapping from column name to value
//! - [`SourceRecord`] - one unit of change data from the upstream source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::error::BatchError;

/// A value in a record payload field
///
/// Records carry an open-ended mapping rather than a fixed structure; this
/// enum closes the value space so that type coercion during materialization
/// is total and checkable instead of relying on runtime duck-typing.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Boolean value (true/false)
    Boolean(bool),
    /// Null value
    Null,
    /// Nested structured data with named, insertion-ordered fields
    Struct(Vec<(String, FieldValue)>),
    /// Array of values
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Convert a JSON value into a [`FieldValue`].
    ///
    /// Object key order is preserved (serde_json is built with
    /// `preserve_order`), so payload iteration order matches the order the
    /// upstream producer emitted.
    pub fn from_json(value: &Value) -> FieldValue {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    FieldValue::Float(f)
                } else {
                    // Only reachable with arbitrary-precision numbers, which
                    // the default serde_json parser never produces
                    FieldValue::Null
                }
            }
            Value::String(s) => FieldValue::String(s.clone()),
            Value::Array(items) => {
                FieldValue::Array(items.iter().map(FieldValue::from_json).collect())
            }
            Value::Object(map) => FieldValue::Struct(
                map.iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert back into a JSON value (used when nested structures are
    /// stringified during type coercion).
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Null => Value::Null,
            FieldValue::Struct(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            FieldValue::Array(items) => {
                Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
        }
    }

    /// Human-readable type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Null => "null",
            FieldValue::Struct(_) => "struct",
            FieldValue::Array(_) => "array",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
            // Nested structures render as their JSON serialization
            FieldValue::Struct(_) | FieldValue::Array(_) => write!(f, "{}", self.to_json()),
        }
    }
}

/// An insertion-ordered mapping from column name to [`FieldValue`].
///
/// Iteration order is the order keys were first inserted; inserting an
/// existing key replaces its value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payload {
    fields: Vec<(String, FieldValue)>,
}

impl Payload {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Insert or replace a field, preserving first-insert position
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a payload from a JSON object, preserving key order.
    ///
    /// Anything other than an object is malformed input shape; the caller
    /// attaches record context to the error.
    pub fn from_json(value: &Value) -> Result<Payload, String> {
        match value {
            Value::Object(map) => Ok(Payload {
                fields: map
                    .iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                    .collect(),
            }),
            other => Err(format!("not an object (found {})", json_type_name(other))),
        }
    }
}

impl FromIterator<(String, FieldValue)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (k, v) in iter {
            payload.insert(k, v);
        }
        payload
    }
}

impl IntoIterator for Payload {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One unit of change data from the upstream source.
///
/// The envelope is opaque apart from the nested `payload` object inside
/// `value`, which maps column names to row values. Records are never mutated
/// by the sink stage; the host hands the same slice to its downstream
/// archival writer after processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Optional record key from the source (e.g. the CDC primary key)
    pub key: Option<String>,
    /// The record envelope as emitted by the source
    pub value: Value,
    /// Event time assigned by the source, if any
    pub timestamp: Option<DateTime<Utc>>,
}

impl SourceRecord {
    pub fn new(value: Value) -> Self {
        Self {
            key: None,
            value,
            timestamp: None,
        }
    }

    pub fn with_key(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: Some(key.into()),
            value,
            timestamp: None,
        }
    }

    /// Extract the `payload` mapping from the record envelope.
    ///
    /// A missing or non-object payload is an [`BatchError::InputShape`] and
    /// is fatal to the whole batch - records are never silently skipped.
    pub fn payload(&self) -> Result<Payload, BatchError> {
        match self.value.get("payload") {
            None => Err(BatchError::InputShape {
                record: self.describe(),
                reason: "missing".to_string(),
            }),
            Some(payload) => Payload::from_json(payload).map_err(|reason| {
                BatchError::InputShape {
                    record: self.describe(),
                    reason,
                }
            }),
        }
    }

    /// Short identifier for error context
    pub fn describe(&self) -> String {
        match &self.key {
            Some(key) => format!("'{}'", key),
            None => "<unkeyed>".to_string(),
        }
    }
}
