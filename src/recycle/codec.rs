//! Snapshot codec: record map <-> flat JSON document.
//!
//! Decoding infers a bind type per column. The goal is a value that survives a
//! single parameterized INSERT, not full type fidelity.

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::RecycleError;

/// Sentinel shown for entries without data
pub const NO_DATA: &str = "No data";

const ELLIPSIS: &str = "...";

/// A decoded column value tagged with its bind type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnapshotValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl SnapshotValue {
    /// Infer the bind type of a decoded JSON value
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null => SnapshotValue::Null,
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SnapshotValue::Int(i)
                } else if n.is_u64() {
                    // Beyond i64; keep the digits rather than lose precision
                    SnapshotValue::Text(n.to_string())
                } else {
                    n.as_f64()
                        .map(SnapshotValue::Float)
                        .unwrap_or_else(|| SnapshotValue::Text(n.to_string()))
                }
            }
            Value::String(s) => SnapshotValue::Text(s.clone()),
            Value::Bool(b) => SnapshotValue::Text(b.to_string()),
            Value::Array(_) | Value::Object(_) => SnapshotValue::Text(value.to_string()),
        }
    }

    /// Single-letter bind type: integer, double or string
    pub fn bind_type(&self) -> char {
        match self {
            SnapshotValue::Int(_) => 'i',
            SnapshotValue::Float(_) => 'd',
            SnapshotValue::Text(_) | SnapshotValue::Null => 's',
        }
    }

    /// Positive integer interpretation, used for primary keys
    pub fn as_positive_id(&self) -> Option<i64> {
        match self {
            SnapshotValue::Int(i) if *i > 0 => Some(*i),
            SnapshotValue::Text(s) => s.trim().parse::<i64>().ok().filter(|i| *i > 0),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SnapshotValue::Int(i) => Value::from(*i),
            SnapshotValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SnapshotValue::Text(s) => Value::String(s.clone()),
            SnapshotValue::Null => Value::Null,
        }
    }
}

/// Ordered column -> value mapping decoded from a snapshot document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    fields: Vec<(String, SnapshotValue)>,
}

impl Snapshot {
    pub fn get(&self, column: &str) -> Option<&SnapshotValue> {
        self.fields.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    /// Replace or append a column value
    pub fn set(&mut self, column: &str, value: SnapshotValue) {
        match self.fields.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column.to_string(), value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<SnapshotValue> {
        let idx = self.fields.iter().position(|(name, _)| name == column)?;
        Some(self.fields.remove(idx).1)
    }

    /// Keep only the columns for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.fields.retain(|(name, _)| keep(name));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapshotValue)> {
        self.fields.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn to_record(&self) -> Map<String, Value> {
        self.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect()
    }
}

/// Serialize a record into a flat-scalar snapshot document.
///
/// Values are normalized the same way `decode` reads them back, so the stored
/// document is a fixed point of decode -> encode.
pub fn encode(record: &Map<String, Value>) -> Result<String, RecycleError> {
    let flat: Map<String, Value> = record
        .iter()
        .map(|(column, value)| (column.clone(), SnapshotValue::infer(value).to_json()))
        .collect();

    serde_json::to_string(&flat).map_err(|e| RecycleError::CorruptSnapshot(e.to_string()))
}

/// Parse a snapshot document into typed columns
pub fn decode(document: &str) -> Result<Snapshot, RecycleError> {
    let parsed: Value = serde_json::from_str(document)
        .map_err(|e| RecycleError::CorruptSnapshot(format!("invalid snapshot document: {}", e)))?;

    let Value::Object(map) = parsed else {
        return Err(RecycleError::CorruptSnapshot(
            "snapshot document is not an object".to_string(),
        ));
    };
    if map.is_empty() {
        return Err(RecycleError::CorruptSnapshot("snapshot contains no columns".to_string()));
    }

    Ok(Snapshot {
        fields: map
            .iter()
            .map(|(column, value)| (column.clone(), SnapshotValue::infer(value)))
            .collect(),
    })
}

/// Short, normalized rendering of raw entry data for operator listings
pub fn preview(raw: Option<&str>, max_len: usize) -> String {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return NO_DATA.to_string(),
    };

    let normalized = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => return NO_DATA.to_string(),
        Ok(value) => value.to_string(),
        Err(_) => raw.to_string(),
    };

    if normalized.chars().count() > max_len {
        let mut cut: String = normalized.chars().take(max_len).collect();
        cut.push_str(ELLIPSIS);
        cut
    } else {
        normalized
    }
}
