//! The `Value` sum type backing both record shapes (SPEC_FULL.md §3, §9).

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// A single field value. Delimited formats always yield `Str`; JSONL
/// yields whichever scalar the source JSON actually carried; the key
/// model's typed coercion (`src/key.rs`) turns any of these into a
/// `num`/`date`/`nat` comparison value on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    Date(DateTime<Utc>),
}

impl Value {
    /// The raw string form used for dictionary-order comparison, natural
    /// sort, and deduplication equality checks.
    pub fn as_raw_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            Value::Date(d) => d.to_rfc3339(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a parsed JSON scalar into a `Value`, preserving its
    /// native type per the JSONL contract in SPEC_FULL.md §4.2.
    pub fn from_json(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => Some(Value::Null),
            JsonValue::Bool(b) => Some(Value::Bool(b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            JsonValue::String(s) => Some(Value::Str(s)),
            // Arrays/objects as field values aren't representable as a
            // scalar; the field resolves as a coercion miss.
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::Int(i) => JsonValue::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Null => JsonValue::Null,
            Value::Date(d) => JsonValue::String(d.to_rfc3339()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_raw_str())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
