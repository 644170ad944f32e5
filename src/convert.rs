// src/convert.rs
//! Shared conversion utilities

use serde_json::Value as JsonValue;

use crate::point::FieldValue;

/// A parameter value that has no point field representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedParameter {
    pub name: String,
    pub reason: &'static str,
}

impl std::fmt::Display for MalformedParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parameter '{}' skipped: {}", self.name, self.reason)
    }
}

impl std::error::Error for MalformedParameter {}

/// Convert a JSON parameter value to a string field.
///
/// Parameters are always written as text, the way the host renders them,
/// so one parameter name keeps a single field type across builds whatever
/// its value looks like. Null, arrays and objects are rejected.
pub fn field_value_from_json(name: &str, v: &JsonValue) -> Result<FieldValue, MalformedParameter> {
    let malformed = |reason| MalformedParameter {
        name: name.to_string(),
        reason,
    };
    match v {
        JsonValue::String(s) => Ok(FieldValue::String(s.clone())),
        JsonValue::Bool(b) => Ok(FieldValue::String(b.to_string())),
        JsonValue::Number(n) => Ok(FieldValue::String(n.to_string())),
        JsonValue::Null => Err(malformed("value is null")),
        JsonValue::Array(_) => Err(malformed("arrays are not supported")),
        JsonValue::Object(_) => Err(malformed("objects are not supported")),
    }
}
