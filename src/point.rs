// src/point.rs
//! Immutable time-series points and the builder that assembles them.

use std::collections::BTreeMap;

/// Value stored in a point field
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    /// Always finite; see [`FieldValue::float`]
    Float(f64),
    String(String),
    Boolean(bool),
}

impl FieldValue {
    /// Float field, or `None` for NaN/Infinity which cannot be stored
    pub fn float(v: f64) -> Option<Self> {
        v.is_finite().then_some(FieldValue::Float(v))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Integer(v.into())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointError {
    EmptyMeasurement,
    NoFields { measurement: String },
}

impl std::fmt::Display for PointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointError::EmptyMeasurement => write!(f, "point has an empty measurement name"),
            PointError::NoFields { measurement } => {
                write!(f, "point '{}' has no fields", measurement)
            }
        }
    }
}

impl std::error::Error for PointError {}

/// One time-series sample: measurement, indexed tags, field payload and a
/// millisecond timestamp. Built through [`PointBuilder`] and read-only after.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricPoint {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp_ms: i64,
}

impl MetricPoint {
    pub fn builder(measurement: impl Into<String>) -> PointBuilder {
        PointBuilder::new(measurement)
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

/// Accumulates tags and fields for a [`MetricPoint`]
#[derive(Debug, Clone)]
pub struct PointBuilder {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp_ms: i64,
}

impl PointBuilder {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp_ms: 0,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add a field unless one with the same key is already present.
    /// Returns false if the key was taken.
    pub fn try_field(&mut self, key: impl Into<String>, value: FieldValue) -> bool {
        match self.fields.entry(key.into()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub fn timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn build(self) -> Result<MetricPoint, PointError> {
        if self.measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }
        if self.fields.is_empty() {
            return Err(PointError::NoFields {
                measurement: self.measurement,
            });
        }
        Ok(MetricPoint {
            measurement: self.measurement,
            tags: self.tags,
            fields: self.fields,
            timestamp_ms: self.timestamp_ms,
        })
    }
}
