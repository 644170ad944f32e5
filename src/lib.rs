// src/lib.rs
//! Build metadata to InfluxDB points.
//!
//! A CI host posts a [`BuildRecord`] per build event; [`BuildPointGenerator`]
//! turns it into a `jenkins_build_data` point which is written as line
//! protocol through a [`PointSink`].

pub use bytes::Bytes;

pub mod cli;
mod convert;
pub mod generator;
mod handler;
pub mod line_protocol;
pub mod native;
pub mod point;
pub mod record;
pub mod sink;

pub use convert::{field_value_from_json, MalformedParameter};
pub use generator::{
    BuildPointGenerator, Clock, Dependency, FixedClock, GenerateError, PointGenerator,
    SystemClock, MEASUREMENT_NAME,
};
pub use point::{FieldValue, MetricPoint, PointBuilder, PointError};
pub use record::{BuildRecord, BuildResult, Parameter, ParameterSet};
pub use sink::{InfluxClient, InfluxTarget, PointSink, RetryConfig, SendResult};

// Re-export tracing for use in other modules
pub use tracing;

// Re-export for tests
pub use handler::{decode_record, handle_build_event, HandleError, HandleResponse};
pub use native::{build_router, init_tracing};
