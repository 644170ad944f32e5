// src/generator.rs
//! Turns a build record into `jenkins_build_data` points.

use tracing::{debug, warn};

use crate::convert::{field_value_from_json, MalformedParameter};
use crate::point::{MetricPoint, PointError};
use crate::record::BuildRecord;

pub const MEASUREMENT_NAME: &str = "jenkins_build_data";

pub const JOB_NAME: &str = "job_name";
pub const JOB_URL: &str = "job_url";
pub const JOB_OWNER: &str = "job_owner";
pub const JOB_SCORE: &str = "job_score";
pub const BUILD_NUMBER: &str = "build_number";
pub const BUILD_RESULT: &str = "build_result";
pub const BUILD_RESULT_INT: &str = "build_result_int";
pub const BUILD_URL: &str = "build_url";
pub const BUILD_TIMESTAMP: &str = "build_timestamp";
pub const BUILD_DURATION: &str = "build_duration";
pub const QUEUING_DURATION: &str = "queuing_duration";
pub const TOTAL_DURATION: &str = "total_duration";
pub const BUILD_STATUS_MESSAGE: &str = "build_status_message";

/// Prefix for fields flattened from build parameters (`branch` -> `job_branch`)
pub const PARAMETER_FIELD_PREFIX: &str = "job_";

/// Host collaborator whose output a point cannot be built without
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dependency {
    Owner,
    HealthScore,
    QueuingDuration,
}

impl Dependency {
    pub fn name(&self) -> &'static str {
        match self {
            Dependency::Owner => "owner",
            Dependency::HealthScore => "health_score",
            Dependency::QueuingDuration => "queuing_duration_ms",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    MissingDependency(Dependency),
    HealthScoreOutOfRange(u32),
    Point(PointError),
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::MissingDependency(dep) => {
                write!(f, "missing dependency: {} not provided", dep.name())
            }
            GenerateError::HealthScoreOutOfRange(score) => {
                write!(f, "health score {} outside 0..=100", score)
            }
            GenerateError::Point(e) => write!(f, "invalid point: {}", e),
        }
    }
}

impl std::error::Error for GenerateError {}

impl From<PointError> for GenerateError {
    fn from(e: PointError) -> Self {
        GenerateError::Point(e)
    }
}

/// Source of the current wall-clock time in epoch millis
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock pinned to a single instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

/// Produces points for one build event
pub trait PointGenerator {
    fn generate(&self, record: &BuildRecord) -> Result<Vec<MetricPoint>, GenerateError>;
}

/// Generator for the build-data measurement
#[derive(Clone, Debug, Default)]
pub struct BuildPointGenerator<C = SystemClock> {
    clock: C,
}

impl BuildPointGenerator<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> BuildPointGenerator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Reported duration, or time elapsed since start when the build has
    /// not reported one yet. The fallback cannot tell a running build from
    /// one that legitimately took zero millis.
    fn effective_duration(&self, record: &BuildRecord) -> u64 {
        if record.duration_ms != 0 {
            return record.duration_ms;
        }
        let elapsed = self.clock.now_ms().saturating_sub(record.start_time_ms);
        u64::try_from(elapsed).unwrap_or(0)
    }
}

impl<C: Clock> PointGenerator for BuildPointGenerator<C> {
    fn generate(&self, record: &BuildRecord) -> Result<Vec<MetricPoint>, GenerateError> {
        let owner = record
            .owner
            .as_deref()
            .ok_or(GenerateError::MissingDependency(Dependency::Owner))?;
        let score = record
            .health_score
            .ok_or(GenerateError::MissingDependency(Dependency::HealthScore))?;
        if score > 100 {
            return Err(GenerateError::HealthScoreOutOfRange(score));
        }
        let queuing = record
            .queuing_duration_ms
            .ok_or(GenerateError::MissingDependency(Dependency::QueuingDuration))?;

        let duration = self.effective_duration(record);
        let result = record.result();

        let mut point = MetricPoint::builder(MEASUREMENT_NAME)
            .tag(JOB_NAME, record.job_name.as_str())
            .field(JOB_NAME, record.job_name.as_str())
            .tag(JOB_URL, record.job_url.as_str())
            .field(JOB_URL, record.job_url.as_str())
            .tag(JOB_OWNER, owner)
            .field(JOB_OWNER, owner)
            .field(BUILD_NUMBER, record.build_number)
            .field(BUILD_RESULT, result.as_str())
            .field(BUILD_RESULT_INT, result.code())
            .field(JOB_SCORE, score)
            .field(BUILD_URL, record.build_url())
            .field(BUILD_TIMESTAMP, record.start_time_ms)
            .field(BUILD_DURATION, duration)
            .field(QUEUING_DURATION, queuing)
            .field(TOTAL_DURATION, duration.saturating_add(queuing))
            .field(BUILD_STATUS_MESSAGE, record.status_message.as_str())
            .timestamp_ms(record.start_time_ms);

        for (name, value) in record.flattened_parameters() {
            let added = flatten_parameter(name, value)
                .map(|(key, field)| point.try_field(key, field));
            match added {
                Ok(true) => {}
                Ok(false) => warn!(
                    job = %record.job_name,
                    parameter = name,
                    "parameter collides with a build field, skipped"
                ),
                Err(e) => warn!(job = %record.job_name, error = %e, "malformed parameter"),
            }
        }

        let point = point.build()?;
        debug!(
            job = %record.job_name,
            build = record.build_number,
            fields = point.fields().len(),
            "generated build point"
        );
        Ok(vec![point])
    }
}

fn flatten_parameter(
    name: &str,
    value: &serde_json::Value,
) -> Result<(String, crate::point::FieldValue), MalformedParameter> {
    if name.is_empty() {
        return Err(MalformedParameter {
            name: String::new(),
            reason: "empty parameter name",
        });
    }
    let field = field_value_from_json(name, value)?;
    Ok((format!("{}{}", PARAMETER_FIELD_PREFIX, name), field))
}
