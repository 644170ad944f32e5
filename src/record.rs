// src/record.rs
//! Build record snapshot supplied by the CI host.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Outcome of a build as reported by the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    #[default]
    #[serde(other)]
    Unknown,
}

impl BuildResult {
    /// Upper-case name, as the host spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Failure => "FAILURE",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Aborted => "ABORTED",
            BuildResult::NotBuilt => "NOT_BUILT",
            BuildResult::Unknown => "UNKNOWN",
        }
    }

    /// Numeric code: 1 for success, 0 for everything else
    pub fn code(&self) -> i64 {
        match self {
            BuildResult::Success => 1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single build parameter. The value is kept as raw JSON until it is
/// mapped onto a point field.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub value: JsonValue,
}

/// One parameters action attached to a build
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ParameterSet {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Snapshot of one build's metadata at the time metrics are generated.
///
/// Collaborator outputs that the host may fail to provide (ownership,
/// health, time in queue) are optional here; the generator decides
/// whether their absence is fatal.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BuildRecord {
    pub job_name: String,
    pub build_number: u64,
    pub job_url: String,
    pub start_time_ms: i64,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub queuing_duration_ms: Option<u64>,
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub health_score: Option<u32>,
    #[serde(default)]
    pub parameters: Option<Vec<ParameterSet>>,
}

impl BuildRecord {
    /// Result, with a missing result treated as unknown
    pub fn result(&self) -> BuildResult {
        self.result.unwrap_or_default()
    }

    /// Absolute URL of this build: job URL followed by the build number
    pub fn build_url(&self) -> String {
        format!("{}{}", self.job_url, self.build_number)
    }

    /// Merge all parameter sets into a single name -> value view.
    /// Later occurrences of a name replace earlier ones.
    pub fn flattened_parameters(&self) -> BTreeMap<&str, &JsonValue> {
        let mut flat = BTreeMap::new();
        for set in self.parameters.iter().flatten() {
            for param in &set.parameters {
                flat.insert(param.name.as_str(), &param.value);
            }
        }
        flat
    }
}
