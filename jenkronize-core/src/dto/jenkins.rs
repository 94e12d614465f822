//! Jenkins JSON API payloads

use serde::Deserialize;

use crate::domain::build::Build;

/// `tree` filter applied when reading a job
pub const JOB_TREE: &str = "lastSuccessfulBuild[number,url,timestamp]";

/// `tree` filter applied when reading a build
pub const BUILD_TREE: &str = "number,url,artifacts[relativePath]";

/// Response of `<job>/api/json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    #[serde(default)]
    pub last_successful_build: Option<BuildRef>,
}

/// Reference to a build as embedded in a job payload
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRef {
    pub number: u32,
    pub url: String,
    /// Start time in milliseconds since the epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl From<BuildRef> for Build {
    fn from(value: BuildRef) -> Self {
        Build::new(value.number, value.url).with_timestamp_millis(value.timestamp)
    }
}

/// Response of `<build>/api/json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
    pub number: u32,
    pub url: String,
    #[serde(default)]
    pub artifacts: Vec<ArtifactEntry>,
}

/// One entry of a build's `artifacts` array
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactEntry {
    pub relative_path: String,
}
