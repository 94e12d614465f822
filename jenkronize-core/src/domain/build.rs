//! Build and artifact domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A numbered build of a CI job
///
/// Builds are immutable values. The number is monotonic per job as reported
/// by the CI server and the URL is the locator used to list its artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub number: u32,
    #[serde(default)]
    pub url: String,

    /// When the build started, if the server reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl Build {
    pub fn new(number: u32, url: impl Into<String>) -> Self {
        Self {
            number,
            url: url.into(),
            started_at: None,
        }
    }

    /// Sets the start time from Jenkins' milliseconds since the epoch
    pub fn with_timestamp_millis(mut self, millis: Option<i64>) -> Self {
        self.started_at = millis.and_then(DateTime::from_timestamp_millis);
        self
    }

    /// The placeholder build a job starts from before anything was synced
    pub fn initial() -> Self {
        Self::default()
    }
}

/// A file produced by a build, resolved to a download URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path of the file relative to the build's artifact root
    pub relative_path: String,

    /// Absolute download URL
    pub url: String,
}

impl Artifact {
    pub fn new(relative_path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            url: url.into(),
        }
    }

    /// Name the artifact is stored under inside a build directory
    ///
    /// Artifacts are flattened: only the last path component is kept. Returns
    /// `None` when that component is empty or would escape the directory.
    pub fn file_name(&self) -> Option<&str> {
        let name = self
            .relative_path
            .trim_end_matches('/')
            .rsplit(['/', '\\'])
            .next()?;

        match name {
            "" | "." | ".." => None,
            name => Some(name),
        }
    }
}
