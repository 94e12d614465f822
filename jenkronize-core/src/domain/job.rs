//! Tracked job domain types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::build::Build;

/// A CI job under continuous observation
///
/// Structure shared between the tracker (mutates `build` after a successful
/// sync) and the state store (persists it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedJob {
    /// Normalized job path, the unique key of a tracked job
    pub name: String,

    /// Display name used in notifications
    #[serde(default)]
    pub alias: String,

    /// Last fully synchronized build
    #[serde(default)]
    pub build: Build,

    /// Root directory that receives one subdirectory per synced build
    pub sync_dir: PathBuf,

    /// Number of builds kept besides the newest one; negative keeps everything
    #[serde(default)]
    pub builds_to_cache: i32,
}

impl TrackedJob {
    /// Creates a job starting from build 0 with the alias defaulting to its name
    pub fn new(name: &str, sync_dir: impl Into<PathBuf>) -> Self {
        let name = normalize_name(name);
        Self {
            alias: name.clone(),
            name,
            build: Build::initial(),
            sync_dir: sync_dir.into(),
            builds_to_cache: 0,
        }
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        if let Some(alias) = alias.filter(|a| !a.trim().is_empty()) {
            self.alias = alias;
        }
        self
    }

    pub fn with_builds_to_cache(mut self, builds_to_cache: i32) -> Self {
        self.builds_to_cache = builds_to_cache;
        self
    }

    /// Name used in operator-facing messages
    pub fn display_name(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }

    pub fn build_number(&self) -> u32 {
        self.build.number
    }

    /// Whether `candidate` is strictly newer than the last synced build
    pub fn is_behind(&self, candidate: &Build) -> bool {
        candidate.number > self.build.number
    }

    /// Records a fully synced build
    ///
    /// The recorded number never decreases; an older or equal build is
    /// ignored and `false` is returned.
    pub fn record_build(&mut self, build: Build) -> bool {
        if build.number <= self.build.number {
            return false;
        }
        self.build = build;
        true
    }

    /// Whether retention is disabled for this job
    pub fn keeps_all_builds(&self) -> bool {
        self.builds_to_cache < 0
    }

    /// Directory that holds the artifacts of `build_number`
    pub fn build_dir(&self, build_number: u32) -> PathBuf {
        self.sync_dir.join(build_number.to_string())
    }

    /// Reconciles two definitions of the same job
    ///
    /// Both sides end up with the higher recorded build. Returns `false` and
    /// leaves both untouched when the names differ.
    pub fn reconcile_with(&mut self, other: &mut TrackedJob) -> bool {
        if self.name != other.name {
            return false;
        }
        if self.build.number >= other.build.number {
            other.build = self.build.clone();
        } else {
            self.build = other.build.clone();
        }
        true
    }
}

/// Lowercases a job path and trims trailing slashes
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('/').to_lowercase()
}
