//! Tracker configuration
//!
//! Configuration is read once at startup from a TOML file, overridden by a
//! few environment variables, validated, and then handed out by value. Nothing
//! else in the process reads it from a global.

use anyhow::{Context, Result};
use jenkronize_client::ClientOptions;
use jenkronize_core::domain::job::TrackedJob;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Optional file that receives a copy of all log output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Where last synced builds are persisted (default: state.json beside the executable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,

    pub jenkins: JenkinsConfig,

    pub tracker: TrackerConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Connection settings for the Jenkins server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JenkinsConfig {
    /// Base URL (e.g., "https://ci.example.com/jenkins")
    pub url: String,

    #[serde(default)]
    pub username: String,

    /// Password or API token
    #[serde(default)]
    pub password: String,

    /// Skip TLS certificate validation
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Per-request timeout; unset waits indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// Polling settings and the jobs to track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Wait between two checks of the same job
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// One tracked job as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job path on the server (e.g., "/job/app/job/main")
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Directory that receives one subdirectory per synced build
    pub sync_dir: PathBuf,

    /// Builds kept besides the newest one; negative keeps all
    #[serde(default)]
    pub builds_to_cache: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub slack: Vec<SlackConfig>,
}

/// A Slack incoming webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook: String,

    /// Overrides the webhook's default channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Config {
    /// An example configuration written for first-time users
    pub fn example() -> Self {
        Self {
            log_file: None,
            state_file: None,
            jenkins: JenkinsConfig {
                url: "https://your.jenkins.fqdn/jenkins".to_string(),
                username: "yourUserName".to_string(),
                password: "yourApiToken".to_string(),
                accept_invalid_certs: false,
                request_timeout_secs: None,
            },
            tracker: TrackerConfig {
                poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
                jobs: vec![JobConfig {
                    name: "/job/SomeProject/job/Build/job/SomeBranch".to_string(),
                    alias: Some("SomeProject".to_string()),
                    sync_dir: PathBuf::from("/path/to/artifact/cache"),
                    builds_to_cache: 2,
                }],
            },
            notifications: NotificationsConfig::default(),
        }
    }

    /// Parses a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    /// Loads the configuration at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid configuration {}", path.display()))
    }

    /// Loads the configuration, writing an example file first if none exists
    ///
    /// A freshly written example is never usable as is, so that case is
    /// reported as an error asking the operator to edit the file.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let example = toml::to_string_pretty(&Self::example())
                .context("Failed to serialize example configuration")?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, example)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("created example config at {}", path.display());
            anyhow::bail!(
                "No configuration found; an example was written to {}. Edit it before running again.",
                path.display()
            );
        }

        Self::load(path)
    }

    /// Applies overrides from process environment variables
    ///
    /// Recognized variables:
    /// - JENKINS_URL
    /// - JENKINS_USERNAME
    /// - JENKINS_PASSWORD
    /// - POLL_INTERVAL (seconds)
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("JENKINS_URL") {
            self.jenkins.url = url;
        }
        if let Some(username) = lookup("JENKINS_USERNAME") {
            self.jenkins.username = username;
        }
        if let Some(password) = lookup("JENKINS_PASSWORD") {
            self.jenkins.password = password;
        }
        if let Some(secs) = lookup("POLL_INTERVAL").and_then(|s| s.parse::<u64>().ok()) {
            self.tracker.poll_interval_secs = secs;
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.jenkins.url.trim();
        if url.is_empty() {
            anyhow::bail!("jenkins.url cannot be empty");
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("jenkins.url must start with http:// or https://");
        }

        if self.tracker.poll_interval_secs == 0 {
            anyhow::bail!("tracker.poll_interval_secs must be greater than 0");
        }

        if self.tracker.jobs.is_empty() {
            anyhow::bail!("tracker.jobs must list at least one job");
        }

        for job in &self.tracker.jobs {
            if job.name.trim().trim_end_matches('/').is_empty() {
                anyhow::bail!("tracked job names cannot be empty");
            }
            if job.sync_dir.as_os_str().is_empty() {
                anyhow::bail!("job {} has an empty sync_dir", job.name);
            }
        }

        for slack in &self.notifications.slack {
            if slack.webhook.trim().is_empty() {
                anyhow::bail!("notifications.slack webhook cannot be empty");
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.tracker.poll_interval_secs)
    }

    /// Builds the in-memory tracked jobs, all starting at build 0
    pub fn tracked_jobs(&self) -> Vec<TrackedJob> {
        self.tracker
            .jobs
            .iter()
            .map(|job| {
                TrackedJob::new(&job.name, job.sync_dir.clone())
                    .with_alias(job.alias.clone())
                    .with_builds_to_cache(job.builds_to_cache)
            })
            .collect()
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            username: Some(self.jenkins.username.clone()).filter(|u| !u.is_empty()),
            password: Some(self.jenkins.password.clone()).filter(|p| !p.is_empty()),
            accept_invalid_certs: self.jenkins.accept_invalid_certs,
            timeout: self.jenkins.request_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Resolved state file location
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => Ok(exe_dir()?.join("state.json")),
        }
    }
}

/// Directory containing the running executable
pub fn exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the executable")?;
    let dir = exe
        .parent()
        .context("Executable has no parent directory")?
        .to_path_buf();
    Ok(dir)
}

/// Default configuration file location: config.toml beside the executable
pub fn default_config_path() -> Result<PathBuf> {
    Ok(exe_dir()?.join("config.toml"))
}
