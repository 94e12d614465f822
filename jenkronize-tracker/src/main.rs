//! Jenkronize
//!
//! Keeps local copies of the artifacts of Jenkins jobs up to date.
//!
//! Architecture:
//! - Configuration: TOML file plus environment overrides
//! - Repositories: HTTP access to the Jenkins server behind a trait
//! - Services: artifact download fan-out and retention of old builds
//! - Scheduler: one polling worker per tracked job
//! - State: last synced build per job, persisted by a single writer
//!
//! Each worker polls its job's latest successful build. A newer build has all
//! of its artifacts downloaded into `<sync_dir>/<build number>/`, then gets
//! recorded, persisted and followed by cleanup of builds beyond the job's
//! retention count. Operators are told about progress and failures through
//! the configured notifiers.

mod config;
mod logging;
mod notify;
mod repository;
mod scheduler;
mod service;
mod state;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::notify::{Notifiers, SlackNotifier};
use crate::repository::HttpBuildSource;
use crate::scheduler::Tracker;
use crate::state::{StateError, StateStore};
use jenkronize_client::JenkinsClient;

#[derive(Parser)]
#[command(name = "jenkronize")]
#[command(about = "Sync Jenkins build artifacts to local directories", long_about = None)]
struct Cli {
    /// Configuration file, defaults to config.toml beside the executable
    #[arg(long, env = "JENKRONIZE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config)?;
    logging::init_logging(config.log_file.as_deref())?;

    info!("Starting Jenkronize");
    info!(
        "Loaded configuration: jenkins={}, jobs={}, poll_interval={:?}",
        config.jenkins.url,
        config.tracker.jobs.len(),
        config.poll_interval()
    );

    // Initialize Jenkins client
    let client = JenkinsClient::new(config.jenkins.url.trim(), config.client_options())
        .context("Failed to create Jenkins client")?;
    let source = Arc::new(HttpBuildSource::new(client));

    let mut notifiers = Notifiers::new();
    for slack in &config.notifications.slack {
        notifiers.register(Arc::new(SlackNotifier::new(
            slack.webhook.clone(),
            slack.channel.clone(),
        )));
    }
    if notifiers.is_empty() {
        warn!("No notifiers configured, progress is only logged");
    } else {
        info!("{} notifier(s) registered", notifiers.len());
    }

    let mut tracker = Tracker::new(source, notifiers, config.poll_interval());
    for job in config.tracked_jobs() {
        tracker.track(job);
    }
    info!("Tracking {} job(s)", tracker.jobs().len());

    let store = StateStore::new(config.state_path()?);
    match tracker.load_state(&store).await {
        Ok(restored) => info!("Restored state of {} job(s)", restored),
        Err(e @ StateError::Corrupt { .. }) => {
            warn!("Ignoring unreadable state, all jobs start from build 0: {}", e);
        }
        Err(e) => return Err(e).context("Failed to load state"),
    }

    tokio::select! {
        _ = tracker.run(store) => {
            error!("All workers stopped");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
        }
    }

    Ok(())
}

/// Loads, overrides and validates the configuration
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    let mut config = Config::load_or_init(&path)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
