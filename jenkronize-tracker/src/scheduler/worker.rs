//! Per-job polling worker
//!
//! Each cycle queries the latest successful build of one job. A newer build
//! is downloaded in full; only then is it recorded, persisted and followed by
//! retention cleanup. Any failure leaves the recorded build untouched so the
//! next cycle retries the same candidate.

use jenkronize_client::{ClientError, ErrorClass};
use jenkronize_core::domain::build::Build;
use jenkronize_core::domain::job::TrackedJob;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::notify::Notifiers;
use crate::repository::BuildSource;
use crate::scheduler::Alerts;
use crate::service::{AggregateError, download_build, remove_outdated_builds};
use crate::state::StateHandle;

/// Collaborators shared by all workers
#[derive(Clone)]
pub struct WorkerContext {
    pub source: Arc<dyn BuildSource>,
    pub notifiers: Notifiers,
    pub alerts: Arc<Alerts>,
    pub state: StateHandle,
    pub poll_interval: Duration,
}

/// Result of one polling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Latest build already synced
    UpToDate,
    /// Job has never succeeded
    NoSuccessfulBuild,
    /// Build was downloaded and recorded
    Synced(u32),
    /// Build was found but could not be synced
    SyncFailed(u32),
    /// Latest build could not be queried
    QueryFailed(ErrorClass),
}

/// Polls a single job forever
pub struct JobWorker {
    job: TrackedJob,
    ctx: WorkerContext,
}

impl JobWorker {
    pub fn new(job: TrackedJob, ctx: WorkerContext) -> Self {
        Self { job, ctx }
    }

    #[cfg(test)]
    pub fn job(&self) -> &TrackedJob {
        &self.job
    }

    /// Runs polling cycles separated by the poll interval
    pub async fn run(mut self) {
        info!(
            "Tracking {} from build {} (interval: {:?})",
            self.job.display_name(),
            self.job.build_number(),
            self.ctx.poll_interval
        );

        loop {
            let outcome = self.poll_once().await;
            debug!("{} - cycle finished: {:?}", self.job.display_name(), outcome);
            time::sleep(self.ctx.poll_interval).await;
        }
    }

    /// Performs a single polling cycle
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let latest = match self
            .ctx
            .source
            .latest_successful_build(&self.job.name)
            .await
        {
            Ok(latest) => latest,
            Err(e) => {
                self.handle_query_error(&e).await;
                return CycleOutcome::QueryFailed(e.class());
            }
        };
        self.ctx.alerts.mark_reachable();

        let Some(candidate) = latest else {
            info!("{} - no successful build yet", self.job.display_name());
            return CycleOutcome::NoSuccessfulBuild;
        };

        if !self.job.is_behind(&candidate) {
            info!(
                "{} - last observed build {} is up to date",
                self.job.display_name(),
                candidate.number
            );
            return CycleOutcome::UpToDate;
        }

        let started = candidate
            .started_at
            .map(|t| format!(" (started {})", t.format("%Y-%m-%d %H:%M UTC")))
            .unwrap_or_default();
        self.notify(format!(
            "{} - new build {} detected{}, last synced was {}. Downloading artifacts...",
            self.job.display_name(),
            candidate.number,
            started,
            self.job.build_number()
        ))
        .await;

        self.sync_build(candidate).await
    }

    async fn sync_build(&mut self, candidate: Build) -> CycleOutcome {
        let number = candidate.number;

        let artifacts = match self.ctx.source.artifacts(&candidate.url).await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                self.handle_query_error(&e).await;
                return CycleOutcome::SyncFailed(number);
            }
        };

        info!(
            "{} - downloading {} artifact(s) of build {}",
            self.job.display_name(),
            artifacts.len(),
            number
        );

        let dest = self.job.build_dir(number);
        match download_build(Arc::clone(&self.ctx.source), artifacts, &dest).await {
            Ok(bytes) => {
                debug!("{} - {} bytes downloaded", self.job.display_name(), bytes);
                self.complete_sync(candidate).await;
                CycleOutcome::Synced(number)
            }
            Err(errors) => {
                self.handle_download_errors(number, &errors).await;
                CycleOutcome::SyncFailed(number)
            }
        }
    }

    async fn complete_sync(&mut self, build: Build) {
        let number = build.number;

        self.notify(format!(
            "{} - completed downloading artifacts for build {}.",
            self.job.display_name(),
            number
        ))
        .await;

        self.job.record_build(build.clone());
        if let Err(e) = self.ctx.state.record_sync(&self.job.name, build).await {
            error!(
                "{} - build {} synced but state was not saved: {}",
                self.job.display_name(),
                number,
                e
            );
        }

        remove_outdated_builds(&self.job, number).await;
    }

    async fn handle_query_error(&self, err: &ClientError) {
        error!("{} - {}", self.job.display_name(), err);

        match err.class() {
            ErrorClass::Connectivity => {
                if self.ctx.alerts.mark_unreachable() {
                    self.notify(format!(
                        "Cannot reach Jenkins server {} - check VPN, DNS or network connectivity",
                        self.ctx.source.server()
                    ))
                    .await;
                }
            }
            ErrorClass::Protocol => {
                self.notify(format!(
                    "{} - unexpected response from the Jenkins API ({}). This is usually \
                     intermittent, will try again after the poll interval.",
                    self.job.display_name(),
                    err
                ))
                .await;
            }
            ErrorClass::Transport => {
                self.notify(format!("{} - {}", self.job.display_name(), err))
                    .await;
            }
        }
    }

    async fn handle_download_errors(&self, number: u32, errors: &AggregateError) {
        for e in errors.errors() {
            error!("{} - {}", self.job.display_name(), e);
        }

        if errors.is_disk_full() {
            if !self.ctx.alerts.mark_out_of_space() {
                warn!(
                    "{} - disk still full, notification suppressed",
                    self.job.display_name()
                );
                return;
            }
            self.notify(format!(
                "{} - downloads failed because the disk is full; free up space and reduce \
                 builds_to_cache for this job",
                self.job.display_name()
            ))
            .await;
        }

        self.notify(format!(
            "{} - download of build {} failed on {} artifact(s); will retry after the poll interval.",
            self.job.display_name(),
            number,
            errors.len()
        ))
        .await;
    }

    async fn notify(&self, message: String) {
        info!("{}", message);
        self.ctx.notifiers.broadcast(&message).await;
    }
}
