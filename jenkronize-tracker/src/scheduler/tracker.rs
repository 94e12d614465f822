//! Tracker: owns the configured jobs and runs their workers

use jenkronize_core::domain::job::TrackedJob;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::{Alerts, JobWorker, WorkerContext};
use crate::notify::Notifiers;
use crate::repository::BuildSource;
use crate::state::{Snapshot, StateError, StateStore, StateWriter, reconcile};

pub struct Tracker {
    jobs: Snapshot,
    source: Arc<dyn BuildSource>,
    notifiers: Notifiers,
    poll_interval: Duration,
}

impl Tracker {
    pub fn new(source: Arc<dyn BuildSource>, notifiers: Notifiers, poll_interval: Duration) -> Self {
        Self {
            jobs: Snapshot::new(),
            source,
            notifiers,
            poll_interval,
        }
    }

    /// Adds a job to track
    ///
    /// A job whose name is already tracked is not added again. The first
    /// registration keeps its settings and takes the higher of both recorded
    /// builds.
    ///
    /// # Returns
    /// `false` if the job was a duplicate
    pub fn track(&mut self, mut job: TrackedJob) -> bool {
        if let Some(existing) = self.jobs.get_mut(&job.name) {
            warn!(
                "Job {} is configured more than once, keeping the first definition",
                job.name
            );
            existing.reconcile_with(&mut job);
            return false;
        }
        self.jobs.insert(job.name.clone(), job);
        true
    }

    pub fn jobs(&self) -> &Snapshot {
        &self.jobs
    }

    /// Restores recorded build numbers from the state file
    ///
    /// # Returns
    /// The number of jobs that resumed from a persisted build
    pub async fn load_state(&mut self, store: &StateStore) -> Result<usize, StateError> {
        match store.load().await? {
            Some(persisted) => Ok(reconcile(&mut self.jobs, &persisted)),
            None => {
                info!(
                    "No state found at {}, all jobs start from build 0",
                    store.path().display()
                );
                Ok(0)
            }
        }
    }

    /// Runs one worker per job until every worker has stopped
    pub async fn run(self, store: StateStore) {
        let (state, writer) = StateWriter::spawn(store, self.jobs.clone());
        let ctx = WorkerContext {
            source: self.source,
            notifiers: self.notifiers,
            alerts: Arc::new(Alerts::default()),
            state,
            poll_interval: self.poll_interval,
        };

        info!("Starting {} worker(s)", self.jobs.len());

        let mut workers = JoinSet::new();
        for job in self.jobs.into_values() {
            workers.spawn(JobWorker::new(job, ctx.clone()).run());
        }
        drop(ctx);

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                error!("Worker task failed: {}", e);
            }
        }

        if let Err(e) = writer.await {
            error!("State writer failed: {}", e);
        }
    }
}
