//! Single writer for the state file
//!
//! Workers never touch the state file. They send their synced build to the
//! writer task, which owns the only copy of the snapshot, updates it and
//! rewrites the file before acknowledging.

use jenkronize_core::domain::build::Build;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::store::{Snapshot, StateError, StateStore};

const CHANNEL_CAPACITY: usize = 32;

enum StateCommand {
    Synced {
        job: String,
        build: Build,
        reply: oneshot::Sender<Result<(), StateError>>,
    },
}

/// Cloneable handle used by workers to record synced builds
#[derive(Clone)]
pub struct StateHandle {
    tx: mpsc::Sender<StateCommand>,
}

impl StateHandle {
    /// Records `build` as the last synced build of `job` and waits until the
    /// state file has been rewritten
    pub async fn record_sync(&self, job: &str, build: Build) -> Result<(), StateError> {
        let (reply, ack) = oneshot::channel();
        self.tx
            .send(StateCommand::Synced {
                job: job.to_string(),
                build,
                reply,
            })
            .await
            .map_err(|_| StateError::WriterClosed)?;
        ack.await.map_err(|_| StateError::WriterClosed)?
    }
}

/// Owner of the persisted snapshot
pub struct StateWriter {
    store: StateStore,
    snapshot: Snapshot,
    rx: mpsc::Receiver<StateCommand>,
}

impl StateWriter {
    /// Spawns the writer task
    ///
    /// The task ends once every [`StateHandle`] has been dropped and returns
    /// the final snapshot.
    pub fn spawn(store: StateStore, snapshot: Snapshot) -> (StateHandle, JoinHandle<Snapshot>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let writer = Self {
            store,
            snapshot,
            rx,
        };
        (StateHandle { tx }, tokio::spawn(writer.run()))
    }

    async fn run(mut self) -> Snapshot {
        info!("State writer started ({})", self.store.path().display());

        while let Some(command) = self.rx.recv().await {
            match command {
                StateCommand::Synced { job, build, reply } => {
                    let result = self.apply(&job, build).await;
                    if let Err(e) = &result {
                        error!("Failed to persist state for {}: {}", job, e);
                    }
                    // The worker may have gone away, nothing to do then
                    let _ = reply.send(result);
                }
            }
        }

        debug!("State writer stopped");
        self.snapshot
    }

    async fn apply(&mut self, job: &str, build: Build) -> Result<(), StateError> {
        let entry = self
            .snapshot
            .get_mut(job)
            .ok_or_else(|| StateError::UnknownJob(job.to_string()))?;

        let number = build.number;
        if !entry.record_build(build) {
            debug!(
                "Ignoring build {} of {}, already at {}",
                number,
                job,
                entry.build_number()
            );
            return Ok(());
        }

        self.store.save(&self.snapshot).await
    }
}
