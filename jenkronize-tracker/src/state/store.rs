//! State file persistence (JSON)

use jenkronize_core::domain::job::TrackedJob;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// All tracked jobs keyed by name, as written to the state file
pub type Snapshot = BTreeMap<String, TrackedJob>;

/// Errors reading or writing the state file
#[derive(Debug, Error)]
pub enum StateError {
    #[error("State file I/O failed on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Job {0} is not tracked")]
    UnknownJob(String),

    #[error("State writer is no longer running")]
    WriterClosed,
}

/// Reads and writes the state file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted snapshot
    ///
    /// # Returns
    /// `None` if the file does not exist or is empty
    pub async fn load(&self) -> Result<Option<Snapshot>, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            "Loaded state for {} job(s) from {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(Some(snapshot))
    }

    /// Replaces the state file with `snapshot`
    ///
    /// The snapshot is written to a sibling temporary file first and renamed
    /// over the old one, so readers never observe a partial file.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Copies persisted build numbers into freshly configured jobs
///
/// Only the build number is taken from `persisted`; alias, sync directory and
/// retention always come from configuration. Persisted jobs that are no longer
/// configured are dropped.
///
/// # Returns
/// The number of jobs whose build number was restored
pub fn reconcile(jobs: &mut Snapshot, persisted: &Snapshot) -> usize {
    let mut restored = 0;
    for (name, job) in jobs.iter_mut() {
        if let Some(saved) = persisted.get(name) {
            job.build.number = saved.build.number;
            restored += 1;
            info!(
                "{} resumes from build {}",
                job.display_name(),
                job.build_number()
            );
        }
    }

    for name in persisted.keys().filter(|n| !jobs.contains_key(*n)) {
        debug!("Dropping state of job {} that is no longer configured", name);
    }

    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use jenkronize_core::domain::build::Build;
    use tempfile::tempdir;

    fn job(name: &str, dir: &str, build: u32, keep: i32) -> TrackedJob {
        let mut job = TrackedJob::new(name, dir).with_builds_to_cache(keep);
        job.record_build(Build::new(build, format!("http://ci/job/{}/{}/", name, build)));
        job
    }

    fn snapshot(jobs: Vec<TrackedJob>) -> Snapshot {
        jobs.into_iter().map(|j| (j.name.clone(), j)).collect()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "\n").unwrap();
        assert!(StateStore::new(path).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\"foo\": ").unwrap();
        let err = StateStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, StateError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));
        let state = snapshot(vec![job("foo", "/srv/foo", 6, 2), job("bar", "/srv/bar", 11, -1)]);

        store.save(&state).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded, state);
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_overwrites_longer_previous_content() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let many = snapshot((0..20).map(|i| job(&format!("job{}", i), "/srv", i, 0)).collect());
        store.save(&many).await.unwrap();

        let one = snapshot(vec![job("foo", "/srv/foo", 1, 0)]);
        store.save(&one).await.unwrap();

        assert_eq!(store.load().await.unwrap().unwrap(), one);
    }

    #[tokio::test]
    async fn test_state_file_layout() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        store
            .save(&snapshot(vec![job("foo", "/srv/foo", 6, 2)]))
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["foo"]["build"]["number"], 6);
        assert_eq!(raw["foo"]["sync_dir"], "/srv/foo");
        assert_eq!(raw["foo"]["builds_to_cache"], 2);
        assert_eq!(raw["foo"]["alias"], "foo");
    }

    #[test]
    fn test_reconcile_copies_only_build_number() {
        let mut configured = snapshot(vec![
            job("foo", "/new/foo", 0, 5).with_alias(Some("Foo".to_string())),
            job("fresh", "/new/fresh", 0, 1),
        ]);
        let persisted = snapshot(vec![
            job("foo", "/old/foo", 6, 1).with_alias(Some("Old Foo".to_string())),
            job("removed", "/old/removed", 9, 0),
        ]);

        assert_eq!(reconcile(&mut configured, &persisted), 1);

        let foo = &configured["foo"];
        assert_eq!(foo.build_number(), 6);
        assert_eq!(foo.display_name(), "Foo");
        assert_eq!(foo.sync_dir, PathBuf::from("/new/foo"));
        assert_eq!(foo.builds_to_cache, 5);

        assert_eq!(configured["fresh"].build_number(), 0);
        assert!(!configured.contains_key("removed"));
    }
}
