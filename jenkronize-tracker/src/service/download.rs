//! Artifact download fan-out
//!
//! One task is spawned per artifact and every task runs to completion, even
//! when some of them fail. The failures of one build are collected into a
//! single [`AggregateError`].

use jenkronize_client::ClientError;
use jenkronize_core::domain::build::Artifact;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::repository::BuildSource;

/// Builds with more artifacts than this get a warning, since downloads are not capped
const FAN_OUT_WARNING: usize = 64;

/// Failure of a single artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Download of {artifact} failed: {source}")]
    Download {
        artifact: String,
        #[source]
        source: ClientError,
    },

    #[error("Cannot create build directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{artifact} would be stored as {file_name}, which another artifact of the build also uses")]
    NameCollision { artifact: String, file_name: String },

    #[error("Download task for {artifact} panicked")]
    Panicked { artifact: String },
}

impl ArtifactError {
    pub fn is_disk_full(&self) -> bool {
        match self {
            Self::Download { source, .. } => source.is_disk_full(),
            Self::Directory { source, .. } => {
                source.kind() == std::io::ErrorKind::StorageFull
                    || source
                        .to_string()
                        .to_lowercase()
                        .contains("no space left on device")
            }
            Self::NameCollision { .. } | Self::Panicked { .. } => false,
        }
    }
}

/// Every artifact failure observed while downloading one build
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<ArtifactError>,
}

impl AggregateError {
    pub fn push(&mut self, error: ArtifactError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ArtifactError] {
        &self.errors
    }

    /// Whether any failure was caused by the disk filling up
    pub fn is_disk_full(&self) -> bool {
        self.errors.iter().any(ArtifactError::is_disk_full)
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} artifact download(s) failed", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Downloads all `artifacts` into `dest_dir` concurrently
///
/// Artifacts are stored by file name. Artifacts sharing a file name are not
/// downloaded and each of them is reported as a [`ArtifactError::NameCollision`].
///
/// # Returns
/// Total bytes downloaded, or every failure once all tasks finished
pub async fn download_build(
    source: Arc<dyn BuildSource>,
    artifacts: Vec<Artifact>,
    dest_dir: &Path,
) -> Result<u64, AggregateError> {
    let mut failures = AggregateError::default();

    if let Err(e) = tokio::fs::create_dir_all(dest_dir).await {
        failures.push(ArtifactError::Directory {
            path: dest_dir.to_path_buf(),
            source: e,
        });
        return Err(failures);
    }

    if artifacts.len() > FAN_OUT_WARNING {
        warn!(
            "Starting {} concurrent downloads into {}",
            artifacts.len(),
            dest_dir.display()
        );
    }

    let mut names: HashMap<String, usize> = HashMap::new();
    for name in artifacts.iter().filter_map(Artifact::file_name) {
        *names.entry(name.to_string()).or_default() += 1;
    }

    let mut handles = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        if let Some(name) = artifact
            .file_name()
            .filter(|name| names.get(*name).is_some_and(|count| *count > 1))
        {
            failures.push(ArtifactError::NameCollision {
                artifact: artifact.relative_path.clone(),
                file_name: name.to_string(),
            });
            continue;
        }

        let source = Arc::clone(&source);
        let dir = dest_dir.to_path_buf();
        let name = artifact.relative_path.clone();
        let handle = tokio::spawn(async move { source.download(&artifact, &dir).await });
        handles.push((name, handle));
    }

    // Fan-in: wait for every task, no early exit
    let mut total = 0;
    for (artifact, handle) in handles {
        match handle.await {
            Ok(Ok(bytes)) => {
                debug!("Downloaded {} ({} bytes)", artifact, bytes);
                total += bytes;
            }
            Ok(Err(source)) => failures.push(ArtifactError::Download { artifact, source }),
            Err(e) => {
                warn!("Download task panicked: {}", e);
                failures.push(ArtifactError::Panicked { artifact });
            }
        }
    }

    if failures.is_empty() {
        Ok(total)
    } else {
        Err(failures)
    }
}
