//! Retention of cached builds
//!
//! A job's sync directory holds one subdirectory per build, named by build
//! number. After a successful sync only the newest `builds_to_cache + 1`
//! of them are kept. Entries whose names are not numbers are never touched.

use jenkronize_core::domain::job::TrackedJob;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Picks the builds to delete so that `builds_to_cache + 1` remain
///
/// `builds` may be in any order. `current` is never selected.
pub fn builds_to_remove(builds: &[u32], builds_to_cache: i32, current: u32) -> Vec<u32> {
    if builds_to_cache < 0 {
        return Vec::new();
    }

    let keep = builds_to_cache as usize + 1;
    if builds.len() <= keep {
        return Vec::new();
    }

    let mut sorted = builds.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let excess = sorted.len().saturating_sub(keep);
    sorted
        .into_iter()
        .filter(|b| *b != current)
        .take(excess)
        .collect()
}

/// Lists the numeric build directories directly under `sync_dir`
async fn cached_builds(sync_dir: &Path) -> std::io::Result<BTreeMap<u32, PathBuf>> {
    let mut builds = BTreeMap::new();
    let mut entries = tokio::fs::read_dir(sync_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let Some(number) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u32>().ok())
        else {
            continue;
        };
        builds.insert(number, entry.path());
    }

    Ok(builds)
}

/// Deletes cached builds of `job` beyond its retention count
///
/// Failures are logged, never returned.
///
/// # Returns
/// The build numbers that were removed
pub async fn remove_outdated_builds(job: &TrackedJob, current: u32) -> Vec<u32> {
    if job.keeps_all_builds() {
        return Vec::new();
    }

    info!("Cleaning up old builds for {}", job.display_name());

    let cached = match cached_builds(&job.sync_dir).await {
        Ok(cached) => cached,
        Err(e) => {
            error!(
                "Failed to list dir contents for {}: {}",
                job.sync_dir.display(),
                e
            );
            return Vec::new();
        }
    };

    let numbers: Vec<u32> = cached.keys().copied().collect();
    info!(
        "{} currently has the following builds cached: {:?}",
        job.display_name(),
        numbers
    );

    let mut removed = Vec::new();
    for build in builds_to_remove(&numbers, job.builds_to_cache, current) {
        let Some(path) = cached.get(&build) else {
            continue;
        };
        info!("Removing outdated build {} of {}", build, job.display_name());
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => removed.push(build),
            Err(e) => error!("Failed to remove build {}: {}", build, e),
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn remaining(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_retention_exactness() {
        for keep in 0..6 {
            for total in 1..10u32 {
                let builds: Vec<u32> = (1..=total).collect();
                let removed = builds_to_remove(&builds, keep, total);
                let expected = (total as usize).saturating_sub(keep as usize + 1);
                assert_eq!(removed.len(), expected, "keep={} total={}", keep, total);
                assert_eq!(removed, (1..=expected as u32).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_negative_retention_keeps_everything() {
        let builds: Vec<u32> = (1..=20).collect();
        assert!(builds_to_remove(&builds, -1, 20).is_empty());
    }

    #[test]
    fn test_unsorted_input() {
        assert_eq!(builds_to_remove(&[6, 3, 5, 4], 2, 6), vec![3]);
    }

    #[test]
    fn test_current_build_is_never_selected() {
        // A stale directory from a higher number must not push out the build just synced
        assert_eq!(builds_to_remove(&[2, 50, 3], 0, 2), vec![3, 50]);
        assert_eq!(builds_to_remove(&[2, 50, 3], 1, 2), vec![3]);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_newest_and_ignores_non_numeric() {
        let dir = tempdir().unwrap();
        for name in ["3", "4", "5", "6", "latest", "notes"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("1"), b"a file, not a build").unwrap();
        std::fs::write(dir.path().join("6").join("app.zip"), b"zip").unwrap();

        let job = TrackedJob::new("foo", dir.path()).with_builds_to_cache(2);
        let removed = remove_outdated_builds(&job, 6).await;

        assert_eq!(removed, vec![3]);
        assert_eq!(remaining(dir.path()), vec!["1", "4", "5", "6", "latest", "notes"]);
        assert!(dir.path().join("6").join("app.zip").is_file());
    }

    #[tokio::test]
    async fn test_cleanup_with_negative_retention() {
        let dir = tempdir().unwrap();
        for name in ["1", "2", "3"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }

        let job = TrackedJob::new("foo", dir.path()).with_builds_to_cache(-1);
        assert!(remove_outdated_builds(&job, 3).await.is_empty());
        assert_eq!(remaining(dir.path()), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_cleanup_of_missing_dir_is_logged_only() {
        let dir = tempdir().unwrap();
        let job = TrackedJob::new("foo", dir.path().join("absent"));
        assert!(remove_outdated_builds(&job, 1).await.is_empty());
    }
}
