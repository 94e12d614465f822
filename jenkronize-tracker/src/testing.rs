//! In-memory fakes for the repository and notifier seams

use async_trait::async_trait;
use jenkronize_client::{ClientError, ErrorClass, Result};
use jenkronize_core::domain::build::{Artifact, Build};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use crate::notify::{Notifier, NotifyError};
use crate::repository::BuildSource;

/// Notifier that remembers every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn post(&self, message: &str) -> std::result::Result<(), NotifyError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// How a scripted call fails
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Class(ErrorClass),
    DiskFull,
}

impl Failure {
    fn into_error(self, url: &str) -> ClientError {
        match self {
            Failure::Class(ErrorClass::Connectivity) => ClientError::Connectivity {
                url: url.to_string(),
                message: "dns error: failed to lookup address information".to_string(),
            },
            Failure::Class(ErrorClass::Protocol) => ClientError::Protocol {
                url: url.to_string(),
                message: "received HTML instead of JSON".to_string(),
            },
            Failure::Class(ErrorClass::Transport) => {
                ClientError::api_error(url, 500, "Internal Server Error")
            }
            Failure::DiskFull => {
                ClientError::io(url, io::Error::from(io::ErrorKind::StorageFull))
            }
        }
    }
}

/// Scripted CI server
///
/// `latest_successful_build` pops scripted replies in order and repeats the
/// last one once the script is exhausted.
#[derive(Default)]
pub struct FakeBuildSource {
    latest: Mutex<VecDeque<std::result::Result<Option<Build>, Failure>>>,
    last_reply: Mutex<Option<std::result::Result<Option<Build>, Failure>>>,
    artifacts: Mutex<HashMap<String, Vec<Artifact>>>,
    listing_failure: Mutex<Option<Failure>>,
    download_failures: Mutex<HashMap<String, Failure>>,
    downloads: Mutex<Vec<String>>,
}

impl FakeBuildSource {
    pub fn reply_build(&self, number: u32) -> &Self {
        self.latest
            .lock()
            .unwrap()
            .push_back(Ok(Some(build(number))));
        self
    }

    pub fn reply_started_build(&self, number: u32, started_millis: i64) -> &Self {
        let build = build(number).with_timestamp_millis(Some(started_millis));
        self.latest.lock().unwrap().push_back(Ok(Some(build)));
        self
    }

    pub fn reply_none(&self) -> &Self {
        self.latest.lock().unwrap().push_back(Ok(None));
        self
    }

    pub fn reply_failure(&self, failure: Failure) -> &Self {
        self.latest.lock().unwrap().push_back(Err(failure));
        self
    }

    /// Registers the artifacts of `number` by relative path
    pub fn with_artifacts(&self, number: u32, names: &[&str]) -> &Self {
        let build = build(number);
        let artifacts = names
            .iter()
            .map(|name| Artifact::new(*name, format!("{}artifact/{}", build.url, name)))
            .collect();
        self.artifacts.lock().unwrap().insert(build.url, artifacts);
        self
    }

    pub fn fail_listing(&self, failure: Option<Failure>) {
        *self.listing_failure.lock().unwrap() = failure;
    }

    pub fn fail_download(&self, name: &str, failure: Failure) {
        self.download_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), failure);
    }

    pub fn heal_download(&self, name: &str) {
        self.download_failures.lock().unwrap().remove(name);
    }

    /// Relative paths of every download attempt so far
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

pub fn build(number: u32) -> Build {
    Build::new(number, format!("http://ci.test/job/foo/{}/", number))
}

#[async_trait]
impl BuildSource for FakeBuildSource {
    fn server(&self) -> &str {
        "http://ci.test"
    }

    async fn latest_successful_build(&self, job: &str) -> Result<Option<Build>> {
        let next = self.latest.lock().unwrap().pop_front();
        let reply = match next {
            Some(reply) => {
                *self.last_reply.lock().unwrap() = Some(reply.clone());
                reply
            }
            None => self.last_reply.lock().unwrap().clone().unwrap_or(Ok(None)),
        };
        reply.map_err(|failure| failure.into_error(job))
    }

    async fn artifacts(&self, build_url: &str) -> Result<Vec<Artifact>> {
        if let Some(failure) = *self.listing_failure.lock().unwrap() {
            return Err(failure.into_error(build_url));
        }
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .get(build_url)
            .cloned()
            .unwrap_or_default())
    }

    async fn download(&self, artifact: &Artifact, dest_dir: &Path) -> Result<u64> {
        self.downloads
            .lock()
            .unwrap()
            .push(artifact.relative_path.clone());

        let failure = self
            .download_failures
            .lock()
            .unwrap()
            .get(&artifact.relative_path)
            .copied();
        if let Some(failure) = failure {
            return Err(failure.into_error(&artifact.url));
        }

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| ClientError::io(dest_dir, e))?;
        let file_name = artifact.file_name().ok_or_else(|| {
            ClientError::InvalidArtifact(format!("no file name in {}", artifact.relative_path))
        })?;
        let dest = dest_dir.join(file_name);
        tokio::fs::write(&dest, artifact.url.as_bytes())
            .await
            .map_err(|e| ClientError::io(&dest, e))?;
        Ok(artifact.url.len() as u64)
    }
}
