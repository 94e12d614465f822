//! Builds repository
//!
//! Everything the tracker asks of the CI server:
//! - Reading a job's last successful build
//! - Listing a build's artifacts
//! - Downloading one artifact into a build directory

use async_trait::async_trait;
use jenkronize_client::{ClientError, JenkinsClient, Result};
use jenkronize_core::domain::build::{Artifact, Build};
use std::path::Path;

/// Repository trait for build metadata and artifact files
#[async_trait]
pub trait BuildSource: Send + Sync {
    /// Base URL of the server, used in operator messages
    fn server(&self) -> &str;

    /// Fetches the last successful build of a job
    ///
    /// # Arguments
    /// * `job` - Normalized job path
    ///
    /// # Returns
    /// `None` when the job never built successfully
    async fn latest_successful_build(&self, job: &str) -> Result<Option<Build>>;

    /// Lists the artifacts of a build
    async fn artifacts(&self, build_url: &str) -> Result<Vec<Artifact>>;

    /// Downloads one artifact into `dest_dir`, resuming partial files
    ///
    /// # Returns
    /// Size of the downloaded file in bytes
    async fn download(&self, artifact: &Artifact, dest_dir: &Path) -> Result<u64>;
}

/// HTTP implementation of BuildSource backed by the Jenkins client
pub struct HttpBuildSource {
    client: JenkinsClient,
}

impl HttpBuildSource {
    pub fn new(client: JenkinsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BuildSource for HttpBuildSource {
    fn server(&self) -> &str {
        self.client.base_url()
    }

    async fn latest_successful_build(&self, job: &str) -> Result<Option<Build>> {
        self.client.latest_successful_build(job).await
    }

    async fn artifacts(&self, build_url: &str) -> Result<Vec<Artifact>> {
        self.client.artifacts(build_url).await
    }

    async fn download(&self, artifact: &Artifact, dest_dir: &Path) -> Result<u64> {
        let file_name = artifact.file_name().ok_or_else(|| {
            ClientError::InvalidArtifact(format!("no file name in {}", artifact.relative_path))
        })?;

        self.client
            .download_file(&artifact.url, &dest_dir.join(file_name))
            .await
    }
}
