//! Job-related API endpoints

use crate::JenkinsClient;
use crate::error::Result;
use jenkronize_core::domain::build::Build;
use jenkronize_core::dto::jenkins::{JOB_TREE, JobResponse};
use tracing::debug;

impl JenkinsClient {
    /// Get the last successful build of a job
    ///
    /// # Arguments
    /// * `job_path` - The job path (e.g., "/job/app/job/main") or its absolute URL
    ///
    /// # Returns
    /// The build, or `None` when the job has never built successfully
    pub async fn latest_successful_build(&self, job_path: &str) -> Result<Option<Build>> {
        debug!("Checking last successful build for {}", job_path);

        let job: JobResponse = self.get_json(job_path, JOB_TREE).await?;

        Ok(job.last_successful_build.map(Build::from))
    }
}
