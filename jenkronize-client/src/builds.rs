//! Build-related API endpoints

use crate::JenkinsClient;
use crate::error::{ClientError, Result};
use jenkronize_core::domain::build::Artifact;
use jenkronize_core::dto::jenkins::{BUILD_TREE, BuildResponse};
use tracing::debug;
use url::Url;

impl JenkinsClient {
    /// List the artifacts of a build
    ///
    /// # Arguments
    /// * `build_url` - The build URL as reported by the job payload
    ///
    /// # Returns
    /// One [`Artifact`] per archived file, with its absolute download URL
    pub async fn artifacts(&self, build_url: &str) -> Result<Vec<Artifact>> {
        let build: BuildResponse = self.get_json(build_url, BUILD_TREE).await?;

        debug!(
            "Build {} has {} artifact(s)",
            build.number,
            build.artifacts.len()
        );

        let base = self.resolve_url(build_url);
        build
            .artifacts
            .into_iter()
            .map(|entry| {
                let url = artifact_url(&base, &entry.relative_path)?;
                Ok(Artifact::new(entry.relative_path, url))
            })
            .collect()
    }
}

/// Resolves an artifact's relative path under `<build_url>/artifact/`
///
/// Characters that are not valid in a URL path (spaces, `#`, ...) are
/// percent-encoded.
pub fn artifact_url(build_url: &str, relative_path: &str) -> Result<String> {
    let invalid = |e: url::ParseError| {
        ClientError::InvalidArtifact(format!("{} under {}: {}", relative_path, build_url, e))
    };

    let base = Url::parse(&format!("{}/", build_url.trim_end_matches('/'))).map_err(invalid)?;
    let relative = relative_path.trim_start_matches('/').replace('#', "%23");

    let url = base
        .join("artifact/")
        .and_then(|root| root.join(&relative))
        .map_err(invalid)?;

    Ok(url.to_string())
}
