//! Jenkronize Jenkins Client
//!
//! A small, typed HTTP client for the parts of the Jenkins JSON API the
//! tracker needs: reading a job's last successful build, listing a build's
//! artifacts, and downloading artifact files with resume support.
//!
//! # Example
//!
//! ```no_run
//! use jenkronize_client::{ClientOptions, JenkinsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = JenkinsClient::new("https://ci.example.com", ClientOptions::default())?;
//!
//!     if let Some(build) = client.latest_successful_build("/job/app/job/main").await? {
//!         for artifact in client.artifacts(&build.url).await? {
//!             println!("{} -> {}", artifact.relative_path, artifact.url);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod builds;
mod download;
pub mod error;
mod jobs;

// Re-export commonly used types
pub use builds::artifact_url;
pub use error::{ClientError, ErrorClass, Result};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`JenkinsClient`]
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// User for HTTP basic auth
    pub username: Option<String>,
    /// Password or API token for HTTP basic auth
    pub password: Option<String>,
    /// Skip TLS certificate validation (self-signed internal servers)
    pub accept_invalid_certs: bool,
    /// Overall per-request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: Option<String>,
}

/// HTTP client for a Jenkins server
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    /// Base URL of the server (e.g., "https://ci.example.com/jenkins")
    base_url: String,
    /// HTTP client instance
    client: Client,
    credentials: Option<Credentials>,
}

impl JenkinsClient {
    /// Create a new Jenkins client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the Jenkins server
    /// * `options` - Authentication and transport settings
    pub fn new(base_url: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let mut builder = Client::builder().danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ClientError::ClientBuild)?;

        let mut jenkins = Self::with_client(base_url, client);
        if let Some(username) = options.username.filter(|u| !u.is_empty()) {
            jenkins.credentials = Some(Credentials {
                username,
                password: options.password,
            });
        }
        Ok(jenkins)
    }

    /// Create a new client around a preconfigured reqwest Client, without auth
    ///
    /// # Example
    /// ```
    /// use jenkronize_client::JenkinsClient;
    /// use reqwest::Client;
    ///
    /// let client = JenkinsClient::with_client("https://ci.example.com/", Client::new());
    /// assert_eq!(client.base_url(), "https://ci.example.com");
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials: None,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turns a job path or an absolute URL into an absolute URL without trailing slash
    ///
    /// Job paths like `/job/app/job/main/` are resolved against the base URL.
    pub fn resolve_url(&self, path_or_url: &str) -> String {
        let trimmed = path_or_url.trim().trim_end_matches('/');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return trimmed.to_string();
        }
        let path = trimmed.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Starts a GET request with credentials attached
    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, creds.password.as_deref()),
            None => request,
        }
    }

    /// Reads `<path>/api/json`, restricted to the fields named in `tree`
    async fn get_json<T: DeserializeOwned>(&self, path: &str, tree: &str) -> Result<T> {
        let url = format!("{}/api/json", self.resolve_url(path));
        debug!("GET {}", url);

        let response = self
            .get(&url)
            .query(&[("tree", tree)])
            .send()
            .await
            .map_err(|e| ClientError::request(&url, e))?;

        self.handle_response(&url, response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Non-success statuses become [`ClientError::ApiError`]; bodies that do not
    /// deserialize become [`ClientError::Protocol`].
    async fn handle_response<T: DeserializeOwned>(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(url, status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::request(url, e))?;

        parse_json(url, &body)
    }
}

/// Deserializes a JSON body, describing HTML bodies explicitly
fn parse_json<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        let message = if body.trim_start().starts_with('<') {
            "received HTML instead of JSON".to_string()
        } else {
            format!("Failed to parse JSON response: {}", e)
        };
        ClientError::Protocol {
            url: url.to_string(),
            message,
        }
    })
}
