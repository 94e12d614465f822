//! Error types for the Jenkins client

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Jenkins client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached (DNS failure, refused connection)
    #[error("Cannot reach {url}: {message}")]
    Connectivity { url: String, message: String },

    /// HTTP request failed for any other reason
    #[error("Request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// API returned an error status code
    #[error("API error (status {status}) from {url}: {message}")]
    ApiError {
        url: String,
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("Unexpected response from {url}: {message}")]
    Protocol { url: String, message: String },

    /// An artifact path or URL could not be resolved
    #[error("Invalid artifact location: {0}")]
    InvalidArtifact(String),

    /// Local filesystem failure while writing a download
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The underlying HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Coarse failure classes the tracker reacts to differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Host unreachable or name resolution failure
    Connectivity,
    /// Malformed or unexpected response, usually transient
    Protocol,
    /// Everything else
    Transport,
}

impl ClientError {
    /// Wraps a reqwest error, separating connection failures from the rest
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_connect() {
            Self::Connectivity {
                url,
                message: error_chain(&source),
            }
        } else if source.is_decode() {
            Self::Protocol {
                url,
                message: source.to_string(),
            }
        } else {
            Self::RequestFailed { url, source }
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Connectivity { .. } => ErrorClass::Connectivity,
            Self::Protocol { .. } => ErrorClass::Protocol,
            _ => ErrorClass::Transport,
        }
    }

    /// Check if this error was caused by the local disk running out of space
    pub fn is_disk_full(&self) -> bool {
        if let Self::Io { source, .. } = self {
            if source.kind() == std::io::ErrorKind::StorageFull {
                return true;
            }
        }
        self.to_string()
            .to_lowercase()
            .contains("no space left on device")
    }
}

/// Formats an error with all of its sources, which is where reqwest keeps
/// the DNS or socket level reason
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
