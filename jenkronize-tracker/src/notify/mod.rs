//! Operator notifications
//!
//! Notifiers deliver human-readable messages about tracker activity. Any
//! number of them can be registered; every message goes to all of them and
//! a failing notifier never affects the operation that triggered it.

mod slack;

pub use slack::SlackNotifier;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors a notifier can report
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Notifier is missing required settings
    #[error("Notifier is not configured: {0}")]
    NotConfigured(String),

    /// HTTP request failed
    #[error("Notification request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Remote service rejected the message
    #[error("Notification rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// A channel for operator-facing messages
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Delivers one message
    async fn post(&self, message: &str) -> Result<(), NotifyError>;
}

/// The set of registered notifiers
#[derive(Clone, Default)]
pub struct Notifiers {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Posts `message` to every notifier, logging individual failures
    ///
    /// # Returns
    /// The number of notifiers that failed
    pub async fn broadcast(&self, message: &str) -> usize {
        let mut failed = 0;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.post(message).await {
                warn!("Notifier {} failed: {}", notifier.name(), e);
                failed += 1;
            }
        }
        failed
    }
}
