//! Slack incoming-webhook notifier

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Notifier, NotifyError};

/// Posts messages to a Slack incoming webhook
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Client,
    webhook: String,
    channel: Option<String>,
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
}

impl SlackNotifier {
    pub fn new(webhook: impl Into<String>, channel: Option<String>) -> Self {
        Self {
            client: Client::new(),
            webhook: webhook.into(),
            channel: channel.filter(|c| !c.is_empty()),
        }
    }

    fn payload<'a>(&'a self, message: &'a str) -> SlackMessage<'a> {
        SlackMessage {
            text: message,
            channel: self.channel.as_deref(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn post(&self, message: &str) -> Result<(), NotifyError> {
        if self.webhook.is_empty() {
            return Err(NotifyError::NotConfigured(
                "no Slack webhook specified".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.webhook)
            .json(&self.payload(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
