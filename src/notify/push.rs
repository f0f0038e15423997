//! Delivery of the batched alert to a push gateway.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};

use super::AlertMessage;
use crate::core::config::NotifyConfig;
use crate::providers::util::with_retry;

/// Parsed from the `PUSH_CREDENTIALS` JSON blob.
#[derive(Debug, Clone, Deserialize)]
pub struct PushCredentials {
    pub endpoint: String,
    pub token: String,
}

impl PushCredentials {
    pub fn parse(blob: &str) -> Result<Self> {
        serde_json::from_str(blob).context("Failed to parse push credentials")
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, message: &AlertMessage) -> Result<()>;
}

/// POSTs the message as JSON with bearer auth.
pub struct WebhookNotifier {
    client: reqwest::Client,
    credentials: PushCredentials,
    max_retries: usize,
    retry_delay_ms: u64,
}

impl WebhookNotifier {
    pub fn new(
        client: reqwest::Client,
        credentials: PushCredentials,
        config: &NotifyConfig,
    ) -> Self {
        Self {
            client,
            credentials,
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(name = "Push", skip_all)]
    async fn deliver(&self, message: &AlertMessage) -> Result<()> {
        with_retry(
            || async {
                self.client
                    .post(&self.credentials.endpoint)
                    .bearer_auth(&self.credentials.token)
                    .json(message)
                    .send()
                    .await?
                    .error_for_status()
            },
            self.max_retries,
            self.retry_delay_ms,
        )
        .await
        .context("Failed to deliver rate alert")?;
        info!(lines = message.body.lines().count(), "Rate alert delivered");
        Ok(())
    }
}
