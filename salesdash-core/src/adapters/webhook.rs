//! HTTP gateway sink
//!
//! POSTs the notification envelope as JSON to an SMS gateway, which owns the
//! provider-specific delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::domain::result::{Error, Result};
use crate::domain::NotificationEnvelope;
use crate::ports::NotificationSink;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Delivers envelopes to a configured gateway URL
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!("Gateway URL must be http(s): {}", url)));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::notification(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::notification(format!(
                "Gateway timed out after {} seconds",
                REQUEST_TIMEOUT_SECS
            ))
        } else if error.is_connect() {
            Error::notification(format!("Unable to connect to gateway at {}", self.url))
        } else {
            Error::notification(format!("Gateway request failed: {}", error))
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, envelope: &NotificationEnvelope) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::notification(format!(
                "Gateway rejected notification: HTTP {} {}",
                status.as_u16(),
                body.trim()
            )));
        }

        tracing::info!(
            provider = %envelope.notification_config.provider,
            recipients = envelope.notification_config.recipients.len(),
            "Notification handed to gateway"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(WebhookSink::new("ftp://gateway"), Err(Error::Config(_))));
        assert!(WebhookSink::new("https://gateway.example/sms").is_ok());
    }
}
