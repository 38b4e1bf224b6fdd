//! Sink used when no gateway is configured: records the delivery in tracing

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::NotificationEnvelope;
use crate::ports::NotificationSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, envelope: &NotificationEnvelope) -> Result<()> {
        let config = &envelope.notification_config;
        tracing::info!(
            provider = %config.provider,
            from = %config.from_number,
            recipients = config.recipients.len(),
            mode = %envelope.mode,
            "No gateway configured, notification logged only"
        );
        tracing::debug!(text = %envelope.text, "Notification text");
        Ok(())
    }
}
