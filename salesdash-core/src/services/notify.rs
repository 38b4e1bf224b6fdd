//! Notification service - hands reports to a delivery sink
//!
//! Delivery failures never fail the operation that produced the report;
//! they come back as a [`NotificationStatus`].

use std::sync::Arc;

use crate::adapters::log_sink::LogSink;
use crate::adapters::webhook::WebhookSink;
use crate::domain::result::{Error, Result};
use crate::domain::{NotificationConfig, NotificationEnvelope, NotificationStatus, Report};
use crate::ports::NotificationSink;
use crate::services::logging::{events, LogEvent, LoggingService};

pub struct NotificationService {
    sink: Arc<dyn NotificationSink>,
    defaults: Option<NotificationConfig>,
    event_log: Option<Arc<LoggingService>>,
}

impl NotificationService {
    pub fn new(sink: Arc<dyn NotificationSink>, defaults: Option<NotificationConfig>) -> Self {
        Self {
            sink,
            defaults,
            event_log: None,
        }
    }

    /// Gateway sink when a URL is configured, log-only otherwise
    pub fn from_settings(
        gateway_url: Option<&str>,
        defaults: Option<NotificationConfig>,
    ) -> Result<Self> {
        let sink: Arc<dyn NotificationSink> = match gateway_url {
            Some(url) => Arc::new(WebhookSink::new(url)?),
            None => Arc::new(LogSink),
        };
        Ok(Self::new(sink, defaults))
    }

    pub fn with_event_log(mut self, event_log: Arc<LoggingService>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub fn defaults(&self) -> Option<&NotificationConfig> {
        self.defaults.as_ref()
    }

    /// Validate and deliver; errors are returned to the caller
    pub async fn send(
        &self,
        report: &Report,
        config: Option<&NotificationConfig>,
    ) -> Result<NotificationStatus> {
        let result = self.deliver(report, config).await;
        match &result {
            Ok(_) => {
                self.record(LogEvent::new(events::NOTIFICATION_SENT).with_command(self.sink.name()));
            }
            Err(e) => {
                tracing::warn!(sink = self.sink.name(), error = %e, "Notification failed");
                self.record(
                    LogEvent::new(events::NOTIFICATION_FAILED)
                        .with_command(self.sink.name())
                        .with_error(e.to_string()),
                );
            }
        }
        result
    }

    /// Deliver and report the outcome instead of failing
    pub async fn notify(
        &self,
        report: &Report,
        config: Option<&NotificationConfig>,
    ) -> NotificationStatus {
        match self.send(report, config).await {
            Ok(status) => status,
            Err(e) => NotificationStatus::failed(config.or(self.defaults.as_ref()), e.to_string()),
        }
    }

    async fn deliver(
        &self,
        report: &Report,
        config: Option<&NotificationConfig>,
    ) -> Result<NotificationStatus> {
        let config = config
            .or(self.defaults.as_ref())
            .ok_or_else(|| Error::validation("No notification settings provided"))?;
        config.validate()?;

        let envelope = NotificationEnvelope::new(report.clone(), config.clone());
        self.sink.deliver(&envelope).await?;
        Ok(NotificationStatus::sent(config))
    }

    fn record(&self, event: LogEvent) {
        if let Some(log) = &self.event_log {
            log.record(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::domain::{AggregateOutput, ReportMode, ReportOptions, SmsProvider};

    #[derive(Default)]
    struct RecordingSink {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn deliver(&self, envelope: &NotificationEnvelope) -> Result<()> {
            self.texts.lock().unwrap().push(envelope.text.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn deliver(&self, _envelope: &NotificationEnvelope) -> Result<()> {
            Err(Error::notification("gateway down"))
        }
    }

    fn report() -> Report {
        let output = AggregateOutput::new(NaiveDate::from_ymd_opt(2025, 5, 17).unwrap(), &[], None);
        crate::domain::assemble(&output, &ReportMode::Totals, &ReportOptions::default())
    }

    fn config() -> NotificationConfig {
        NotificationConfig {
            provider: SmsProvider::Clickatell,
            api_key: "key".to_string(),
            from_number: "+27000000000".to_string(),
            recipients: vec!["+27111111111".to_string(), "+27222222222".to_string()],
        }
    }

    #[tokio::test]
    async fn test_delivers_with_explicit_config() {
        let sink = Arc::new(RecordingSink::default());
        let service = NotificationService::new(sink.clone(), None);

        let status = service.notify(&report(), Some(&config())).await;
        assert!(status.sent);
        assert_eq!(status.recipients, 2);
        assert_eq!(sink.texts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_defaults() {
        let sink = Arc::new(RecordingSink::default());
        let service = NotificationService::new(sink.clone(), Some(config()));

        let status = service.send(&report(), None).await.unwrap();
        assert!(status.sent);
        assert_eq!(status.recipients, 2);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_into_status() {
        let service = NotificationService::new(Arc::new(FailingSink), None);

        let status = service.notify(&report(), Some(&config())).await;
        assert!(!status.sent);
        assert_eq!(status.provider, Some(SmsProvider::Clickatell));
        assert!(status.error.unwrap().contains("gateway down"));
    }

    #[tokio::test]
    async fn test_invalid_config_never_reaches_sink() {
        let sink = Arc::new(RecordingSink::default());
        let service = NotificationService::new(sink.clone(), None);
        let mut bad = config();
        bad.recipients.clear();

        let status = service.notify(&report(), Some(&bad)).await;
        assert!(!status.sent);
        assert!(sink.texts.lock().unwrap().is_empty());

        let missing = service.notify(&report(), None).await;
        assert!(!missing.sent);
        assert_eq!(missing.provider, None);
    }

    #[tokio::test]
    async fn test_failures_reach_event_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(
            LoggingService::new(dir.path(), crate::services::EntryPoint::Server, "test").unwrap(),
        );
        let service = NotificationService::new(Arc::new(FailingSink), None).with_event_log(log.clone());

        service.notify(&report(), Some(&config())).await;
        let errors = log.get_errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, events::NOTIFICATION_FAILED);
    }
}
