//! Notification sink port - delivery of assembled reports

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::NotificationEnvelope;

/// Somewhere a report can be delivered to
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short name for logs ("webhook", "log")
    fn name(&self) -> &str;

    async fn deliver(&self, envelope: &NotificationEnvelope) -> Result<()>;
}
