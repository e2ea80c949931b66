use super::NotificationSink;
use crate::error::NotifyError;
use async_trait::async_trait;
use tracing::info;

/// Writes notifications to the log; stands in for a push channel
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!(target: "bowlwatch::notification", subject, body, "Notification");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
