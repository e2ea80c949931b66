mod email;
mod logger;
mod mock;
mod webhook;

use crate::config::{NotifyConfig, NotifyKind};
use crate::error::{BowlwatchError, NotifyError, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub use email::EmailNotifier;
pub use logger::LogNotifier;
pub use mock::{Notification, RecordingNotifier};
pub use webhook::WebhookNotifier;

/// Channel delivering alerts to the pet owner
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> std::result::Result<(), NotifyError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Build the configured notification sink
pub fn build_notifier(config: &NotifyConfig) -> Result<Arc<dyn NotificationSink>> {
    match config.kind {
        NotifyKind::Log => Ok(Arc::new(LogNotifier::new())),
        NotifyKind::Webhook => {
            let url = config
                .webhook_url
                .clone()
                .filter(|url| !url.is_empty())
                .ok_or_else(|| {
                    BowlwatchError::component("notify", "webhook_url is not configured")
                })?;
            Ok(Arc::new(WebhookNotifier::new(url, config.timeout_seconds)?))
        }
        NotifyKind::Email => Ok(Arc::new(EmailNotifier::from_config(config)?)),
    }
}
