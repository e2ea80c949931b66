use super::NotificationSink;
use crate::error::NotifyError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Posts notifications as JSON to an HTTP endpoint
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout_seconds: u64) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1)))
            .build()?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "subject": subject,
            "body": body,
            "sent_at": Utc::now().to_rfc3339(),
        });

        let res = self.client.post(&self.url).json(&payload).send().await?;
        let status = res.status();
        if !status.is_success() {
            warn!("Webhook {} returned {}", self.url, status);
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }

        debug!("Webhook notification delivered: {}", subject);
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
