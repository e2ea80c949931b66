use super::NotificationSink;
use crate::config::NotifyConfig;
use crate::error::{BowlwatchError, NotifyError, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Sends each notification as a plain-text email through an SMTP relay
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
    sender: Mailbox,
    receiver: Mailbox,
}

impl EmailNotifier {
    /// Build from the `notify` section. The relay is upgraded with STARTTLS
    /// and, when a password is set, logged into as the sender address.
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        let server = required(&config.smtp_server, "smtp_server")?;
        let sender = parse_mailbox(&required(&config.sender_email, "sender_email")?)?;
        let receiver = parse_mailbox(&required(&config.receiver_email, "receiver_email")?)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&server)
            .map_err(NotifyError::from)?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds.max(1))));

        match config.sender_password.as_deref() {
            Some(password) if !password.is_empty() => {
                builder = builder.credentials(Credentials::new(
                    sender.email.to_string(),
                    password.to_string(),
                ));
            }
            _ => warn!("No SMTP password configured, sending to {} unauthenticated", server),
        }

        Ok(Self {
            transport: builder.build(),
            server,
            sender,
            receiver,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Plain-text message from the sender to the receiver
    pub fn build_message(
        &self,
        subject: &str,
        body: &str,
    ) -> std::result::Result<Message, NotifyError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(self.receiver.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        Ok(message)
    }
}

#[async_trait]
impl NotificationSink for EmailNotifier {
    async fn notify(&self, subject: &str, body: &str) -> std::result::Result<(), NotifyError> {
        let message = self.build_message(subject, body)?;
        self.transport.send(message).await?;

        debug!("Email sent to {} via {}", self.receiver, self.server);
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BowlwatchError::component("notify", format!("{} is not configured", field)))
}

fn parse_mailbox(address: &str) -> std::result::Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}
