//! Outbound mail transports.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn deliver(&self, email: &Email) -> Result<(), MailError>;
}

/// Publishes mail jobs as JSON on a NATS subject for the SMTP relay.
#[derive(Clone, Debug)]
pub struct NatsMailer {
    client: async_nats::Client,
    subject: String,
}

impl NatsMailer {
    pub fn new(client: async_nats::Client, subject: impl Into<String>) -> Self {
        Self { client, subject: subject.into() }
    }
}

#[async_trait]
impl Mailer for NatsMailer {
    async fn deliver(&self, email: &Email) -> Result<(), MailError> {
        let payload = serde_json::to_vec(email)?;
        self.client.publish(self.subject.clone(), payload.into()).await.map_err(|e| MailError::Transport(e.to_string()))?;
        self.client.flush().await.map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Writes mail to the log; used when no relay is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, email: &Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "Email (no relay configured)");
        Ok(())
    }
}
