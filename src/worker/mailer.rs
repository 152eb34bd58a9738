use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::config::MailConfig;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail provider rejected message with {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

pub fn from_config(config: &MailConfig, http: reqwest::Client) -> Arc<dyn Mailer> {
    match config {
        MailConfig::Log { from } => Arc::new(LogMailer::new(from.clone())),
        MailConfig::SendGrid { api_key, from } => {
            Arc::new(SendGridMailer::new(http, api_key.clone(), from.clone()))
        }
    }
}

/// Writes messages to the log instead of sending them.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let preview: String = email.body.chars().take(80).collect();
        tracing::info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            preview = %preview,
            "email sent (log mailer)"
        );
        Ok(())
    }
}

pub struct SendGridMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(http: reqwest::Client, api_key: String, from: String) -> Self {
        Self { http, api_key, from }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.from },
            "subject": email.subject,
            "content": [{ "type": "text/plain", "value": email.body }],
        });

        let response = self
            .http
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %email.to, subject = %email.subject, "email accepted by sendgrid");
        Ok(())
    }
}
