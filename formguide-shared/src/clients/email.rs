use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email API returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound transactional email. One attempt per call, no retry.
#[axum::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError>;
}

/// Resend HTTP API client.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl EmailClient {
    pub fn new(api_url: &str, api_key: &str, from_email: &str, from_name: &str) -> Result<Self, EmailError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        })
    }
}

#[axum::async_trait]
impl EmailSender for EmailClient {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: [to],
            subject,
            html,
        };

        let response = self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status, body });
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}
