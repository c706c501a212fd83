//! [`events::Mailer`] over the Gmail REST API.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use events::{EmailAddress, Mailer, SinkError};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::CredentialManager;

/// Gmail endpoint that sends a raw RFC 822 message.
pub const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

/// Builds the raw message Gmail expects: RFC 822 headers and an HTML body,
/// CRLF line endings, URL-safe base64 with padding.
pub fn encode_raw_message(from: &str, to: &str, subject: &str, html: &str) -> String {
    let message = format!(
        "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n{html}"
    );
    URL_SAFE.encode(message)
}

/// Sends HTML mail as the configured sender.
#[derive(Debug, Clone)]
pub struct GmailMailer {
    http: reqwest::Client,
    credentials: Arc<CredentialManager>,
    from: EmailAddress,
    send_url: String,
}

impl GmailMailer {
    /// Creates a mailer that authenticates through `credentials`.
    pub fn new(
        http: reqwest::Client,
        credentials: Arc<CredentialManager>,
        from: EmailAddress,
    ) -> Self {
        Self {
            http,
            credentials,
            from,
            send_url: GMAIL_SEND_URL.to_string(),
        }
    }

    /// Overrides the send endpoint.
    pub fn with_send_url(mut self, url: impl Into<String>) -> Self {
        self.send_url = url.into();
        self
    }
}

#[async_trait]
impl Mailer for GmailMailer {
    #[instrument(skip(self, html), fields(to = %to))]
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<u16, SinkError> {
        let access_token = self.credentials.access_token().await.map_err(|e| {
            warn!(error = %e, "No usable Gmail access token");
            SinkError::Unavailable {
                reason: e.to_string(),
            }
        })?;

        let raw = encode_raw_message(self.from.as_str(), to, subject, html);
        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| SinkError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 200 {
            info!("Email sent");
            Ok(200)
        } else {
            Err(SinkError::Rejected {
                status_code: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            })
        }
    }
}
