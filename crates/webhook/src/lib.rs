//! Outbound webhook delivery for cmnotify.
//!
//! [`ReqwestSink`] implements [`events::HttpSink`] over a shared
//! `reqwest::Client`. It reports whatever status the remote end returns; the
//! dispatcher decides what counts as delivered.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** No domain rules live here.

use std::time::Duration;

use async_trait::async_trait;
use events::{HttpSink, SinkError, SinkResponse};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors raised while building the sink.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`HttpSink`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestSink {
    client: reqwest::Client,
}

impl ReqwestSink {
    /// Creates a sink whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`WebhookError::Client`] if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cmnotify/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSink for ReqwestSink {
    #[instrument(skip(self, body), fields(url = %url))]
    async fn post(&self, url: &str, body: &Value) -> Result<SinkResponse, SinkError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Webhook request failed");
                SinkError::Transport {
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        debug!(status = status.as_u16(), "Webhook responded");
        Ok(SinkResponse {
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
        })
    }
}
