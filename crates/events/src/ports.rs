//! Port traits implemented by infrastructure crates.
//!
//! The dispatcher only ever talks to these traits. `webhook` supplies the
//! HTTP sink, `mail` the mailer, and `dispatch` a tracing-backed recorder;
//! tests supply recording fakes.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::{DispatchResult, RequestId};

/// Failure reported by a sink or mailer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The remote end answered with a non-success status.
    #[error("{status_text}")]
    Rejected {
        /// HTTP status code returned.
        status_code: u16,
        /// Status text returned, or the canonical reason phrase.
        status_text: String,
    },

    /// The request never produced a response.
    #[error("{reason}")]
    Transport {
        /// Underlying transport error message.
        reason: String,
    },

    /// The sink was not usable (missing credentials, bad URL).
    #[error("{reason}")]
    Unavailable {
        /// What is missing or invalid.
        reason: String,
    },
}

/// Response to an outbound webhook POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Reason phrase for the status.
    pub status_text: String,
}

/// Posts JSON payloads to webhook URLs.
#[async_trait]
pub trait HttpSink: Send + Sync {
    /// POSTs `body` as `application/json` to `url` and returns the response
    /// status, whatever it is.
    ///
    /// # Errors
    ///
    /// [`SinkError::Transport`] if no response was received.
    async fn post(&self, url: &str, body: &Value) -> Result<SinkResponse, SinkError>;
}

/// Sends HTML email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends `html` to `to` with `subject` and returns the provider's status
    /// code on success.
    ///
    /// # Errors
    ///
    /// Any [`SinkError`] describing why the message was not accepted.
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<u16, SinkError>;
}

/// Receives settlements that no caller is waiting for.
pub trait OutcomeRecorder: Send + Sync {
    /// Records one settlement produced while handling `request_id`.
    fn record(&self, request_id: RequestId, result: &DispatchResult);
}
