//! Error types for the cmnotify domain.
//!
//! [`NotifyError`] covers conditions that are fatal to one inbound request:
//! once any of them is produced, nothing downstream runs. Failures of a single
//! outbound channel are not errors of the request; they are reported as
//! [`ChannelError`] values inside a settlement (see
//! [`crate::DispatchResult`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Channel;

// ---------------------------------------------------------------------------
// Request-level errors
// ---------------------------------------------------------------------------

/// Errors that abort processing of an inbound request.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyError {
    /// The request signature is missing or does not verify, or no key
    /// material was available to verify it.
    #[error("Invalid signature")]
    Authentication,

    /// The request body is not valid (optionally base64-encoded) JSON.
    #[error("Invalid request body: {reason}")]
    Parse {
        /// Why the body could not be decoded.
        reason: String,
    },

    /// The runtime configuration cannot serve the request (no channel
    /// destinations, unsupported timezone code, malformed offset).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The batch was decoded but did not yield any canonical events.
    #[error("{0}")]
    Validation(ValidationFailure),
}

impl NotifyError {
    /// Shorthand for [`NotifyError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<ValidationFailure> for NotifyError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation(failure)
    }
}

/// Why a batch failed validation.
///
/// "No events" and "no valid events" are kept distinct so operators can tell
/// an empty delivery from one whose events were all unrecognized.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationFailure {
    /// The batch's `recipient_client_id` does not match the configured client id.
    #[error("Invalid client ID")]
    InvalidClientId,

    /// The batch contained no event wrappers at all.
    #[error("No events found")]
    NoEvents,

    /// Every event wrapper was discarded during classification.
    #[error("No Valid events found")]
    NoValidEvents,
}

// ---------------------------------------------------------------------------
// Channel-level errors
// ---------------------------------------------------------------------------

/// A single channel send that did not succeed.
///
/// Local to one (event, channel) pair; sibling sends are unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{channel} delivery failed: {reason}")]
pub struct ChannelError {
    /// The channel the send was addressed to.
    pub channel: Channel,
    /// Status text, transport error, or timeout description.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_match_wire_contract() {
        assert_eq!(
            NotifyError::from(ValidationFailure::InvalidClientId).to_string(),
            "Invalid client ID"
        );
        assert_eq!(ValidationFailure::NoEvents.to_string(), "No events found");
        assert_eq!(
            ValidationFailure::NoValidEvents.to_string(),
            "No Valid events found"
        );
    }

    #[test]
    fn channel_error_names_the_channel() {
        let err = ChannelError {
            channel: Channel::Chat,
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "chat delivery failed: Internal Server Error"
        );
    }
}
