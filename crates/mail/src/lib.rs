//! Email channel for cmnotify.
//!
//! [`GmailMailer`] implements [`events::Mailer`] by posting raw messages to
//! the Gmail API. Authentication goes through a [`CredentialManager`], which
//! reads `google-credentials.json` and `google-token.json` from the data
//! directory and refreshes the token when needed.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.**

use std::path::PathBuf;

use thiserror::Error;

pub mod credentials;
pub mod gmail;

pub use credentials::{CredentialManager, OAuthCredentials, StoredToken};
pub use gmail::{encode_raw_message, GmailMailer, GMAIL_SEND_URL};

/// Errors raised by the credential store and OAuth endpoints.
#[derive(Debug, Error)]
pub enum MailError {
    /// A required credential file does not exist.
    #[error("file not found: {path}")]
    MissingFile {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// A credential file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A credential file is not the expected JSON shape.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// File being decoded.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The OAuth client registration lists no redirect URI.
    #[error("credentials list no redirect URI")]
    NoRedirectUri,

    /// An endpoint URL from the client registration does not parse.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The access token expired and cannot be refreshed.
    #[error("token has expired and no refresh token is stored; authorize again")]
    NoRefreshToken,

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnosis.
        body: String,
    },

    /// The token request failed in transport.
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
}
