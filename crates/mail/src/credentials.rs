//! OAuth 2.0 client credentials and the cached access token.
//!
//! [`CredentialManager`] is the only owner of the token file. Loading, the
//! expiry check, the refresh call, and the file rewrite all happen while its
//! mutex is held, so concurrent sends never race a refresh.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use events::EmailAddress;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::MailError;

/// File holding the OAuth client registration.
pub const CREDENTIALS_FILENAME: &str = "google-credentials.json";

/// File holding the current token.
pub const TOKEN_FILENAME: &str = "google-token.json";

/// Scope requested for sending mail.
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

/// Tokens expiring within this window are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// File formats
// ---------------------------------------------------------------------------

/// Contents of [`CREDENTIALS_FILENAME`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    /// Installed-application client registration.
    pub installed: InstalledApp,
}

/// An installed-application OAuth client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret. Redacted from `Debug` output.
    pub client_secret: String,
    /// Consent screen endpoint.
    pub auth_uri: String,
    /// Token exchange and refresh endpoint.
    pub token_uri: String,
    /// Registered redirect URIs; the first one is used.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl std::fmt::Debug for InstalledApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstalledApp")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .field("redirect_uris", &self.redirect_uris)
            .finish()
    }
}

/// Contents of [`TOKEN_FILENAME`].
///
/// Unknown fields are carried through a rewrite untouched.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Bearer token for the Gmail API.
    pub access_token: String,
    /// Long-lived token used to obtain a new access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token type reported by the endpoint, normally `Bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// When the access token stops being valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Any other fields from the token file.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredToken {
    /// `true` if the token expires within the refresh margin of `now`.
    /// A token without an expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now + Duration::seconds(EXPIRY_MARGIN_SECS))
    }
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response body.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            token_type: self.token_type,
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            extra: self.extra,
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialManager
// ---------------------------------------------------------------------------

/// Owns the OAuth client registration and the token file.
#[derive(Debug)]
pub struct CredentialManager {
    http: reqwest::Client,
    app: InstalledApp,
    redirect_uri: String,
    login_hint: EmailAddress,
    token_path: PathBuf,
    token: Mutex<Option<StoredToken>>,
}

impl CredentialManager {
    /// Reads [`CREDENTIALS_FILENAME`] from `data_dir`. The token file is read
    /// lazily on first use.
    ///
    /// # Errors
    ///
    /// [`MailError::MissingFile`], [`MailError::Io`], or [`MailError::Json`]
    /// for an unreadable credentials file; [`MailError::NoRedirectUri`] if
    /// it lists no redirect URI.
    pub async fn load(
        data_dir: &Path,
        login_hint: EmailAddress,
        http: reqwest::Client,
    ) -> Result<Self, MailError> {
        let credentials: OAuthCredentials =
            read_json(&data_dir.join(CREDENTIALS_FILENAME)).await?;
        let redirect_uri = credentials
            .installed
            .redirect_uris
            .first()
            .cloned()
            .ok_or(MailError::NoRedirectUri)?;
        Ok(Self {
            http,
            app: credentials.installed,
            redirect_uri,
            login_hint,
            token_path: data_dir.join(TOKEN_FILENAME),
            token: Mutex::new(None),
        })
    }

    /// URL the account owner opens to grant send access.
    ///
    /// # Errors
    ///
    /// [`MailError::InvalidUrl`] if the registered `auth_uri` is not a URL.
    pub fn authorize_url(&self, state: &str) -> Result<String, MailError> {
        let url = reqwest::Url::parse_with_params(
            &self.app.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.app.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", GMAIL_SEND_SCOPE),
                ("state", state),
                ("access_type", "offline"),
                ("login_hint", self.login_hint.as_str()),
            ],
        )
        .map_err(|e| MailError::InvalidUrl {
            url: self.app.auth_uri.clone(),
            reason: e.to_string(),
        })?;
        Ok(url.into())
    }

    /// Trades an authorization code for a token and stores it.
    ///
    /// # Errors
    ///
    /// Any [`MailError`] from the token endpoint or the file write.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken, MailError> {
        let mut cached = self.token.lock().await;
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.app.client_id.as_str()),
                ("client_secret", self.app.client_secret.as_str()),
                ("scope", GMAIL_SEND_SCOPE),
            ])
            .await?;
        let token = response.into_token(Utc::now(), None);
        write_token(&self.token_path, &token).await?;
        info!(path = %self.token_path.display(), "Token saved");
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Returns a usable access token, refreshing and persisting it first if it
    /// is about to expire.
    ///
    /// # Errors
    ///
    /// [`MailError::MissingFile`] if no token has been stored yet,
    /// [`MailError::NoRefreshToken`] if an expired token cannot be refreshed,
    /// or any error from the token endpoint or file write.
    pub async fn access_token(&self) -> Result<String, MailError> {
        let mut cached = self.token.lock().await;
        let token = match cached.take() {
            Some(token) => token,
            None => read_json::<StoredToken>(&self.token_path).await?,
        };

        let token = if token.is_expired(Utc::now()) {
            info!("Access token expired; refreshing");
            let refreshed = self.refresh(&token).await?;
            write_token(&self.token_path, &refreshed).await?;
            refreshed
        } else {
            token
        };

        let access_token = token.access_token.clone();
        *cached = Some(token);
        debug!(token_len = access_token.len(), "Access token ready");
        Ok(access_token)
    }

    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken, MailError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(MailError::NoRefreshToken)?;
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.app.client_id.as_str()),
                ("client_secret", self.app.client_secret.as_str()),
            ])
            .await?;
        Ok(response.into_token(Utc::now(), token.refresh_token.clone()))
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, MailError> {
        let response = self.http.post(&self.app.token_uri).form(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token endpoint rejected the request");
            return Err(MailError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>().await?)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, MailError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MailError::MissingFile {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(MailError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes).map_err(|source| MailError::Json {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_token(path: &Path, token: &StoredToken) -> Result<(), MailError> {
    let json = serde_json::to_string_pretty(token).map_err(|source| MailError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| MailError::Io {
            path: path.to_path_buf(),
            source,
        })
}
