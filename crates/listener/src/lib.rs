//! Inbound HTTP listener for Cloud Manager webhook deliveries.
//!
//! Every `POST` to `/` or `/webhook` becomes a raw [`events::IncomingRequest`]
//! (headers plus body text) and is handed to [`dispatch::Notifier::post`] with
//! the options the listener was started with.
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | dispatched, not waiting | 200 | `{"accepted": true}` |
//! | dispatched, waiting | 200 | `{"results": [...]}` |
//! | `NotifyError::Authentication` | 401 | `{"error": "..."}` |
//! | `NotifyError::Parse` / `Validation` | 400 | `{"error": "..."}` |
//! | `NotifyError::Configuration` | 500 | `{"error": "..."}` |
//!
//! `GET /health` answers `ok`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport only; all decisions are made by the notifier.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dispatch::{Notifier, PostOptions};
use events::{DispatchReport, Headers, IncomingRequest, NotifyError};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Largest request body accepted.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Errors raised while running the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listen socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("listener failed: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Clone)]
struct AppState {
    notifier: Arc<Notifier>,
    options: PostOptions,
}

/// Builds the listener's router.
pub fn router(notifier: Arc<Notifier>, options: PostOptions) -> Router {
    Router::new()
        .route("/", post(receive))
        .route("/webhook", post(receive))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(AppState { notifier, options })
}

/// Binds `addr` and serves `router` until `shutdown` resolves.
///
/// # Errors
///
/// [`ListenerError::Bind`] if the address is unavailable,
/// [`ListenerError::Serve`] if the server stops with an error.
pub async fn serve(
    addr: SocketAddr,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ListenerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;
    let local = listener.local_addr().unwrap_or(addr);
    info!(addr = %local, "Listening for webhook deliveries");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ListenerError::Serve)
}

async fn health() -> &'static str {
    "ok"
}

async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = incoming_request(&headers, &body, state.options.verify)?;
    debug!(headers = request.headers.len(), body_len = body.len(), "Webhook delivery received");

    let report = state.notifier.post(request, state.options).await?;
    Ok(Json(match report {
        DispatchReport::Accepted => json!({ "accepted": true }),
        DispatchReport::Settled(results) => json!({ "results": results }),
    }))
}

/// Converts the transport request. A body that is not UTF-8 cannot carry a
/// valid signature, so with verification on it is rejected as unauthenticated
/// rather than unparseable.
fn incoming_request(
    headers: &HeaderMap,
    body: &Bytes,
    verify: bool,
) -> Result<IncomingRequest, ApiError> {
    let headers: Headers = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();
    if body.is_empty() {
        return Ok(IncomingRequest {
            headers,
            body: None,
            embedded_key: None,
        });
    }
    let text = std::str::from_utf8(body).map_err(|e| {
        if verify {
            ApiError(NotifyError::Authentication)
        } else {
            ApiError(NotifyError::Parse {
                reason: format!("body is not UTF-8: {e}"),
            })
        }
    })?;
    Ok(IncomingRequest::raw(headers, text))
}

/// A [`NotifyError`] rendered as an HTTP response.
struct ApiError(NotifyError);

impl From<NotifyError> for ApiError {
    fn from(error: NotifyError) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            NotifyError::Authentication => StatusCode::UNAUTHORIZED,
            NotifyError::Parse { .. } | NotifyError::Validation(_) => StatusCode::BAD_REQUEST,
            NotifyError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(status = status.as_u16(), error = %self.0, "Webhook delivery rejected");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
