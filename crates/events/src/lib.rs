//! Domain core for cmnotify, the Cloud Manager pipeline notifier.
//!
//! This crate turns an inbound webhook delivery into canonical pipeline events
//! and renders them for each notification channel. It verifies signatures,
//! classifies and enriches events, and formats messages; it never performs
//! I/O. Sending is expressed through the port traits in [`ports`].
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** Infrastructure crates (`webhook`,
//! `mail`) implement the ports; `dispatch` wires them together.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RequestId`, `WebhookUrl`, `PipelineId`, etc.) |
//! | [`types`] | Vendor envelope, canonical event, channels, settlements |
//! | [`errors`] | `NotifyError`, `ValidationFailure`, `ChannelError` |
//! | [`config`] | `NotifyConfig`, the runtime configuration value |
//! | [`request`] | `IncomingRequest` and its headers and body |
//! | [`timezone`] | Display zones and UTC conversion |
//! | [`verify`] | `SignatureVerifier` (HMAC or RSA) |
//! | [`normalize`] | `EventNormalizer` and the event-kind registry |
//! | [`format`] | `format` and the per-channel renderings |
//! | [`ports`] | `HttpSink`, `Mailer`, `OutcomeRecorder` |

pub mod config;
pub mod errors;
pub mod format;
pub mod identifiers;
pub mod normalize;
pub mod ports;
pub mod request;
pub mod timezone;
pub mod types;
pub mod verify;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{NotifyConfig, DEFAULT_CHANNEL_TIMEOUT, DEFAULT_SIGNATURE_HEADER, DEFAULT_TITLE};
pub use errors::{ChannelError, NotifyError, ValidationFailure};
pub use format::{format, status_color, FormattedMessage};
pub use identifiers::{
    ClientId, EmailAddress, OrganizationName, PipelineId, RequestId, WebhookUrl,
};
pub use normalize::{EventNormalizer, ExecutionPath};
pub use ports::{HttpSink, Mailer, OutcomeRecorder, SinkError, SinkResponse};
pub use request::{Headers, IncomingRequest, RequestBody};
pub use timezone::{convert_utc, convert_with_offset, DisplayZone};
pub use types::{
    Channel, DispatchReport, DispatchResult, EventObject, MessengerConfig, PipelineCatalog,
    PipelineEventDetail, PipelineRecord, PipelineStatus, RawEvent, SettlementOutcome, Timestamp,
};
pub use verify::{verify_request, SignatureVerifier, VerificationMode};
