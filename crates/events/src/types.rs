//! Shared value types for the cmnotify domain.
//!
//! Vendor-facing types ([`RawEvent`], [`PipelineRecord`]) keep the field names
//! of the wire format through serde renames; canonical types
//! ([`PipelineEventDetail`], [`DispatchResult`]) are what the rest of the
//! workspace passes around.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChannelError, EmailAddress, PipelineId, WebhookUrl};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parses an RFC 3339 timestamp (e.g. `2026-10-18T12:00:00.000Z`).
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Vendor envelope
// ---------------------------------------------------------------------------

/// The object an event refers to. Only the resource URL is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventObject {
    /// API URL of the pipeline execution (or execution step).
    #[serde(rename = "@id")]
    pub id: String,
}

/// A pipeline event exactly as the control plane delivers it.
///
/// Fields not listed here are ignored during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event kind URI (`.../event/started` etc.).
    #[serde(rename = "@type")]
    pub event_type: String,

    /// Object kind URI (`.../pipeline-execution` or `.../execution-step-state`).
    #[serde(rename = "xdmEventEnvelope:objectType")]
    pub object_type: String,

    /// The resource the event is about.
    #[serde(rename = "activitystreams:object")]
    pub object: EventObject,

    /// When the control plane published the event.
    #[serde(rename = "activitystreams:published")]
    pub published: Timestamp,
}

// ---------------------------------------------------------------------------
// Pipeline dataset
// ---------------------------------------------------------------------------

/// One entry of the externally supplied pipeline dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRecord {
    /// Pipeline id, matched against the id derived from an event URL.
    pub id: PipelineId,
    /// Human-readable pipeline name.
    #[serde(default)]
    pub name: Option<String>,
    /// Build target (e.g. `DEV`, `PROD`).
    #[serde(default)]
    pub build_target: Option<String>,
    /// Pipeline type (e.g. `CI_CD`).
    #[serde(default, rename = "type")]
    pub pipeline_type: Option<String>,
}

/// Read-only snapshot of the pipeline dataset.
///
/// Loaded once by the composition root and shared between requests; never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineCatalog {
    records: Vec<PipelineRecord>,
}

impl PipelineCatalog {
    /// Creates a catalog from already-decoded records.
    pub fn new(records: Vec<PipelineRecord>) -> Self {
        Self { records }
    }

    /// Decodes a catalog from the JSON array form of the dataset.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns the first record whose id equals `id`.
    pub fn find(&self, id: &PipelineId) -> Option<&PipelineRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    /// Number of records in the snapshot.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Canonical event
// ---------------------------------------------------------------------------

/// Lifecycle status of a canonical pipeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// A pipeline execution started.
    Started,
    /// A pipeline execution ended.
    Ended,
    /// An execution step is waiting (e.g. for approval).
    Waiting,
    /// A status string this build does not recognize.
    ///
    /// Never produced by the normalizer; only reachable when a detail is
    /// deserialized from an external source.
    #[serde(other)]
    Unknown,
}

impl PipelineStatus {
    /// Returns the lowercase wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Ended => "ended",
            Self::Waiting => "waiting",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized, enriched pipeline event ready for formatting.
///
/// `name`, `target` and `pipeline_type` are absent (and omitted from JSON)
/// when the pipeline was not found in the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEventDetail {
    /// Which registered kind the event matched.
    pub status: PipelineStatus,
    /// Publication time rendered in the configured display zone.
    pub date: String,
    /// Public console URL of the execution.
    pub url: String,
    /// API path of the execution, used as the link text.
    pub url_text: String,
    /// Pipeline name from the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Build target from the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Pipeline type from the dataset.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub pipeline_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// One notification destination kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Slack-style chat webhook.
    Chat,
    /// Teams-style MessageCard webhook.
    Card,
    /// Email to a channel address.
    Email,
}

impl Channel {
    /// Returns the lowercase name used in logs and settlement payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Card => "card",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which channel destinations are configured.
///
/// Immutable for the lifetime of a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessengerConfig {
    /// Chat webhook URL.
    pub chat_webhook: Option<WebhookUrl>,
    /// Card webhook URL.
    pub card_webhook: Option<WebhookUrl>,
    /// Recipient address for email notifications.
    pub email_recipient: Option<EmailAddress>,
}

impl MessengerConfig {
    /// Returns `true` if no destination is configured.
    pub fn is_empty(&self) -> bool {
        self.chat_webhook.is_none() && self.card_webhook.is_none() && self.email_recipient.is_none()
    }

    /// Configured channels in fan-out order: chat, email, card.
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = Vec::with_capacity(3);
        if self.chat_webhook.is_some() {
            channels.push(Channel::Chat);
        }
        if self.email_recipient.is_some() {
            channels.push(Channel::Email);
        }
        if self.card_webhook.is_some() {
            channels.push(Channel::Card);
        }
        channels
    }
}

// ---------------------------------------------------------------------------
// Settlements
// ---------------------------------------------------------------------------

/// How one channel invocation settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// The sink accepted the notification.
    Delivered {
        /// Status code reported by the sink.
        status_code: u16,
    },
    /// The sink rejected the notification, the transport failed, or the send
    /// timed out.
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
}

/// The settlement of one (event, channel) send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// Channel the send was addressed to.
    pub channel: Channel,
    /// Status of the event that was sent.
    pub event_status: PipelineStatus,
    /// Success or failure.
    #[serde(flatten)]
    pub outcome: SettlementOutcome,
}

impl DispatchResult {
    /// A successful settlement.
    pub fn delivered(channel: Channel, event_status: PipelineStatus, status_code: u16) -> Self {
        Self {
            channel,
            event_status,
            outcome: SettlementOutcome::Delivered { status_code },
        }
    }

    /// A failed settlement built from a channel error.
    pub fn failed(event_status: PipelineStatus, error: ChannelError) -> Self {
        Self {
            channel: error.channel,
            event_status,
            outcome: SettlementOutcome::Failed {
                reason: error.reason,
            },
        }
    }

    /// Returns `true` if the send was delivered.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SettlementOutcome::Delivered { .. })
    }

    /// Returns the failure as a [`ChannelError`], if the send failed.
    pub fn error(&self) -> Option<ChannelError> {
        match &self.outcome {
            SettlementOutcome::Delivered { .. } => None,
            SettlementOutcome::Failed { reason } => Some(ChannelError {
                channel: self.channel,
                reason: reason.clone(),
            }),
        }
    }
}

/// What a dispatch call returns to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchReport {
    /// Every send settled; one entry per attempted send.
    Settled(Vec<DispatchResult>),
    /// Sends were started and will settle in the background.
    Accepted,
}
