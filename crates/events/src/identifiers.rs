//! Newtype domain identifiers.
//!
//! Every configured name or address is represented as a distinct newtype
//! wrapping a `String`. This prevents accidentally interchanging, for example,
//! a [`WebhookUrl`] with an [`EmailAddress`] even though both are strings
//! under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or whitespace only.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one inbound request as it moves through verify, validate, and
/// dispatch.
///
/// Generated fresh for every [`crate::IncomingRequest`] handled by the
/// orchestrator; recorded on spans and settlement events so all activity for
/// a single webhook delivery can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (configuration / vendor data)
// ---------------------------------------------------------------------------

string_id! {
    /// The organization name used in the public console URL
    /// (`https://experience.adobe.com/#/@{org}/...`).
    OrganizationName
}

string_id! {
    /// The integration client id that inbound batches must be addressed to.
    ///
    /// Compared against the batch's `recipient_client_id`.
    ClientId
}

string_id! {
    /// Identifies a pipeline in the pipeline dataset.
    ///
    /// Derived from segment 3 of the API path of an event's object id
    /// (`program/{p}/pipeline/{id}/execution/{e}`).
    PipelineId
}

string_id! {
    /// An outbound chat or card webhook URL.
    WebhookUrl
}

string_id! {
    /// An email address (notification recipient or sender).
    EmailAddress
}
