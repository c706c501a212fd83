//! The inbound request as the core sees it.

use std::collections::BTreeMap;

use serde_json::Value;

/// HTTP headers with case-insensitive names.
///
/// Names are stored lowercased; lookups lowercase the requested name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, replacing any previous value with the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Looks up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// The two body representations a caller may hand over.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// The body exactly as received: JSON text, or base64 of JSON text.
    Raw(String),
    /// A body the caller has already decoded.
    Parsed(Value),
}

/// One inbound webhook delivery.
///
/// Created per request and dropped once processing finishes.
#[derive(Clone, PartialEq)]
pub struct IncomingRequest {
    /// Request headers.
    pub headers: Headers,
    /// Request body, if any.
    pub body: Option<RequestBody>,
    /// Key or secret carried with the request itself (used only when the
    /// process has no configured key).
    pub embedded_key: Option<String>,
}

impl IncomingRequest {
    /// A request carrying the raw body text.
    pub fn raw(headers: Headers, body: impl Into<String>) -> Self {
        Self {
            headers,
            body: Some(RequestBody::Raw(body.into())),
            embedded_key: None,
        }
    }

    /// A request carrying an already-parsed body.
    pub fn parsed(headers: Headers, body: Value) -> Self {
        Self {
            headers,
            body: Some(RequestBody::Parsed(body)),
            embedded_key: None,
        }
    }

    /// Attaches a per-request key.
    pub fn with_embedded_key(mut self, key: impl Into<String>) -> Self {
        self.embedded_key = Some(key.into());
        self
    }

    /// Returns the value of the signature header `name`, if present.
    pub fn signature(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

impl std::fmt::Debug for IncomingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingRequest")
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field(
                "embedded_key",
                &self.embedded_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
