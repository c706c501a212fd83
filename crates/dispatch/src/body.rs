//! Decoding of raw request bodies.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use events::{NotifyError, RequestBody};
use serde_json::Value;
use tracing::debug;

/// Returns the body as a JSON value.
///
/// A raw body that looks like standard padded base64 is decoded first; the
/// result (or the raw text) must then be JSON.
///
/// # Errors
///
/// [`NotifyError::Parse`] if the text is not JSON.
pub fn decode_body(body: &RequestBody) -> Result<Value, NotifyError> {
    match body {
        RequestBody::Parsed(value) => Ok(value.clone()),
        RequestBody::Raw(raw) => {
            let text = match decode_base64_text(raw) {
                Some(decoded) => {
                    debug!(encoded_len = raw.len(), "Request body is base64; decoded");
                    decoded
                }
                None => raw.clone(),
            };
            serde_json::from_str(&text).map_err(|e| NotifyError::Parse {
                reason: e.to_string(),
            })
        }
    }
}

fn decode_base64_text(raw: &str) -> Option<String> {
    if !looks_like_base64(raw) {
        return None;
    }
    let bytes = BASE64.decode(raw).ok()?;
    String::from_utf8(bytes).ok()
}

/// Non-empty, a multiple of four characters, only the standard alphabet, and
/// at most two trailing `=`.
fn looks_like_base64(raw: &str) -> bool {
    if raw.is_empty() || raw.len() % 4 != 0 {
        return false;
    }
    let unpadded = raw.trim_end_matches('=');
    raw.len() - unpadded.len() <= 2
        && unpadded
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}
