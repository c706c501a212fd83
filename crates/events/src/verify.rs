//! Inbound request authentication.
//!
//! A request is verified in two steps. First the key material and the
//! available body representation are resolved into one [`VerificationMode`];
//! then the mode is checked. Every failure path returns `false`, so a missing
//! header, a missing key, or an undecodable signature all fail closed.
//!
//! ## Key precedence
//!
//! 1. The key configured for the process ([`crate::NotifyConfig::key_material`]).
//! 2. The key embedded in the request ([`IncomingRequest::embedded_key`]).
//! 3. Nothing: verification fails.
//!
//! ## Modes
//!
//! | Key | Body | Mode | Signed bytes |
//! |-----|------|------|--------------|
//! | RSA public key | raw | [`VerificationMode::RawSignature`] | raw body |
//! | RSA public key | parsed | [`VerificationMode::CanonicalBody`] | base64 of the canonical JSON |
//! | anything else | either | [`VerificationMode::SharedSecret`] | raw body (canonical JSON if parsed) |

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::{IncomingRequest, NotifyConfig, RequestBody};

type HmacSha256 = Hmac<Sha256>;

/// How a particular request will be authenticated.
pub enum VerificationMode<'a> {
    /// RSA PKCS#1 v1.5 / SHA-256 signature over the raw body bytes.
    RawSignature {
        /// Verifying key.
        key: RsaPublicKey,
        /// Raw body as received.
        body: &'a str,
    },
    /// RSA PKCS#1 v1.5 / SHA-256 signature over the base64 encoding of the
    /// canonical re-serialization of a parsed body.
    CanonicalBody {
        /// Verifying key.
        key: RsaPublicKey,
        /// Parsed body.
        body: &'a Value,
    },
    /// Hex HMAC-SHA256 of the body under a shared secret.
    SharedSecret {
        /// Shared secret.
        secret: &'a str,
        /// Body in whichever representation is available.
        body: &'a RequestBody,
    },
}

impl VerificationMode<'_> {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RawSignature { .. } => "raw_signature",
            Self::CanonicalBody { .. } => "canonical_body",
            Self::SharedSecret { .. } => "shared_secret",
        }
    }

    /// Checks `signature` under this mode.
    pub fn check(&self, signature: &str) -> bool {
        match self {
            Self::RawSignature { key, body } => verify_rsa(key, body.as_bytes(), signature),
            Self::CanonicalBody { key, body } => match canonical_bytes(body) {
                Some(bytes) => verify_rsa(key, BASE64.encode(bytes).as_bytes(), signature),
                None => false,
            },
            Self::SharedSecret { secret, body } => {
                let bytes = match body {
                    RequestBody::Raw(raw) => Cow::Borrowed(raw.as_bytes()),
                    RequestBody::Parsed(value) => match canonical_bytes(value) {
                        Some(bytes) => Cow::Owned(bytes),
                        None => return false,
                    },
                };
                verify_hmac(secret.as_bytes(), &bytes, signature)
            }
        }
    }
}

/// Verifies inbound requests against the process key, falling back to a key
/// embedded in the request.
#[derive(Clone)]
pub struct SignatureVerifier {
    key_material: Option<String>,
    header_name: String,
}

impl SignatureVerifier {
    /// Creates a verifier from explicit key material and header name.
    pub fn new(key_material: Option<String>, header_name: impl Into<String>) -> Self {
        Self {
            key_material,
            header_name: header_name.into(),
        }
    }

    /// Creates a verifier from the process configuration.
    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::new(config.key_material.clone(), config.signature_header.clone())
    }

    /// Name of the header the signature is read from.
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Returns `true` only if the request carries a valid signature.
    pub fn verify(&self, request: &IncomingRequest) -> bool {
        verify_request(request, self.key_material.as_deref(), &self.header_name)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("key_material", &self.key_material.as_ref().map(|_| "<redacted>"))
            .field("header_name", &self.header_name)
            .finish()
    }
}

/// Verifies `request` with `key_material` (or the request's embedded key),
/// reading the signature from `header_name`.
pub fn verify_request(
    request: &IncomingRequest,
    key_material: Option<&str>,
    header_name: &str,
) -> bool {
    let Some(signature) = request.signature(header_name) else {
        warn!(header = header_name, "Signature header missing");
        return false;
    };
    let Some(mode) = resolve_mode(request, key_material) else {
        return false;
    };

    debug!(mode = mode.label(), "Verifying request signature");
    let valid = mode.check(signature);
    if !valid {
        warn!(mode = mode.label(), "Request signature did not verify");
    }
    valid
}

/// Resolves which [`VerificationMode`] applies to `request`.
///
/// Returns `None` when no key material or no body is available.
pub fn resolve_mode<'a>(
    request: &'a IncomingRequest,
    key_material: Option<&'a str>,
) -> Option<VerificationMode<'a>> {
    let key = key_material
        .filter(|k| !k.trim().is_empty())
        .or_else(|| {
            request
                .embedded_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
        });
    let Some(key) = key else {
        warn!("No key material available; rejecting request");
        return None;
    };
    let Some(body) = request.body.as_ref() else {
        warn!("Request has no body to verify");
        return None;
    };

    let mode = match (parse_public_key(key), body) {
        (Some(key), RequestBody::Raw(raw)) => VerificationMode::RawSignature { key, body: raw },
        (Some(key), RequestBody::Parsed(value)) => {
            VerificationMode::CanonicalBody { key, body: value }
        }
        (None, body) => VerificationMode::SharedSecret { secret: key, body },
    };
    Some(mode)
}

/// Parses `key` as an RSA public key in SPKI (`PUBLIC KEY`) or PKCS#1
/// (`RSA PUBLIC KEY`) PEM form.
///
/// Literal `\n` sequences are treated as newlines so keys copied into a
/// single-line environment variable still parse.
pub fn parse_public_key(key: &str) -> Option<RsaPublicKey> {
    let pem = key.trim().replace("\\n", "\n");
    if !pem.starts_with("-----BEGIN") {
        return None;
    }
    RsaPublicKey::from_public_key_pem(&pem)
        .ok()
        .or_else(|| RsaPublicKey::from_pkcs1_pem(&pem).ok())
}

/// Stable byte form of a parsed body: compact JSON with object keys in
/// sorted order.
fn canonical_bytes(value: &Value) -> Option<Vec<u8>> {
    serde_json::to_vec(value).ok()
}

fn verify_rsa(key: &RsaPublicKey, message: &[u8], signature_b64: &str) -> bool {
    let Ok(raw) = BASE64.decode(signature_b64.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(raw.as_slice()) else {
        return false;
    };
    VerifyingKey::<Sha256>::new(key.clone())
        .verify(message, &signature)
        .is_ok()
}

fn verify_hmac(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(provided) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    expected.as_slice().ct_eq(provided.as_slice()).into()
}
