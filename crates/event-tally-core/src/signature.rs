//! Webhook signature verification.
//!
//! Provides HMAC-SHA1 and HMAC-SHA256 verification of inbound payloads
//! against the `X-Hub-Signature` / `X-Hub-Signature-256` header formats,
//! using constant-time comparison to prevent timing attacks.
//!
//! # Security
//!
//! - The header format (prefix, exact length, lowercase hex) is checked before
//!   any hex decode is attempted
//! - Every failure mode returns the same `false` / [`VerificationError`]
//! - Secrets and signature values are never logged

use crate::event::{Authenticity, InboundEvent, VerifiedEvent};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Signature Schemes
// ============================================================================

/// HMAC digest used to sign a webhook payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// `X-Hub-Signature: sha1=<40 hex>`
    #[serde(rename = "sha1")]
    HmacSha1,

    /// `X-Hub-Signature-256: sha256=<64 hex>`
    #[serde(rename = "sha256")]
    HmacSha256,
}

impl SignatureScheme {
    /// All supported schemes, strongest first.
    pub const ALL: [SignatureScheme; 2] = [SignatureScheme::HmacSha256, SignatureScheme::HmacSha1];

    /// Literal prefix carried in front of the hex digest.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "sha1=",
            Self::HmacSha256 => "sha256=",
        }
    }

    /// Number of hex characters in the digest.
    pub fn digest_hex_len(&self) -> usize {
        match self {
            Self::HmacSha1 => 40,
            Self::HmacSha256 => 64,
        }
    }

    /// Total length of a well-formed header value (45 for SHA1, 71 for SHA256).
    pub fn header_value_len(&self) -> usize {
        self.prefix().len() + self.digest_hex_len()
    }

    /// Lowercase name of the HTTP header carrying this scheme's signature.
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "x-hub-signature",
            Self::HmacSha256 => "x-hub-signature-256",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HmacSha1 => write!(f, "sha1"),
            Self::HmacSha256 => write!(f, "sha256"),
        }
    }
}

// ============================================================================
// Pure Verification
// ============================================================================

/// Verify `header_value` as the HMAC of `raw_body` keyed by `secret`.
///
/// Returns `true` only when the header has the exact `"<scheme>=<hex>"` form
/// for `scheme` and the digest matches. Absent, malformed, wrong-length,
/// non-hex and mismatched signatures all return `false`.
///
/// # Examples
///
/// ```rust
/// use event_tally_core::{compute_signature, verify, SignatureScheme};
///
/// let body = b"{}";
/// let header = compute_signature(body, "secret", SignatureScheme::HmacSha1);
///
/// assert!(verify(body, Some(&header), "secret", SignatureScheme::HmacSha1));
/// assert!(!verify(body, Some("sha1=deadbeef"), "secret", SignatureScheme::HmacSha1));
/// assert!(!verify(body, None, "secret", SignatureScheme::HmacSha1));
/// ```
pub fn verify(
    raw_body: &[u8],
    header_value: Option<&str>,
    secret: &str,
    scheme: SignatureScheme,
) -> bool {
    let Some(header_value) = header_value else {
        return false;
    };

    let Some(hex_digest) = extract_hex_digest(header_value, scheme) else {
        return false;
    };

    // Unreachable after the charset check, but a decode failure is still a
    // plain verification failure.
    let Ok(provided) = hex::decode(hex_digest) else {
        return false;
    };

    let Some(expected) = compute_hmac(raw_body, secret.as_bytes(), scheme) else {
        return false;
    };

    constant_time_compare(&expected, &provided)
}

/// Compute the header value (`"sha1=<hex>"` or `"sha256=<hex>"`) for a payload.
pub fn compute_signature(raw_body: &[u8], secret: &str, scheme: SignatureScheme) -> String {
    let digest = compute_hmac(raw_body, secret.as_bytes(), scheme).unwrap_or_default();
    format!("{}{}", scheme.prefix(), hex::encode(digest))
}

/// Return the hex digest portion of a header value if it is well formed.
fn extract_hex_digest(header_value: &str, scheme: SignatureScheme) -> Option<&str> {
    if header_value.len() != scheme.header_value_len() {
        return None;
    }

    let digest = header_value.strip_prefix(scheme.prefix())?;
    if digest.len() != scheme.digest_hex_len() {
        return None;
    }

    if !digest
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return None;
    }

    Some(digest)
}

fn compute_hmac(payload: &[u8], key: &[u8], scheme: SignatureScheme) -> Option<Vec<u8>> {
    match scheme {
        SignatureScheme::HmacSha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key).ok()?;
            mac.update(payload);
            Some(mac.finalize().into_bytes().to_vec())
        }
        SignatureScheme::HmacSha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).ok()?;
            mac.update(payload);
            Some(mac.finalize().into_bytes().to_vec())
        }
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    // Lengths are public (fixed per scheme), so this check leaks nothing.
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

// ============================================================================
// Secrets
// ============================================================================

/// Shared secret used as the HMAC key.
///
/// The value is wiped from memory on drop and never appears in `Debug`
/// output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Wrap a secret value, rejecting the empty string.
    pub fn new(value: impl Into<String>) -> Result<Self, SecretError> {
        let value = value.into();
        if value.is_empty() {
            return Err(SecretError::Empty);
        }
        Ok(Self(value))
    }

    /// Get the secret for immediate use as an HMAC key.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WebhookSecret").field(&"<REDACTED>").finish()
    }
}

/// Errors constructing a [`WebhookSecret`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("webhook secret must not be empty")]
    Empty,
}

/// Signature verification failed.
///
/// Deliberately carries no detail: a missing header, a malformed header and a
/// wrong digest are indistinguishable to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("signature verification failed")]
pub struct VerificationError;

// ============================================================================
// Verifier
// ============================================================================

/// Authenticates inbound events with a shared secret.
///
/// # Examples
///
/// ```rust
/// use event_tally_core::{InboundEvent, SignatureScheme, SignatureVerifier, WebhookSecret};
///
/// let secret = WebhookSecret::new("s3cret").unwrap();
/// let verifier = SignatureVerifier::with_schemes(secret, [SignatureScheme::HmacSha256]);
///
/// let unsigned = InboundEvent::new(Vec::<(String, String)>::new(), b"{}".to_vec());
/// assert!(verifier.authenticate(unsigned).is_err());
/// ```
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: WebhookSecret,
    accepted_schemes: Vec<SignatureScheme>,
}

impl SignatureVerifier {
    /// Create a verifier accepting both SHA1 and SHA256 signatures.
    pub fn new(secret: WebhookSecret) -> Self {
        Self::with_schemes(secret, SignatureScheme::ALL)
    }

    /// Create a verifier accepting only the given schemes.
    pub fn with_schemes(
        secret: WebhookSecret,
        schemes: impl IntoIterator<Item = SignatureScheme>,
    ) -> Self {
        let mut accepted_schemes: Vec<SignatureScheme> = Vec::new();
        for scheme in schemes {
            if !accepted_schemes.contains(&scheme) {
                accepted_schemes.push(scheme);
            }
        }

        Self {
            secret,
            accepted_schemes,
        }
    }

    /// Whether signatures of `scheme` are accepted.
    pub fn accepts(&self, scheme: SignatureScheme) -> bool {
        self.accepted_schemes.contains(&scheme)
    }

    /// Schemes this verifier accepts.
    pub fn accepted_schemes(&self) -> &[SignatureScheme] {
        &self.accepted_schemes
    }

    /// Verify the event's signature header against its raw body.
    ///
    /// The first header present for an accepted scheme is checked, strongest
    /// scheme first. Headers for schemes this verifier does not accept are
    /// ignored, so a SHA1-only verifier still authenticates deliveries that
    /// also carry `X-Hub-Signature-256`. Only that one header is checked;
    /// a mismatch does not fall back to a weaker scheme.
    pub fn authenticate(&self, event: InboundEvent) -> Result<VerifiedEvent, VerificationError> {
        let selected = SignatureScheme::ALL
            .into_iter()
            .filter(|scheme| self.accepts(*scheme))
            .find_map(|scheme| {
                event
                    .header(scheme.header_name())
                    .map(|value| (scheme, value))
            });

        let Some((scheme, header_value)) = selected else {
            debug!(
                present = ?event.signature().map(|(scheme, _)| scheme),
                "No signature header for an accepted scheme"
            );
            return Err(VerificationError);
        };

        if verify(
            event.raw_body(),
            Some(header_value),
            self.secret.expose_secret(),
            scheme,
        ) {
            Ok(VerifiedEvent::new(event, Authenticity::Verified(scheme)))
        } else {
            Err(VerificationError)
        }
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .field("accepted_schemes", &self.accepted_schemes)
            .finish()
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
