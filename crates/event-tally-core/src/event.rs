//! Inbound event model.
//!
//! An [`InboundEvent`] is the request exactly as received. Its body can only
//! be parsed once it has become a [`VerifiedEvent`], which is produced by
//! [`SignatureVerifier::authenticate`](crate::SignatureVerifier::authenticate)
//! or, when the operator has switched signature enforcement off, by
//! [`VerifiedEvent::unauthenticated`].

use crate::signature::SignatureScheme;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Lowercase name of the GitHub event type header.
pub const GITHUB_EVENT_HEADER: &str = "x-github-event";

// ============================================================================
// Inbound Event
// ============================================================================

/// Raw webhook request: unmodified body plus case-insensitive headers.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    raw_body: Bytes,
    headers: HashMap<String, String>,
    received_at: DateTime<Utc>,
}

impl InboundEvent {
    /// Create a new inbound event. Header names are normalised to lowercase.
    pub fn new<I, K, V>(headers: I, raw_body: impl Into<Bytes>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
            .collect();

        Self {
            raw_body: raw_body.into(),
            headers,
            received_at: Utc::now(),
        }
    }

    /// The body bytes exactly as received.
    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The signature header and the scheme it claims.
    ///
    /// `X-Hub-Signature-256` takes precedence when both headers are present.
    pub fn signature(&self) -> Option<(SignatureScheme, &str)> {
        SignatureScheme::ALL
            .into_iter()
            .find_map(|scheme| self.header(scheme.header_name()).map(|v| (scheme, v)))
    }

    /// When the event was received.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

// ============================================================================
// Verified Event
// ============================================================================

/// How a [`VerifiedEvent`] came to be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authenticity {
    /// The signature header matched under the given scheme.
    Verified(SignatureScheme),

    /// Signature enforcement is disabled for this receiver.
    Unauthenticated,
}

/// An inbound event whose body may now be parsed and acted upon.
#[derive(Debug, Clone)]
pub struct VerifiedEvent {
    inbound: InboundEvent,
    authenticity: Authenticity,
    payload: OnceLock<Result<serde_json::Value, MalformedPayload>>,
}

impl VerifiedEvent {
    pub(crate) fn new(inbound: InboundEvent, authenticity: Authenticity) -> Self {
        Self {
            inbound,
            authenticity,
            payload: OnceLock::new(),
        }
    }

    /// Accept an event without verification.
    ///
    /// Only for receivers configured without a shared secret.
    pub fn unauthenticated(inbound: InboundEvent) -> Self {
        Self::new(inbound, Authenticity::Unauthenticated)
    }

    pub fn authenticity(&self) -> Authenticity {
        self.authenticity
    }

    /// `true` when a signature was checked and matched.
    pub fn is_verified(&self) -> bool {
        matches!(self.authenticity, Authenticity::Verified(_))
    }

    pub fn raw_body(&self) -> &[u8] {
        self.inbound.raw_body()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inbound.header(name)
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.inbound.received_at()
    }

    /// The body parsed as JSON. Parsed on first access and cached.
    pub fn payload(&self) -> Result<&serde_json::Value, MalformedPayload> {
        self.payload
            .get_or_init(|| {
                serde_json::from_slice(&self.inbound.raw_body).map_err(|e| MalformedPayload {
                    message: e.to_string(),
                })
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

/// The event body is not valid JSON.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed JSON payload: {message}")]
pub struct MalformedPayload {
    pub message: String,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
