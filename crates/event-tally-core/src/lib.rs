//! # Event-Tally Core
//!
//! Domain logic for the Event-Tally webhook receiver: authenticating inbound
//! payloads with a shared-secret HMAC and keeping running counts of the events
//! that pass.
//!
//! ## Architecture
//!
//! - [`signature`]: pure HMAC-SHA1 / HMAC-SHA256 verification and the
//!   [`SignatureVerifier`] that turns an [`InboundEvent`] into a
//!   [`VerifiedEvent`]
//! - [`event`]: the raw request model and its verified counterpart
//! - [`classification`]: the rules mapping a payload to the counted fields
//! - [`aggregator`]: the concurrency-safe counters and their snapshot
//!
//! Nothing in this crate performs I/O. The HTTP layer lives in
//! `event-tally-api`.
//!
//! ## Usage
//!
//! ```rust
//! use event_tally_core::{
//!     compute_signature, EventAggregator, InboundEvent, SignatureScheme, SignatureVerifier,
//!     WebhookSecret,
//! };
//!
//! let secret = WebhookSecret::new("It's a Secret to Everybody").unwrap();
//! let body = br#"{"bucket":"b1","operation":"PUT","key":"o1"}"#;
//! let signature = compute_signature(body, secret.expose_secret(), SignatureScheme::HmacSha1);
//!
//! let event = InboundEvent::new([("X-Hub-Signature", signature)], body.to_vec());
//! let verifier = SignatureVerifier::new(secret);
//! let verified = verifier.authenticate(event).unwrap();
//!
//! let aggregator = EventAggregator::default();
//! aggregator.record(&verified);
//! assert_eq!(aggregator.snapshot().by_bucket["b1"], 1);
//! ```

pub mod aggregator;
pub mod classification;
pub mod event;
pub mod signature;

pub use aggregator::{EventAggregator, EventStats};
pub use classification::{ClassificationProfile, EventFields, UNKNOWN_FIELD};
pub use event::{Authenticity, InboundEvent, MalformedPayload, VerifiedEvent};
pub use signature::{
    compute_signature, verify, SecretError, SignatureScheme, SignatureVerifier,
    VerificationError, WebhookSecret,
};
