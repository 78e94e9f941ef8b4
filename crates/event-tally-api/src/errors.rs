//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use event_tally_core::{MalformedPayload, VerificationError};
use tracing::warn;

/// Webhook handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: the body is not valid JSON
/// - `403 Forbidden`: signature verification is enforced and failed
///
/// # Security Considerations
///
/// A verification failure always produces the same response body, whatever
/// the underlying cause (missing header, malformed header, wrong digest).
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Maps to: `403 Forbidden` (permanent error, do not retry)
    #[error("Signature verification failed")]
    VerificationFailed(#[from] VerificationError),

    /// Maps to: `400 Bad Request` (permanent error, do not retry)
    #[error("{0}")]
    MalformedPayload(#[from] MalformedPayload),
}

impl WebhookHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::VerificationFailed(_) => StatusCode::FORBIDDEN,
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::VerificationFailed(_) => warn!("Rejected webhook: signature verification failed"),
            Self::MalformedPayload(e) => warn!(error = %e, "Rejected webhook: malformed payload"),
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl ServiceError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) => 3,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}
