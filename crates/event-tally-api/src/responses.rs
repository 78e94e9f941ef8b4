//! Response bodies for the HTTP endpoints

use chrono::{DateTime, Utc};
use event_tally_core::EventFields;
use serde::{Deserialize, Serialize};

/// Acknowledgement for an accepted webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,

    /// `false` when signature enforcement is disabled
    pub verified: bool,

    #[serde(flatten)]
    pub fields: EventFields,
}

impl WebhookResponse {
    pub fn accepted(verified: bool, fields: EventFields) -> Self {
        Self {
            status: "accepted".to_string(),
            verified,
            fields,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub events_recorded: u64,
    pub timestamp: DateTime<Utc>,
}
