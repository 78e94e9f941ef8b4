//! Mapping verified events to the fields that get counted.

use crate::event::{VerifiedEvent, GITHUB_EVENT_HEADER};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value substituted for any field the event does not carry.
pub const UNKNOWN_FIELD: &str = "unknown";

/// The three classification fields of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventFields {
    pub bucket: String,
    pub operation: String,
    pub key: String,
}

impl EventFields {
    /// All three fields set to [`UNKNOWN_FIELD`].
    pub fn unknown() -> Self {
        Self {
            bucket: UNKNOWN_FIELD.to_string(),
            operation: UNKNOWN_FIELD.to_string(),
            key: UNKNOWN_FIELD.to_string(),
        }
    }

    fn from_parts(bucket: Option<String>, operation: Option<String>, key: Option<String>) -> Self {
        Self {
            bucket: bucket.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            operation: operation.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            key: key.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
        }
    }
}

/// Where the classification fields are read from.
///
/// | Profile | bucket | operation | key |
/// |---------|--------|-----------|-----|
/// | `object_storage` | `bucket` | `operation` | `key` |
/// | `github` | `repository.full_name` | `X-GitHub-Event` header | `workflow_run.head_sha`, `head_commit.id` or `after` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationProfile {
    /// Cloud Object Storage event notifications.
    #[default]
    ObjectStorage,

    /// GitHub webhook deliveries, keyed by commit SHA.
    Github,
}

impl ClassificationProfile {
    /// Extract the counted fields from an event.
    ///
    /// Never fails: a body that is not JSON, not an object, or lacks a field
    /// yields [`UNKNOWN_FIELD`] for the missing parts.
    pub fn classify(&self, event: &VerifiedEvent) -> EventFields {
        let Ok(payload) = event.payload() else {
            return EventFields::unknown();
        };

        match self {
            Self::ObjectStorage => EventFields::from_parts(
                field_text(payload.get("bucket")),
                field_text(payload.get("operation")),
                field_text(payload.get("key")),
            ),
            Self::Github => EventFields::from_parts(
                field_text(payload.pointer("/repository/full_name")),
                event.header(GITHUB_EVENT_HEADER).map(str::to_string),
                ["/workflow_run/head_sha", "/head_commit/id", "/after"]
                    .into_iter()
                    .find_map(|pointer| field_text(payload.pointer(pointer))),
            ),
        }
    }
}

/// Render a scalar JSON value as a counter key.
///
/// Strings are used verbatim; numbers and booleans use their JSON text.
/// Null, arrays and objects are treated as absent.
fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
#[path = "classification_tests.rs"]
mod tests;
