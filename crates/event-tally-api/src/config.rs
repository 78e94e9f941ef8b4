//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use event_tally_core::{ClassificationProfile, SignatureScheme, WebhookSecret};
use serde::{Deserialize, Serialize};

/// Environment variables consulted for the webhook secret, in order.
///
/// `GIT_SECRET` is kept for receivers deployed before `WEBHOOK_SECRET` was
/// introduced.
pub const WEBHOOK_SECRET_ENV_VARS: [&str; 2] = ["WEBHOOK_SECRET", "GIT_SECRET"];

/// Routes served regardless of configuration.
pub const RESERVED_PATHS: [&str; 3] = ["/stats", "/health", "/metrics"];

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook processing settings
    pub webhooks: WebhookConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.webhooks.validate()?;
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "server.host must not be empty".to_string(),
            });
        }

        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Webhook processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path, served in addition to `/`
    pub endpoint_path: String,

    /// Reject events whose signature does not verify
    pub require_signature: bool,

    /// Signature schemes accepted when signatures are required
    pub accepted_schemes: Vec<SignatureScheme>,

    /// How events are classified for counting
    pub profile: ClassificationProfile,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhook".to_string(),
            require_signature: true,
            accepted_schemes: vec![SignatureScheme::HmacSha1, SignatureScheme::HmacSha256],
            profile: ClassificationProfile::ObjectStorage,
        }
    }
}

impl WebhookConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.endpoint_path must start with '/', got '{}'",
                    self.endpoint_path
                ),
            });
        }

        // Route captures and wildcards would make the path a pattern.
        if self
            .endpoint_path
            .contains(|c| matches!(c, '{' | '}' | '*' | ':'))
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.endpoint_path must be a literal path, got '{}'",
                    self.endpoint_path
                ),
            });
        }

        if RESERVED_PATHS.contains(&self.endpoint_path.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.endpoint_path '{}' collides with a built-in route",
                    self.endpoint_path
                ),
            });
        }

        if self.require_signature && self.accepted_schemes.is_empty() {
            return Err(ConfigError::Invalid {
                message: "webhooks.accepted_schemes must not be empty when signatures are required"
                    .to_string(),
            });
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,

    /// Log raw request bodies at debug level
    pub log_request_bodies: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            log_request_bodies: false,
        }
    }
}

/// Find the webhook secret using `lookup` (normally `std::env::var`).
///
/// Tries each of [`WEBHOOK_SECRET_ENV_VARS`] in order, skipping unset and
/// empty values.
pub fn resolve_webhook_secret<F>(lookup: F) -> Option<WebhookSecret>
where
    F: Fn(&str) -> Option<String>,
{
    WEBHOOK_SECRET_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find_map(|value| WebhookSecret::new(value).ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
