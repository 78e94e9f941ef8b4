//! Layered configuration loading for the service binary.

use event_tally_api::{ConfigError, ServiceConfig};
use tracing_subscriber::EnvFilter;

/// Environment variable naming an operator-supplied configuration file.
pub const CONFIG_FILE_ENV_VAR: &str = "EVENT_TALLY_CONFIG_FILE";

/// Prefix for configuration overrides, e.g. `ET__SERVER__PORT=9090`.
pub const ENV_PREFIX: &str = "ET";

const SYSTEM_CONFIG_FILE: &str = "/etc/event-tally/service";
const LOCAL_CONFIG_FILE: &str = "config/service";

/// Load the service configuration.
///
/// Sources, later ones overriding earlier ones:
///  1. `/etc/event-tally/service.yaml` (optional)
///  2. `./config/service.yaml` (optional)
///  3. `explicit_path` (required when given)
///  4. `ET__`-prefixed environment variables
///
/// `env` replaces the process environment as the source for step 4 when set.
/// Absent files leave the built-in defaults in place; a malformed file or an
/// override that cannot be coerced to its field type is an error.
pub fn load_service_config(
    explicit_path: Option<&str>,
    env: Option<config::Map<String, String>>,
) -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name(SYSTEM_CONFIG_FILE)
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name(LOCAL_CONFIG_FILE)
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = explicit_path.filter(|p| !p.is_empty()) {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("webhooks.accepted_schemes")
                .source(env),
        )
        .build()
        .map_err(|e| ConfigError::Invalid {
            message: format!("Failed to build configuration: {}", e),
        })?;

    let service_config: ServiceConfig =
        settings
            .try_deserialize()
            .map_err(|e| ConfigError::Invalid {
                message: format!("Could not deserialize service configuration: {}", e),
            })?;

    service_config.validate()?;
    Ok(service_config)
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter(level: &str) -> EnvFilter {
    let directives = [
        "event_tally_service",
        "event_tally_api",
        "event_tally_core",
        "tower_http",
    ]
    .iter()
    .map(|target| format!("{}={}", target, level))
    .collect::<Vec<_>>()
    .join(",");

    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
