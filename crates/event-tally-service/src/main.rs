//! # Event-Tally Service
//!
//! Binary entry point for the Event-Tally HTTP service.
//!
//! This executable:
//! - Loads configuration from files and the environment
//! - Initializes logging
//! - Resolves the webhook secret
//! - Starts the HTTP server from event-tally-api

mod settings;

use event_tally_api::{
    resolve_webhook_secret, start_server, AppState, LoggingConfig, ServiceError,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let explicit_path = std::env::var(settings::CONFIG_FILE_ENV_VAR).ok();

    let service_config = match settings::load_service_config(explicit_path.as_deref(), None) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(ServiceError::from(e).exit_code());
        }
    };

    init_tracing(&service_config.logging);

    info!("Starting Event-Tally Service");
    if let Some(path) = &explicit_path {
        info!(path = %path, "Loaded configuration from explicit path");
    }

    let secret = resolve_webhook_secret(|name| std::env::var(name).ok());

    let state = match AppState::new(service_config, secret) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize service; aborting");
            std::process::exit(ServiceError::from(e).exit_code());
        }
    };

    info!(
        host = %state.config.server.host,
        port = state.config.server.port,
        endpoint_path = %state.config.webhooks.endpoint_path,
        require_signature = state.config.webhooks.require_signature,
        profile = ?state.config.webhooks.profile,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(state).await {
        error!("Failed to start server: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| settings::default_log_filter(&logging.level));

    let json = logging.json_format;
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .try_init();
}
