//! # Event-Tally HTTP Service
//!
//! HTTP server receiving signed webhook events, counting them, and serving
//! the running totals.
//!
//! This service provides:
//! - Webhook endpoints (`POST /` and the configured path) with signature
//!   verification
//! - `GET /stats` with the per-bucket, per-type and per-object counters
//! - Health and Prometheus metrics endpoints

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::{
    resolve_webhook_secret, LoggingConfig, ServerConfig, ServiceConfig, WebhookConfig,
    RESERVED_PATHS, WEBHOOK_SECRET_ENV_VARS,
};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use metrics::ServiceMetrics;
pub use responses::{HealthResponse, WebhookResponse};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use event_tally_core::{
    EventAggregator, EventStats, InboundEvent, SignatureVerifier, VerifiedEvent, WebhookSecret,
};
use std::{future::IntoFuture, sync::Arc, time::Duration};
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn, Level};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Signature verifier; `None` when signatures are not required
    pub verifier: Option<Arc<SignatureVerifier>>,

    /// Running event counters
    pub aggregator: Arc<EventAggregator>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state.
    ///
    /// `secret` is required when `config.webhooks.require_signature` is set
    /// and ignored otherwise.
    pub fn new(config: ServiceConfig, secret: Option<WebhookSecret>) -> Result<Self, ConfigError> {
        config.validate()?;

        let verifier = if config.webhooks.require_signature {
            let secret = secret.ok_or_else(|| ConfigError::Missing {
                key: WEBHOOK_SECRET_ENV_VARS[0].to_string(),
            })?;
            Some(Arc::new(SignatureVerifier::with_schemes(
                secret,
                config.webhooks.accepted_schemes.iter().copied(),
            )))
        } else {
            if secret.is_some() {
                warn!("Webhook secret is set but signature verification is disabled");
            }
            None
        };

        let metrics = ServiceMetrics::new().map_err(|e| ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })?;

        Ok(Self {
            aggregator: Arc::new(EventAggregator::new(config.webhooks.profile)),
            config: Arc::new(config),
            verifier,
            metrics: Arc::new(metrics),
        })
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let endpoint_path = state.config.webhooks.endpoint_path.clone();
    let max_body_size = state.config.server.max_body_size;

    let mut webhook_routes = Router::new().route("/", post(handle_webhook));
    if endpoint_path != "/" {
        webhook_routes = webhook_routes.route(&endpoint_path, post(handle_webhook));
    }

    let query_routes = Router::new()
        .route("/stats", get(handle_stats))
        .route("/health", get(handle_health_check))
        .route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(query_routes)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server and run until SIGINT/SIGTERM.
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let host = state.config.server.host.clone();
    let port = state.config.server.port;
    let shutdown_timeout = Duration::from_secs(state.config.server.shutdown_timeout_seconds);
    let app = create_router(state);

    let address = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    // Once the signal arrives, in-flight requests get `shutdown_timeout` to
    // finish before the server is dropped.
    let shutdown_started = Arc::new(Notify::new());
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&shutdown_started)))
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = async {
            shutdown_started.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; dropping remaining connections"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown_started: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }

    shutdown_started.notify_one();
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle an inbound webhook event
///
/// 1. Verify the signature against the raw body (when enforced)
/// 2. Reject bodies that are not JSON
/// 3. Count the event and acknowledge it
///
/// Neither step suspends, so the response is returned as soon as the event is
/// counted. The handling time is observed for every outcome.
#[instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookHandlerError> {
    let start = std::time::Instant::now();
    state.metrics.record_webhook_request();

    let result = process_webhook(&state, &headers, body);

    state.metrics.observe_webhook_duration(start.elapsed());
    result.map(Json)
}

fn process_webhook(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<WebhookResponse, WebhookHandlerError> {
    let inbound = InboundEvent::new(
        headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?.to_string()))),
        body,
    );

    if state.config.logging.log_request_bodies {
        debug!(
            received_at = %inbound.received_at(),
            body = %String::from_utf8_lossy(inbound.raw_body()),
            "Received webhook body"
        );
    }

    let event = match &state.verifier {
        Some(verifier) => verifier.authenticate(inbound).inspect_err(|_| {
            state.metrics.record_verification_failure();
        })?,
        None => VerifiedEvent::unauthenticated(inbound),
    };

    if let Err(e) = event.payload() {
        state.metrics.record_malformed_payload();
        return Err(e.into());
    }

    let fields = state.aggregator.record(&event);
    state.metrics.record_event();

    info!(
        bucket = %fields.bucket,
        operation = %fields.operation,
        key = %fields.key,
        verified = event.is_verified(),
        "Recorded event"
    );

    Ok(WebhookResponse::accepted(event.is_verified(), fields))
}

// ============================================================================
// Query Handlers
// ============================================================================

/// Current event counters
#[instrument(skip_all)]
pub async fn handle_stats(State(state): State<AppState>) -> Json<EventStats> {
    Json(state.aggregator.snapshot())
}

/// Basic health check endpoint
#[instrument(skip_all)]
async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        events_recorded: state.aggregator.total_recorded(),
        timestamp: chrono::Utc::now(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let body = state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response())
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Reuses the caller's `x-correlation-id` or generates one, records it on the
/// request span and echoes it on the response. Completion is logged once, at
/// a level chosen by the status class.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    // Method, URI and correlation id are on the span.
    macro_rules! log_completion {
        ($level:expr) => {
            tracing::event!(
                $level,
                status = status.as_u16(),
                duration_ms,
                "Request completed"
            )
        };
    }

    if status.is_server_error() {
        log_completion!(Level::ERROR);
    } else if status.is_client_error() {
        log_completion!(Level::WARN);
    } else {
        log_completion!(Level::INFO);
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
