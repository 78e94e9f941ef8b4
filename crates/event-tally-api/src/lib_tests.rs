//! Tests for application state construction and routing in the HTTP layer.

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use event_tally_core::{compute_signature, SignatureScheme};
use tower::ServiceExt;

const SECRET: &str = "It's a Secret to Everybody";

fn test_secret() -> WebhookSecret {
    WebhookSecret::new(SECRET).unwrap()
}

fn signed_request(uri: &str, body: &'static str) -> Request<Body> {
    let signature = compute_signature(body.as_bytes(), SECRET, SignatureScheme::HmacSha1);
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-hub-signature", signature)
        .body(Body::from(body))
        .unwrap()
}

// ============================================================================
// AppState
// ============================================================================

#[test]
fn test_app_state_requires_secret_when_signatures_enforced() {
    let result = AppState::new(ServiceConfig::default(), None);

    match result {
        Err(ConfigError::Missing { key }) => assert_eq!(key, "WEBHOOK_SECRET"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("state should not build without a secret"),
    }
}

#[test]
fn test_app_state_without_enforcement_has_no_verifier() {
    let mut config = ServiceConfig::default();
    config.webhooks.require_signature = false;

    let state = AppState::new(config, None).unwrap();

    assert!(state.verifier.is_none());
}

#[test]
fn test_app_state_uses_configured_schemes() {
    let mut config = ServiceConfig::default();
    config.webhooks.accepted_schemes = vec![SignatureScheme::HmacSha256];

    let state = AppState::new(config, Some(test_secret())).unwrap();
    let verifier = state.verifier.expect("verifier should be configured");

    assert!(verifier.accepts(SignatureScheme::HmacSha256));
    assert!(!verifier.accepts(SignatureScheme::HmacSha1));
}

#[test]
fn test_app_state_rejects_invalid_config() {
    let mut config = ServiceConfig::default();
    config.webhooks.endpoint_path = "/stats".to_string();

    assert!(matches!(
        AppState::new(config, Some(test_secret())),
        Err(ConfigError::Invalid { .. })
    ));
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_root_and_endpoint_path_share_the_counters() {
    let state = AppState::new(ServiceConfig::default(), Some(test_secret())).unwrap();
    let app = create_router(state.clone());

    let body = r#"{"bucket":"b1","operation":"PUT","key":"o1"}"#;

    let response = app.clone().oneshot(signed_request("/", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(signed_request("/webhook", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(state.aggregator.snapshot().by_bucket["b1"], 2);
    assert_eq!(state.metrics.events_recorded_total.get(), 2);
}

#[tokio::test]
async fn test_custom_endpoint_path_is_routed() {
    let mut config = ServiceConfig::default();
    config.webhooks.endpoint_path = "/events/cos".to_string();
    let state = AppState::new(config, Some(test_secret())).unwrap();
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(signed_request("/events/cos", r#"{"bucket":"b1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(signed_request("/webhook", r#"{"bucket":"b1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_rejects_post() {
    let state = AppState::new(ServiceConfig::default(), Some(test_secret())).unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_verification_failure_updates_metrics_only() {
    let state = AppState::new(ServiceConfig::default(), Some(test_secret())).unwrap();
    let app = create_router(state.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("x-hub-signature", "sha1=deadbeef")
        .body(Body::from(r#"{"bucket":"b1"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(state.metrics.webhook_requests_total.get(), 1);
    assert_eq!(state.metrics.webhook_verification_failures_total.get(), 1);
    assert_eq!(state.metrics.events_recorded_total.get(), 0);
    assert_eq!(state.aggregator.total_recorded(), 0);
}

#[tokio::test]
async fn test_duration_observed_for_every_outcome() {
    let state = AppState::new(ServiceConfig::default(), Some(test_secret())).unwrap();
    let app = create_router(state.clone());

    let rejected = Request::builder()
        .method("POST")
        .uri("/")
        .header("x-hub-signature", "sha1=deadbeef")
        .body(Body::from(r#"{"bucket":"b1"}"#))
        .unwrap();
    let response = app.clone().oneshot(rejected).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(signed_request("/", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(signed_request("/", r#"{"bucket":"b1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(state.metrics.webhook_duration_seconds.get_sample_count(), 3);
    assert_eq!(state.metrics.events_recorded_total.get(), 1);
}

#[tokio::test]
async fn test_correlation_id_is_echoed_on_rejection() {
    let state = AppState::new(ServiceConfig::default(), Some(test_secret())).unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("x-correlation-id", "rejected-1")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers()["x-correlation-id"], "rejected-1");
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let state = AppState::new(ServiceConfig::default(), Some(test_secret())).unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-correlation-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-correlation-id"], "abc-123");
}

#[tokio::test]
async fn test_correlation_id_is_generated_when_absent() {
    let state = AppState::new(ServiceConfig::default(), Some(test_secret())).unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers()["x-correlation-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}
