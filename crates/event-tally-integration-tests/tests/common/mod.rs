//! Common test utilities for event-tally-api integration tests
//!
//! This module provides:
//! - Application state builders for the supported configurations
//! - Request builders that sign payloads the way senders do
//! - Response helpers for reading JSON bodies

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use event_tally_api::{create_router, AppState, ServiceConfig};
use event_tally_core::{compute_signature, ClassificationProfile, SignatureScheme, WebhookSecret};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "It's a Secret to Everybody";

/// State enforcing signatures with the default settings.
pub fn create_test_app_state() -> AppState {
    create_app_state_with(ServiceConfig::default())
}

/// State enforcing signatures with the given configuration.
pub fn create_app_state_with(config: ServiceConfig) -> AppState {
    let secret = WebhookSecret::new(TEST_SECRET).unwrap();
    AppState::new(config, Some(secret)).unwrap()
}

/// State that counts events without checking signatures.
pub fn create_unauthenticated_app_state() -> AppState {
    let mut config = ServiceConfig::default();
    config.webhooks.require_signature = false;
    AppState::new(config, None).unwrap()
}

/// State using the GitHub classification profile.
pub fn create_github_app_state() -> AppState {
    let mut config = ServiceConfig::default();
    config.webhooks.profile = ClassificationProfile::Github;
    create_app_state_with(config)
}

/// POST `body` to `uri` signed with the test secret.
pub fn signed_post(uri: &str, body: &str, scheme: SignatureScheme) -> Request<Body> {
    let signature = compute_signature(body.as_bytes(), TEST_SECRET, scheme);
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(scheme.header_name(), signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// POST `body` to `uri` with an arbitrary signature header, or none.
pub fn post_with_header(uri: &str, body: &str, header: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Send a request through a fresh router over `state`.
pub async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
    router(state).oneshot(request).await.unwrap()
}

pub fn router(state: &AppState) -> Router {
    create_router(state.clone())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Current `/stats` document.
pub async fn fetch_stats(state: &AppState) -> serde_json::Value {
    body_json(send(state, get("/stats")).await).await
}
