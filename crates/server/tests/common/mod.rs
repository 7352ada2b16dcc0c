//! Shared helpers for server integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tokenfit_server::{router, AppState, ConfigHandle, InMemorySource, ShapeConfig};
use tower::ServiceExt;

/// A config with the given global budget and a test cursor secret.
pub fn config(soft: usize, hard: usize) -> ShapeConfig {
    ShapeConfig {
        output_token_threshold: soft,
        hard_cap: hard,
        cursor_secret: "test-secret".to_string(),
        ..ShapeConfig::default()
    }
}

/// Build app state and router over an in-memory source.
pub fn app(source: InMemorySource, config: ShapeConfig) -> (AppState, axum::Router) {
    let state = AppState::new(ConfigHandle::new(config, None), Arc::new(source));
    (state.clone(), router(state))
}

/// Drive one GET request and parse the JSON body.
pub async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}
