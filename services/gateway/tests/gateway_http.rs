//! Integration tests for the gateway's HTTP surface
//!
//! Drives the real router through tower's `oneshot` without binding a
//! socket. Tests cover:
//! 1. The health endpoint and its provider list
//! 2. Origin allow-list enforcement (and its ordering before rate limiting)
//! 3. Request validation failures mapping to 400 with `{"error": ...}` bodies
//! 4. Fixed-window rate limiting across a shared router
//! 5. CORS preflight handling for the journal client
//!
//! No provider is ever contacted: every request here is rejected at the
//! middleware or validation boundary.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use gateway_lib::config::Config;
use gateway_lib::web::{self, state::AppState};

const ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// A config with a tiny rate budget so the window tests stay short.
fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:8787".parse().unwrap(),
        log_level: tracing::Level::INFO,
        allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
        rate_limit_max_requests: 3,
        rate_limit_window: Duration::from_secs(60),
        openai_api_key: None,
        anthropic_api_key: Some("test-key".to_string()),
        local_base_url: "http://127.0.0.1:11434".to_string(),
        local_model: "llama3.1".to_string(),
        openai_model: "gpt-4o-mini".to_string(),
        anthropic_model: "claude-3-5-haiku-latest".to_string(),
    }
}

fn test_router() -> Router {
    let state = AppState::new(test_config()).unwrap();
    web::router(Arc::new(state))
}

fn post_json(uri: &str, origin: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok_and_the_provider_list() {
    let router = test_router();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"ok": true, "providers": ["local", "openai", "anthropic"]})
    );
}

#[tokio::test]
async fn requests_from_unknown_origins_are_rejected() {
    let router = test_router();

    let request = post_json(
        "/api/ai/generate-questions",
        Some("http://evil.example"),
        json!({"provider": "local"}),
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body, json!({"error": "origin not allowed"}));
}

#[tokio::test]
async fn requests_without_an_origin_header_pass_the_allow_list() {
    let router = test_router();

    // No Origin at all: curl-style callers. Validation still applies, so
    // an unknown provider comes back as a 400, not a 403.
    let request = post_json(
        "/api/ai/generate-questions",
        None,
        json!({"provider": "gemini"}),
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("provider"), "unexpected message: {message}");
}

#[tokio::test]
async fn a_cloud_request_without_any_key_is_a_client_error() {
    let router = test_router();

    // The test config has no OpenAI key and the request sends no header.
    let request = post_json(
        "/api/ai/generate-questions",
        Some(ALLOWED_ORIGIN),
        json!({"provider": "openai", "count": 3}),
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"error": "missing API key for the openai provider"})
    );
}

#[tokio::test]
async fn malformed_bodies_produce_the_standard_error_shape() {
    let router = test_router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/ai/grade")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(
        message.starts_with("invalid request body:"),
        "unexpected message: {message}"
    );
}

#[tokio::test]
async fn a_grade_request_with_no_answers_is_rejected() {
    let router = test_router();

    let request = post_json(
        "/api/ai/grade",
        Some(ALLOWED_ORIGIN),
        json!({"provider": "anthropic", "answers": []}),
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"error": "answers must contain at least one complete row"})
    );
}

#[tokio::test]
async fn the_rate_limit_rejects_the_request_over_budget() {
    let router = test_router();

    // 1. Burn the three-request budget. Each request fails validation
    //    (unknown provider), which still counts against the window.
    for _ in 0..3 {
        let request = post_json(
            "/api/ai/generate-questions",
            Some(ALLOWED_ORIGIN),
            json!({"provider": "nope"}),
        );
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // 2. The fourth request in the window is refused.
    let request = post_json(
        "/api/ai/generate-questions",
        Some(ALLOWED_ORIGIN),
        json!({"provider": "nope"}),
    );
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"error": "rate limit exceeded, try again shortly"})
    );
}

#[tokio::test]
async fn rejected_origins_do_not_consume_rate_budget() {
    let router = test_router();

    // 1. Hammer the gateway from a disallowed origin, well past the budget.
    for _ in 0..10 {
        let request = post_json(
            "/api/ai/grade",
            Some("http://evil.example"),
            json!({"provider": "local"}),
        );
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    // 2. The allowed origin still has its full budget.
    for _ in 0..3 {
        let request = post_json(
            "/api/ai/grade",
            Some(ALLOWED_ORIGIN),
            json!({"provider": "nope"}),
        );
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    let request = post_json(
        "/api/ai/grade",
        Some(ALLOWED_ORIGIN),
        json!({"provider": "nope"}),
    );
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn preflight_requests_are_answered_for_the_allowed_origin() {
    let router = test_router();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/ai/generate-questions")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let allow_origin = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|value| value.to_str().ok());
    assert_eq!(allow_origin, Some(ALLOWED_ORIGIN));
}
