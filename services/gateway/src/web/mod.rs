//! services/gateway/src/web/mod.rs

pub mod middleware;
pub mod rate_limit;
pub mod rest;
pub mod state;

use std::sync::Arc;

use axum::http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method};
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use state::AppState;

// Re-export the router builder to make it easily accessible to the binary
// and to the HTTP tests.
pub use rest::ApiDoc;

/// The header a caller may use to supply its own provider API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Builds the full application router. The AI routes sit behind the origin
/// check and the rate limiter; the health route stays open.
pub fn router(state: Arc<AppState>) -> Router {
    let ai_routes = Router::new()
        .route(
            "/api/ai/generate-questions",
            post(rest::generate_questions_handler),
        )
        .route("/api/ai/grade", post(rest::grade_handler))
        // Layers wrap outside-in as they are added, so the origin check
        // runs first and a rejected origin never consumes rate budget.
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::enforce_rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::enforce_origin,
        ))
        .layer(cors_layer(&state.config));

    Router::new()
        .route("/api/health", get(rest::health_handler))
        .merge(ai_routes)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
}
