//! services/gateway/src/web/middleware.rs
//!
//! Request-policy middleware for the AI routes: the origin allow-list and
//! the fixed-window rate limiter. Both reject before any provider is
//! contacted.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::GatewayError;
use crate::web::state::AppState;

/// Middleware that rejects requests whose `Origin` header is not on the
/// configured allow-list.
///
/// Requests without an `Origin` header pass through: same-host tools and
/// curl do not send one, and a browser cannot forge its own.
pub async fn enforce_origin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    // 1. Extract the Origin header, if any.
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());

    // 2. A present Origin must be on the allow-list.
    if let Some(origin) = origin {
        let allowed = state
            .config
            .allowed_origins
            .iter()
            .any(|candidate| candidate == origin);
        if !allowed {
            warn!("rejected request from disallowed origin '{origin}'");
            return Err(GatewayError::OriginNotAllowed);
        }
    }

    // 3. Continue to the handler.
    Ok(next.run(req).await)
}

/// Middleware that enforces the fixed-window rate limit, keyed by the
/// `Origin` header value. Callers without one share a single bucket.
pub async fn enforce_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let key = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    if !state.limiter.check(key) {
        warn!("rate limit exceeded for caller '{key}'");
        return Err(GatewayError::RateLimited);
    }

    Ok(next.run(req).await)
}
