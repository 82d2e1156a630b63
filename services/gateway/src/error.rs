//! services/gateway/src/error.rs
//!
//! Defines the primary error type for the gateway service and its mapping
//! onto HTTP responses. Every error body has the shape `{"error": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;
use reading_journal_core::ports::PortError;

/// The primary error type for the `gateway` service.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed or out-of-range client input. Rejected before any
    /// provider is contacted.
    #[error("{0}")]
    InvalidRequest(String),

    /// The request's Origin header is not on the configured allow-list.
    #[error("origin not allowed")]
    OriginNotAllowed,

    /// The caller exhausted its fixed-window request budget.
    #[error("rate limit exceeded, try again shortly")]
    RateLimited,

    /// The selected provider failed. `status` carries the provider's own
    /// HTTP status when one was observed.
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors. The detail is logged,
    /// never echoed to the client.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<PortError> for GatewayError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Upstream { status, message } => Self::Upstream { status, message },
            PortError::NotFound(message) => Self::InvalidRequest(message),
            PortError::Unexpected(message) => Self::Internal(message),
        }
    }
}

impl GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::OriginNotAllowed => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            // A provider status that is itself an error passes through;
            // anything else is reported as a bad gateway.
            Self::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                error!("internal gateway error: {self}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
