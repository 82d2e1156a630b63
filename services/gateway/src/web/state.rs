//! services/gateway/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::config::Config;
use crate::error::GatewayError;
use crate::web::rate_limit::FixedWindowLimiter;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// One HTTP client, cloned into the reqwest-based provider adapters.
    pub http: reqwest::Client,
    pub limiter: Arc<FixedWindowLimiter>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                "reading-journal-gateway/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;
        let limiter = Arc::new(FixedWindowLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window,
        ));
        Ok(Self {
            config: Arc::new(config),
            http,
            limiter,
        })
    }
}
