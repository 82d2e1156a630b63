//! services/gateway/src/config.rs
//!
//! Defines the gateway's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Origins allowed to call the AI routes. Requests carrying an Origin
    /// header not on this list are rejected with 403.
    pub allowed_origins: Vec<String>,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub local_base_url: String,
    pub local_model: String,
    pub openai_model: String,
    pub anthropic_model: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Request Policy Settings ---
        let allowed_origins_str = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string());
        let allowed_origins: Vec<String> = allowed_origins_str
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let rate_limit_max_requests = parse_env_number("RATE_LIMIT_MAX_REQUESTS", 40)?;
        let rate_limit_window_secs: u64 = parse_env_number("RATE_LIMIT_WINDOW_SECS", 60)?;
        let rate_limit_window = Duration::from_secs(rate_limit_window_secs);

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();

        // --- Load Provider Settings ---
        let local_base_url = std::env::var("LOCAL_MODEL_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string())
            .trim_end_matches('/')
            .to_string();
        let local_model =
            std::env::var("LOCAL_MODEL").unwrap_or_else(|_| "llama3.1".to_string());
        let openai_model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let anthropic_model = std::env::var("ANTHROPIC_MODEL")
            .unwrap_or_else(|_| "claude-3-5-haiku-latest".to_string());

        Ok(Self {
            bind_address,
            log_level,
            allowed_origins,
            rate_limit_max_requests,
            rate_limit_window,
            openai_api_key,
            anthropic_api_key,
            local_base_url,
            local_model,
            openai_model,
            anthropic_model,
        })
    }
}

fn parse_env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{raw}' is not a valid number"))
        }),
        Err(_) => Ok(default),
    }
}
