//! crates/reading_journal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like storage or model APIs.

use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., filesystem, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A model provider failed. `status` carries the provider's HTTP status
    /// when one was observed; network-level failures have none.
    #[error("{message}")]
    Upstream { status: Option<u16>, message: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Flat string-keyed storage. Values are JSON documents; the store above
/// this port decides what lives under which key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove(&self, key: &str) -> PortResult<()>;
}

/// A single prompt exchange with a chat model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Sends the prompt and returns the model's raw text output.
    async fn complete(&self, prompt: &ChatPrompt) -> PortResult<String>;
}
