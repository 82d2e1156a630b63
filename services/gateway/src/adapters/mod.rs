//! services/gateway/src/adapters/mod.rs
//!
//! Outbound adapters: one `ChatCompletionService` implementation per
//! supported provider, plus the factory that picks between them. Adapters
//! are built per request because the model, base URL and API key can all
//! change from one request to the next.

pub mod anthropic;
pub mod local;
pub mod openai;

use std::sync::Arc;

use reading_journal_core::ports::ChatCompletionService;

use crate::coach::validate::ProviderTarget;

/// The providers the gateway can dispatch a coach request to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Local,
    OpenAi,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Local, Provider::OpenAi, Provider::Anthropic];

    /// Parses the identifier used in request payloads.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "local" => Some(Self::Local),
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// Builds the adapter for a validated target. Cloud targets carry a
/// resolved API key by the time validation hands them over.
pub fn for_target(
    target: &ProviderTarget,
    http: &reqwest::Client,
) -> Arc<dyn ChatCompletionService> {
    match target.provider {
        Provider::Local => Arc::new(local::LocalChatAdapter::new(
            http.clone(),
            target.base_url.clone(),
            target.model.clone(),
        )),
        Provider::OpenAi => Arc::new(openai::OpenAiChatAdapter::new(
            target.api_key.as_deref().unwrap_or_default(),
            target.model.clone(),
        )),
        Provider::Anthropic => Arc::new(anthropic::AnthropicChatAdapter::new(
            http.clone(),
            target.api_key.clone().unwrap_or_default(),
            target.model.clone(),
        )),
    }
}
