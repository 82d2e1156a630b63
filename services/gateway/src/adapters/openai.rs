//! services/gateway/src/adapters/openai.rs
//!
//! This module contains the adapter for the OpenAI chat completions API.
//! It implements the `ChatCompletionService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::warn;

use reading_journal_core::ports::{ChatCompletionService, ChatPrompt, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` using the OpenAI API.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter` around the resolved key. Keys can
    /// differ per request, so no client is shared between requests.
    pub fn new(api_key: &str, model: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for OpenAiChatAdapter {
    async fn complete(&self, prompt: &ChatPrompt) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.user.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(prompt.temperature)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                if content.trim().is_empty() {
                    Err(PortError::Upstream {
                        status: None,
                        message: "OpenAI returned an empty reply".to_string(),
                    })
                } else {
                    Ok(content)
                }
            } else {
                Err(PortError::Upstream {
                    status: None,
                    message: "OpenAI response contained no text content".to_string(),
                })
            }
        } else {
            Err(PortError::Upstream {
                status: None,
                message: "OpenAI returned no choices in its response".to_string(),
            })
        }
    }
}

/// API errors carry a caller-useful message (bad model, exhausted quota);
/// everything else is logged here and reported generically.
fn map_openai_error(err: OpenAIError) -> PortError {
    match err {
        OpenAIError::ApiError(api) => PortError::Upstream {
            status: None,
            message: api.message,
        },
        other => {
            warn!("openai request failed: {other}");
            PortError::Upstream {
                status: None,
                message: "OpenAI request failed".to_string(),
            }
        }
    }
}
