//! services/gateway/src/adapters/anthropic.rs
//!
//! This module contains the adapter for the Anthropic Messages API.
//! It implements the `ChatCompletionService` port from the `core` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use reading_journal_core::ports::{ChatCompletionService, ChatPrompt, PortError, PortResult};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
// Generous ceiling for a question set or a grade sheet.
const MAX_TOKENS: u32 = 4096;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<UserMessage<'a>>,
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` using the Anthropic
/// Messages API. Built per request around the resolved key.
#[derive(Clone)]
pub struct AnthropicChatAdapter {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicChatAdapter {
    /// Creates a new `AnthropicChatAdapter`.
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
        }
    }
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for AnthropicChatAdapter {
    async fn complete(&self, prompt: &ChatPrompt) -> PortResult<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: prompt.temperature,
            system: &prompt.system,
            messages: vec![UserMessage {
                role: "user",
                content: &prompt.user,
            }],
        };

        let response = match self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("anthropic request failed: {e}");
                return Err(PortError::Upstream {
                    status: None,
                    message: "Anthropic request failed".to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text)
                .unwrap_or_else(|| format!("Anthropic request failed ({})", status.as_u16()));
            return Err(PortError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed: MessagesResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("failed to parse anthropic response: {e}");
                return Err(PortError::Upstream {
                    status: None,
                    message: "Anthropic returned an unreadable response".to_string(),
                });
            }
        };

        let content = joined_text(&parsed);
        if content.trim().is_empty() {
            return Err(PortError::Upstream {
                status: None,
                message: "Anthropic returned an empty reply".to_string(),
            });
        }
        Ok(content)
    }
}

/// A reply may split its text across several content blocks; tool-use and
/// thinking blocks carry no text and are skipped.
fn joined_text(response: &MessagesResponse) -> String {
    response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join("")
}

/// Pulls the message out of an `{"error":{"message":"..."}}` body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
