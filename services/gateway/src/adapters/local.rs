//! services/gateway/src/adapters/local.rs
//!
//! This module contains the adapter for a local Ollama-style model server.
//! It implements the `ChatCompletionService` port from the `core` crate
//! over the server's native chat API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use reading_journal_core::ports::{ChatCompletionService, ChatPrompt, PortError, PortResult};

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` against a local
/// Ollama-style server. The base URL comes from the validated request, so
/// every instance is built per request.
#[derive(Clone)]
pub struct LocalChatAdapter {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl LocalChatAdapter {
    /// Creates a new `LocalChatAdapter`. `base_url` must already be
    /// validated and carry no trailing slash.
    pub fn new(http: reqwest::Client, base_url: String, model: String) -> Self {
        Self {
            http,
            base_url,
            model,
        }
    }
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for LocalChatAdapter {
    async fn complete(&self, prompt: &ChatPrompt) -> PortResult<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: prompt.temperature,
            },
        };

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("local provider request failed: {e}");
                return Err(PortError::Upstream {
                    status: None,
                    message: "local provider request failed".to_string(),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text).unwrap_or_else(|| {
                format!("local provider request failed ({})", status.as_u16())
            });
            return Err(PortError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed: ChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("failed to parse local provider response: {e}");
                return Err(PortError::Upstream {
                    status: None,
                    message: "local provider returned an unreadable response".to_string(),
                });
            }
        };

        let content = parsed.message.map(|m| m.content).unwrap_or_default();
        if content.trim().is_empty() {
            return Err(PortError::Upstream {
                status: None,
                message: "local provider returned an empty reply".to_string(),
            });
        }
        Ok(content)
    }
}

/// Pulls the message out of an Ollama-style `{"error": "..."}` body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value.get("error")?.as_str()?.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_surface_their_message() {
        assert_eq!(
            error_message(r#"{"error":"model 'nope' not found"}"#),
            Some("model 'nope' not found".to_string())
        );
    }

    #[test]
    fn unreadable_error_bodies_are_ignored() {
        assert_eq!(error_message("<html>502 Bad Gateway</html>"), None);
        assert_eq!(error_message(r#"{"error":""}"#), None);
        assert_eq!(error_message(r#"{"error":42}"#), None);
        assert_eq!(error_message(""), None);
    }

    #[test]
    fn request_bodies_serialize_with_streaming_disabled() {
        let body = ChatRequest {
            model: "llama3.1",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            stream: false,
            options: ChatOptions { temperature: 0.2 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["stream"], serde_json::json!(false));
        let temperature = value["options"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
