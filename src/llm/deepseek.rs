//! DeepSeek provider.
//!
//! DeepSeek speaks the OpenAI chat-completion dialect, so the generic
//! message list goes over the wire unchanged and the response already has
//! the envelope shape. The outbound call is bounded by a fixed client
//! timeout; story generation can take minutes on long prompts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{map_send_error, unparseable_body, upstream_failure, TextProvider};
use super::types::{Choice, ChoiceMessage, Envelope, GenerationParams, Message, Role, Usage};
use crate::error::ApiError;

/// DeepSeek provider configuration and state.
pub struct DeepSeekProvider {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl DeepSeekProvider {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url,
            model,
            timeout,
        }
    }
}

#[async_trait]
impl TextProvider for DeepSeekProvider {
    async fn generate(
        &self,
        api_key: &str,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<Envelope, ApiError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream_failure(response).await);
        }

        let body = response.text().await.map_err(map_send_error)?;
        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|_| unparseable_body(status.as_u16()))?;

        Ok(chat_response.into())
    }
}

// -----------------------------------------------------------------------------
// DeepSeek DTOs (Data Transfer Objects)
// -----------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    total_tokens: u32,
}

impl From<ChatResponse> for Envelope {
    fn from(response: ChatResponse) -> Self {
        Self {
            choices: response
                .choices
                .into_iter()
                .map(|c| Choice {
                    message: ChoiceMessage {
                        role: Role::Assistant,
                        content: c.message.content,
                    },
                    finish_reason: c.finish_reason,
                })
                .collect(),
            usage: response.usage.map(|u| Usage {
                total_tokens: u.total_tokens,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_params() {
        let messages = vec![Message::user("draw me a hero")];
        let request = ChatRequest {
            model: "deepseek-chat",
            messages: &messages,
            temperature: None,
            max_tokens: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("temperature").is_none());
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_request_passes_caller_params() {
        let messages = vec![Message::user("hi")];
        let request = ChatRequest {
            model: "deepseek-chat",
            messages: &messages,
            temperature: Some(0.5),
            max_tokens: Some(256),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["temperature"], 0.5);
        assert_eq!(value["max_tokens"], 256);
    }

    #[test]
    fn test_response_maps_to_envelope() {
        let raw = r#"{
            "id": "cmpl-1",
            "choices": [
                {
                    "index": 0,
                    "message": { "role": "assistant", "content": "Once upon a panel..." },
                    "finish_reason": "stop"
                }
            ],
            "usage": { "prompt_tokens": 12, "completion_tokens": 30, "total_tokens": 42 }
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let envelope: Envelope = response.into();

        assert_eq!(envelope.choices.len(), 1);
        assert_eq!(envelope.choices[0].message.content, "Once upon a panel...");
        assert_eq!(envelope.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(envelope.usage.unwrap().total_tokens, 42);
    }

    #[test]
    fn test_response_without_usage() {
        let raw = r#"{ "choices": [] }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let envelope: Envelope = response.into();
        assert!(envelope.choices.is_empty());
        assert!(envelope.usage.is_none());
    }
}
