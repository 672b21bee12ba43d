//! Universal types for provider interactions.
//!
//! These types isolate the relay's HTTP surface from the specific
//! provider APIs: callers speak in `Message` lists and receive the same
//! `Envelope` shape no matter which provider served the request.

use serde::{Deserialize, Serialize};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Caller-tunable generation parameters.
///
/// Fields the caller leaves unset are omitted from DeepSeek requests and
/// defaulted by the Gemini adapter. Sampling knobs beyond these two are
/// provider-fixed and not caller-controllable.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// The uniform response shape exposed to callers regardless of which
/// provider served the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Envelope {
    /// Build an envelope around a single assistant reply.
    pub fn single(content: String, finish_reason: Option<String>, usage: Option<Usage>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChoiceMessage {
                    role: Role::Assistant,
                    content,
                },
                finish_reason,
            }],
            usage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub role: Role,
    pub content: String,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub total_tokens: u32,
}
