//! Provider layer: everything that talks to the generative-AI services.
//!
//! This module handles all interactions with the upstream providers:
//! - Universal request/response types shared by the whole relay
//! - The `TextProvider` abstraction
//! - One adapter per upstream wire format (DeepSeek, Gemini)

pub mod types;
pub mod provider;
pub mod deepseek;
pub mod gemini;

// Re-export key types
pub use types::{Choice, ChoiceMessage, Envelope, GenerationParams, Message, Role, Usage};
pub use provider::TextProvider;
pub use deepseek::DeepSeekProvider;
pub use gemini::GeminiProvider;
