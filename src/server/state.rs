//! Server application state

use crate::llm::{DeepSeekProvider, GeminiProvider};
use crate::store::SharedStoryStore;

/// Shared application state for all route handlers
pub struct AppState {
    pub deepseek: DeepSeekProvider,
    pub gemini: GeminiProvider,
    pub store: SharedStoryStore,
}
