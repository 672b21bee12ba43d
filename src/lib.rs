//! Panelsmith: backend relay for a browser comic-creation studio.
//!
//! The browser bundle never sees provider API keys: it talks to this
//! server, which forwards story-generation requests to DeepSeek and
//! Gemini, relays image generation with optional reference images, and
//! persists finished stories in a single JSON file on disk.

pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod store;

// Re-export key types
pub use config::Config;
pub use error::ApiError;
pub use llm::{DeepSeekProvider, Envelope, GeminiProvider, GenerationParams, Message, Role, TextProvider};
pub use store::{FileStore, MemoryStore, SharedStoryStore, StoryRecord, StoryStore};
