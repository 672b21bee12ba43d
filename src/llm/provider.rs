//! The provider abstraction.
//!
//! This trait defines the one capability every text backend offers the
//! relay; the concrete adapters (DeepSeek, Gemini) each translate it to
//! their own wire format. The shared helpers below turn reqwest and
//! provider failures into the caller-facing taxonomy the same way for
//! both adapters.

use async_trait::async_trait;

use super::types::{Envelope, GenerationParams, Message};
use crate::error::ApiError;

/// The core trait for text generation.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Relay one chat completion with the caller's API key.
    async fn generate(
        &self,
        api_key: &str,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<Envelope, ApiError>;
}

/// Map a failed outbound send into the taxonomy.
pub(crate) fn map_send_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::UpstreamTimeout
    } else {
        ApiError::UpstreamConnectionLost
    }
}

/// Turn a non-success provider response into an `Upstream` error carrying
/// the provider's status and its best-effort message (the provider's own
/// `error.message` when the body parses as JSON, the raw body otherwise).
pub(crate) async fn upstream_failure(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_owned)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "upstream provider returned an error".to_string()
            } else {
                trimmed.to_string()
            }
        });

    ApiError::Upstream { status, message }
}

/// Error for a success status whose body did not parse as the expected
/// provider shape.
pub(crate) fn unparseable_body(status: u16) -> ApiError {
    ApiError::Upstream {
        status,
        message: "could not parse provider response".to_string(),
    }
}
