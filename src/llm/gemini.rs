//! Gemini provider (text and image generation).
//!
//! Gemini's wire format differs from the generic one on every axis that
//! matters here: roles are `user`/`model` with no system role, parameters
//! live under `generationConfig` with different names, and replies come
//! back as `candidates[].content.parts[]`. This adapter converts both
//! directions and also carries the image endpoint, where a reference
//! image travels inline as a base64 part.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{map_send_error, unparseable_body, upstream_failure, TextProvider};
use super::types::{Envelope, GenerationParams, Message, Role, Usage};
use crate::error::ApiError;

/// Sampling is provider-fixed; callers control temperature and the token
/// cap only.
const TOP_P: f32 = 0.95;
const TOP_K: u32 = 40;

/// Defaults applied when the caller leaves the knobs unset.
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Gemini provider configuration and state.
///
/// One struct serves both the text model and the image model; they share
/// the endpoint scheme and differ only in model id and response handling.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl GeminiProvider {
    pub fn new(base_url: String, text_model: String, image_model: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            text_model,
            image_model,
        }
    }

    fn endpoint(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, api_key
        )
    }

    async fn post(
        &self,
        url: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiError> {
        // No client timeout here: image generation regularly outlives any
        // bound that would be safe for text.
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream_failure(response).await);
        }

        let body = response.text().await.map_err(map_send_error)?;
        serde_json::from_str(&body).map_err(|_| unparseable_body(status.as_u16()))
    }

    /// Relay one image generation. Returns the image as a data-URL.
    pub async fn generate_image(
        &self,
        api_key: &str,
        prompt: &str,
        reference_image: Option<&str>,
    ) -> Result<String, ApiError> {
        let request = build_image_request(prompt, reference_image);
        let url = self.endpoint(&self.image_model, api_key);
        let response = self.post(&url, &request).await?;

        first_image(&response).ok_or(ApiError::NoImageGenerated)
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    async fn generate(
        &self,
        api_key: &str,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<Envelope, ApiError> {
        let request = build_text_request(messages, params);
        let url = self.endpoint(&self.text_model, api_key);
        let response = self.post(&url, &request).await?;

        let (text, finish_reason) = first_text(&response).ok_or(ApiError::EmptyGeneration)?;
        let usage = response
            .usage_metadata
            .and_then(|u| u.total_token_count)
            .map(|total_tokens| Usage { total_tokens });

        Ok(Envelope::single(text, finish_reason, usage))
    }
}

// -----------------------------------------------------------------------------
// Request construction
// -----------------------------------------------------------------------------

fn build_text_request(messages: &[Message], params: &GenerationParams) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: to_gemini_contents(messages),
        generation_config: GenerationConfig {
            temperature: Some(params.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            max_output_tokens: Some(params.max_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS)),
            top_p: Some(TOP_P),
            top_k: Some(TOP_K),
            response_modalities: None,
        },
    }
}

fn build_image_request(prompt: &str, reference_image: Option<&str>) -> GenerateContentRequest {
    let mut parts = vec![Part::text(prompt)];
    if let Some(raw) = reference_image {
        match parse_data_url(raw) {
            Some(inline) => parts.push(Part::inline(inline)),
            // Behavioral choice: an unusable reference never fails the
            // request; the prompt still goes out on its own.
            None => eprintln!("Ignoring reference image: not a data:<mime>;base64,<data> URL"),
        }
    }

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: None,
            max_output_tokens: None,
            top_p: None,
            top_k: None,
            response_modalities: Some(vec!["TEXT", "IMAGE"]),
        },
    }
}

/// Convert the generic conversation into Gemini `contents`.
///
/// Gemini has no system role: a leading system message is folded into the
/// user message that follows it, and a system message with no user turn
/// after it is emitted as a user turn so instruction text is never
/// dropped. Assistant turns become role `model`.
fn to_gemini_contents(messages: &[Message]) -> Vec<Content> {
    let mut contents = Vec::with_capacity(messages.len());
    let mut pending_system: Option<String> = None;

    for msg in messages {
        match msg.role {
            Role::System => match pending_system.as_mut() {
                Some(buffer) => {
                    buffer.push_str("\n\n");
                    buffer.push_str(&msg.content);
                }
                None => pending_system = Some(msg.content.clone()),
            },
            Role::User => {
                let text = match pending_system.take() {
                    Some(system) => format!("{}\n\n{}", system, msg.content),
                    None => msg.content.clone(),
                };
                contents.push(Content::user(text));
            }
            Role::Assistant => contents.push(Content::model(msg.content.clone())),
        }
    }

    if let Some(system) = pending_system {
        contents.push(Content::user(system));
    }

    contents
}

/// Parse a `data:<mime>;base64,<payload>` URL into an inline part.
///
/// Returns `None` for anything that doesn't match the pattern, including
/// payloads that aren't valid base64.
fn parse_data_url(raw: &str) -> Option<InlineData> {
    let rest = raw.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    if mime.is_empty() || payload.is_empty() {
        return None;
    }
    BASE64.decode(payload).ok()?;

    Some(InlineData {
        mime_type: mime.to_string(),
        data: payload.to_string(),
    })
}

// -----------------------------------------------------------------------------
// Response unwrapping
// -----------------------------------------------------------------------------

/// Extract the generated text and finish reason from the first candidate.
fn first_text(response: &GenerateContentResponse) -> Option<(String, Option<String>)> {
    let candidate = response.candidates.as_deref()?.first()?;
    let text = candidate
        .content
        .as_ref()?
        .parts
        .first()?
        .text
        .clone()
        .filter(|t| !t.is_empty())?;

    Some((text, candidate.finish_reason.clone()))
}

/// Find the first image part in any candidate and re-wrap it as a data-URL.
fn first_image(response: &GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.inline_data.as_ref())
        .find(|d| d.mime_type.starts_with("image/"))
        .map(|d| format!("data:{};base64,{}", d.mime_type, d.data))
}

// -----------------------------------------------------------------------------
// Gemini DTOs (Data Transfer Objects)
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: String) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    fn model(text: String) -> Self {
        Self {
            role: Some("model".to_string()),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(inline_data: InlineData) -> Self {
        Self {
            text: None,
            inline_data: Some(inline_data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_system_merges_into_next_user_turn() {
        let messages = vec![Message::system("S"), Message::user("U")];
        let contents = to_gemini_contents(&messages);

        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[0].parts[0].text.as_deref(), Some("S\n\nU"));
    }

    #[test]
    fn test_assistant_becomes_model_role() {
        let messages = vec![
            Message::user("draw a robot"),
            Message::assistant("done"),
            Message::user("now a cat"),
        ];
        let contents = to_gemini_contents(&messages);

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[2].parts[0].text.as_deref(), Some("now a cat"));
    }

    #[test]
    fn test_unpaired_system_message_becomes_user_turn() {
        let messages = vec![Message::system("only instructions")];
        let contents = to_gemini_contents(&messages);

        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(
            contents[0].parts[0].text.as_deref(),
            Some("only instructions")
        );
    }

    #[test]
    fn test_text_request_fixes_sampling() {
        let messages = vec![Message::user("hi")];
        let params = GenerationParams {
            temperature: Some(0.5),
            max_tokens: Some(100),
        };
        let value = serde_json::to_value(build_text_request(&messages, &params)).unwrap();

        let config = &value["generationConfig"];
        assert_eq!(config["temperature"], 0.5);
        assert_eq!(config["maxOutputTokens"], 100);
        assert!((config["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);
        assert_eq!(config["topK"], 40);
    }

    #[test]
    fn test_text_request_defaults_unset_params() {
        let messages = vec![Message::user("hi")];
        let value =
            serde_json::to_value(build_text_request(&messages, &GenerationParams::default()))
                .unwrap();

        let config = &value["generationConfig"];
        assert!((config["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(config["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_parse_data_url() {
        let inline = parse_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "aGVsbG8=");
    }

    #[test]
    fn test_parse_data_url_rejects_bad_input() {
        assert!(parse_data_url("https://example.com/cat.png").is_none());
        assert!(parse_data_url("data:image/png;base64,").is_none());
        assert!(parse_data_url("data:;base64,aGVsbG8=").is_none());
        assert!(parse_data_url("data:image/png,aGVsbG8=").is_none());
        assert!(parse_data_url("data:image/png;base64,!!not-base64!!").is_none());
    }

    #[test]
    fn test_invalid_reference_image_is_dropped_not_fatal() {
        let request = build_image_request("a hero shot", Some("not-a-data-url"));

        assert_eq!(request.contents.len(), 1);
        let parts = &request.contents[0].parts;
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].text.as_deref(), Some("a hero shot"));
        assert!(parts[0].inline_data.is_none());
    }

    #[test]
    fn test_valid_reference_image_rides_along() {
        let request =
            build_image_request("same style", Some("data:image/jpeg;base64,aGVsbG8="));

        let parts = &request.contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[1].inline_data.as_ref().unwrap().mime_type,
            "image/jpeg"
        );
    }

    #[test]
    fn test_first_text_unwraps_candidate() {
        let raw = r#"{
            "candidates": [
                {
                    "content": { "role": "model", "parts": [{ "text": "Page one." }] },
                    "finishReason": "STOP"
                }
            ],
            "usageMetadata": { "totalTokenCount": 17 }
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();

        let (text, finish) = first_text(&response).unwrap();
        assert_eq!(text, "Page one.");
        assert_eq!(finish.as_deref(), Some("STOP"));
        assert_eq!(response.usage_metadata.unwrap().total_token_count, Some(17));
    }

    #[test]
    fn test_first_text_empty_candidates() {
        let response: GenerateContentResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(first_text(&response).is_none());

        let response: GenerateContentResponse =
            serde_json::from_str(r#"{ "candidates": [] }"#).unwrap();
        assert!(first_text(&response).is_none());
    }

    #[test]
    fn test_first_image_skips_text_parts() {
        let raw = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "here you go" },
                            { "inlineData": { "mimeType": "image/png", "data": "aW1n" } }
                        ]
                    }
                }
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(
            first_image(&response).unwrap(),
            "data:image/png;base64,aW1n"
        );
    }

    #[test]
    fn test_first_image_none_when_only_text() {
        let raw = r#"{
            "candidates": [
                { "content": { "parts": [{ "text": "no image today" }] } }
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert!(first_image(&response).is_none());
    }
}
