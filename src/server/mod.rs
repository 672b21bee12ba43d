//! HTTP front door.
//!
//! Routes the API surface to the providers and the story store, and
//! serves the built frontend bundle for everything else (single-page-app
//! fallback: unknown paths get the entry document).

pub mod state;

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::Config;
use crate::error::ApiError;
use crate::llm::{
    DeepSeekProvider, Envelope, GeminiProvider, GenerationParams, Message, TextProvider,
};
use crate::store::{FileStore, StoryRecord};

pub use state::AppState;

// Reference images travel as base64 in JSON bodies, so the limit is
// generous.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TextGenRequest {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl TextGenRequest {
    fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageGenRequest {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(rename = "referenceImage")]
    pub reference_image: Option<String>,
}

/// Reject before anything leaves the process: no key, no outbound call.
fn require_key(api_key: Option<&str>) -> Result<&str, ApiError> {
    api_key
        .filter(|key| !key.is_empty())
        .ok_or(ApiError::MissingCredential)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn relay_text(
    provider: &dyn TextProvider,
    request: TextGenRequest,
) -> Result<Json<Envelope>, ApiError> {
    let key = require_key(request.api_key.as_deref())?;
    let envelope = provider
        .generate(key, &request.messages, &request.params())
        .await?;
    Ok(Json(envelope))
}

async fn deepseek_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextGenRequest>,
) -> Result<Json<Envelope>, ApiError> {
    relay_text(&state.deepseek, request).await
}

async fn gemini_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextGenRequest>,
) -> Result<Json<Envelope>, ApiError> {
    relay_text(&state.gemini, request).await
}

async fn gemini_image(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageGenRequest>,
) -> Result<Json<Value>, ApiError> {
    let key = require_key(request.api_key.as_deref())?;
    let image_data = state
        .gemini
        .generate_image(key, &request.prompt, request.reference_image.as_deref())
        .await?;

    Ok(Json(json!({ "success": true, "imageData": image_data })))
}

async fn list_stories(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stories = state.store.list_all();
    Json(json!({ "success": true, "stories": stories }))
}

async fn get_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.store.get(&id) {
        Some(story) => Ok(Json(json!({ "success": true, "story": story }))),
        None => Err(ApiError::NotFound("Story".to_string())),
    }
}

async fn save_story(
    State(state): State<Arc<AppState>>,
    Json(record): Json<StoryRecord>,
) -> Result<Json<Value>, ApiError> {
    if record.id.is_empty() {
        return Err(ApiError::Validation("Story id is required".to_string()));
    }

    state
        .store
        .upsert(record)
        .map_err(|err| ApiError::StorageWrite(err.to_string()))?;
    Ok(Json(json!({ "success": true, "message": "Story saved" })))
}

async fn delete_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let removed = state
        .store
        .delete(&id)
        .map_err(|err| ApiError::StorageWrite(err.to_string()))?;
    if !removed {
        return Err(ApiError::NotFound("Story".to_string()));
    }

    Ok(Json(json!({ "success": true, "message": "Story deleted" })))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Router and startup
// ─────────────────────────────────────────────────────────────────────────────

/// Build the full application router: API under `/api`, everything else
/// falls through to the static frontend with the entry document as the
/// not-found page.
pub fn router(state: Arc<AppState>, static_dir: &FsPath) -> Router {
    let api = Router::new()
        .route("/deepseek", post(deepseek_text))
        .route("/gemini-text", post(gemini_text))
        .route("/gemini", post(gemini_image))
        .route("/stories", get(list_stories).post(save_story))
        .route("/stories/:id", get(get_story).delete(delete_story))
        .route("/health", get(health))
        .with_state(state);

    let frontend =
        ServeDir::new(static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .nest("/api", api)
        .fallback_service(frontend)
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// Run the relay server until the process is stopped.
pub async fn serve(config: Config, port: u16) -> Result<()> {
    let providers = &config.providers;
    let state = Arc::new(AppState {
        deepseek: DeepSeekProvider::new(
            providers.deepseek_base_url.clone(),
            providers.deepseek_model.clone(),
            Duration::from_secs(providers.deepseek_timeout_secs),
        ),
        gemini: GeminiProvider::new(
            providers.gemini_base_url.clone(),
            providers.gemini_text_model.clone(),
            providers.gemini_image_model.clone(),
        ),
        store: Arc::new(FileStore::new(&config.stories_path)),
    });

    let app = router(state, &config.static_dir);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            eprintln!("\nError: Port {} is already in use.", port);
            eprintln!("Try a different port with:");
            eprintln!("  panelsmith serve --port <PORT>\n");
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    println!("Server running on http://localhost:{}", port);
    println!("Stories file: {}", config.stories_path.display());
    println!("Static assets: {}", config.static_dir.display());
    println!("\nAPI Endpoints:");
    println!("  POST   /api/deepseek        - Story text via DeepSeek");
    println!("  POST   /api/gemini-text     - Story text via Gemini");
    println!("  POST   /api/gemini          - Image generation via Gemini");
    println!("  GET    /api/stories         - List saved stories");
    println!("  POST   /api/stories         - Save a story");
    println!("  GET    /api/stories/:id     - Get a story");
    println!("  DELETE /api/stories/:id     - Delete a story");
    println!("  GET    /api/health          - Health check");

    axum::serve(listener, app).await?;
    Ok(())
}
