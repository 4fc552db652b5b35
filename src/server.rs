//! HTTP server exposing generation, lookup and prompt helpers.
//!
//! Routes:
//! - `GET /` and `GET /generator`: front-end pages from the static directory
//! - `POST /generate`: enrich, fetch from the provider, decode, store
//! - `GET /status/:id`: always `completed` once the id exists
//! - `GET /image/:id`: stored PNG bytes
//! - `POST /enhance`: append fixed quality descriptors
//! - `POST /suggestions`: three random tips

use crate::error::{GenStudioError, Result};
use crate::image::{GenerationRequest, ImageFormat, ImageProvider};
use crate::prompt;
use crate::store::{
    ArtifactStore, GenerationRecord, GenerationStatus, IMAGE_FILE_NOT_FOUND, IMAGE_NOT_FOUND,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Default directory holding `home.html` and `index.html`.
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Landing page file name.
const HOME_PAGE: &str = "home.html";
/// Generator page file name.
const GENERATOR_PAGE: &str = "index.html";

/// Prompt prefix length kept in logs.
const LOG_PROMPT_CHARS: usize = 50;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn ImageProvider>,
    store: Arc<ArtifactStore>,
    rng: Arc<Mutex<StdRng>>,
    static_dir: PathBuf,
}

impl AppState {
    /// Creates state around a provider and store, with an entropy-seeded RNG.
    pub fn new(provider: Arc<dyn ImageProvider>, store: Arc<ArtifactStore>) -> Self {
        Self {
            provider,
            store,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }

    /// Replaces the suggestion RNG, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Arc::new(Mutex::new(rng));
        self
    }

    /// Sets the directory the front-end pages are read from.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }
}

/// Builds the router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/generator", get(generator_page))
        .route("/generate", post(generate))
        .route("/status/:id", get(status))
        .route("/image/:id", get(fetch_image))
        .route("/enhance", post(enhance))
        .route("/suggestions", post(suggestions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves until Ctrl-C.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install Ctrl-C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// JSON error body `{"error": message}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Wraps a `/generate` failure. Every kind is a 500 there.
    fn generation(err: impl std::fmt::Display) -> Self {
        Self::internal(format!("Image generation failed: {err}"))
    }
}

impl From<GenStudioError> for ApiError {
    fn from(err: GenStudioError) -> Self {
        let status = if err.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// `POST /generate` body.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    /// User prompt; required.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Style key; defaults to `cinematic`.
    #[serde(default)]
    pub style: Option<String>,
}

/// `POST /generate` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Id for later `/status` and `/image` lookups.
    pub operation_id: String,
    /// Always `completed`.
    pub status: GenerationStatus,
    /// Relative URL of the stored image.
    pub image_url: String,
}

/// `GET /status/:id` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always `completed`.
    pub status: GenerationStatus,
    /// Relative URL of the stored image.
    pub image_url: String,
}

/// `POST /enhance` body.
#[derive(Debug, Deserialize)]
pub struct EnhanceBody {
    /// Prompt to enhance; missing means empty.
    #[serde(default)]
    pub prompt: String,
}

/// `POST /enhance` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnhanceResponse {
    /// Prompt followed by the quality descriptors.
    pub enhanced_prompt: String,
}

/// `POST /suggestions` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    /// Three distinct tips.
    pub suggestions: Vec<String>,
}

async fn home_page(State(state): State<AppState>) -> std::result::Result<Html<String>, ApiError> {
    read_page(&state, HOME_PAGE).await
}

async fn generator_page(
    State(state): State<AppState>,
) -> std::result::Result<Html<String>, ApiError> {
    read_page(&state, GENERATOR_PAGE).await
}

async fn read_page(state: &AppState, name: &str) -> std::result::Result<Html<String>, ApiError> {
    let path = state.static_dir.join(name);
    tokio::fs::read_to_string(&path)
        .await
        .map(Html)
        .map_err(|e| {
            tracing::error!(path = %path.display(), "failed to read page: {e}");
            ApiError::internal(format!("{}: {e}", path.display()))
        })
}

async fn generate(
    State(state): State<AppState>,
    body: std::result::Result<Json<GenerateBody>, JsonRejection>,
) -> std::result::Result<Json<GenerateResponse>, ApiError> {
    let Json(body) = body.map_err(|e| {
        tracing::error!("rejected generate body: {e}");
        ApiError::generation(e.body_text())
    })?;

    let record = run_generation(&state, body).await.map_err(|e| {
        tracing::error!("image generation failed: {e}");
        ApiError::generation(e)
    })?;

    tracing::info!(id = %record.id, path = %record.file_path.display(), "image saved");

    Ok(Json(GenerateResponse {
        image_url: record.image_url(),
        operation_id: record.id,
        status: record.status,
    }))
}

async fn run_generation(
    state: &AppState,
    body: GenerateBody,
) -> Result<GenerationRecord> {
    let prompt = body
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| GenStudioError::Validation("prompt is required".into()))?;
    let style = body.style.unwrap_or_else(|| prompt::DEFAULT_STYLE.to_string());

    let preview: String = prompt.chars().take(LOG_PROMPT_CHARS).collect();
    tracing::info!(prompt = %preview, style = %style, "generating image");

    let request = GenerationRequest::new(prompt::enrich(&prompt, &style));
    let image = state.provider.generate(&request).await?;
    tracing::debug!(
        provider = %image.provider,
        size_bytes = image.size(),
        format = image.format.extension(),
        "received image"
    );

    let store = state.store.clone();
    tokio::task::spawn_blocking(move || {
        let decoded = image.decode()?;
        store.save(&prompt, &decoded)
    })
    .await
    .map_err(|e| GenStudioError::Io(std::io::Error::other(e)))?
}

async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Json<StatusResponse>, ApiError> {
    let record = state
        .store
        .get(&id)
        .ok_or_else(|| GenStudioError::NotFound(IMAGE_NOT_FOUND.into()))?;

    Ok(Json(StatusResponse {
        status: record.status,
        image_url: record.image_url(),
    }))
}

async fn fetch_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> std::result::Result<Response, ApiError> {
    let record = state.store.locate(&id)?;

    // The file can vanish between the existence check and the read.
    let bytes = tokio::fs::read(&record.file_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GenStudioError::NotFound(IMAGE_FILE_NOT_FOUND.into())
        } else {
            GenStudioError::Io(e)
        }
    })?;

    Ok(([(header::CONTENT_TYPE, ImageFormat::Png.mime_type())], bytes).into_response())
}

async fn enhance(
    body: std::result::Result<Json<EnhanceBody>, JsonRejection>,
) -> std::result::Result<Json<EnhanceResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::internal(e.body_text()))?;

    Ok(Json(EnhanceResponse {
        enhanced_prompt: prompt::enhance(&body.prompt),
    }))
}

async fn suggestions(State(state): State<AppState>) -> Json<SuggestionsResponse> {
    let picked = {
        let mut rng = state.rng.lock().unwrap_or_else(PoisonError::into_inner);
        prompt::suggest(&mut *rng)
    };

    Json(SuggestionsResponse {
        suggestions: picked.into_iter().map(String::from).collect(),
    })
}
