//! HTTP API for the EduReel service.
//!
//! # Endpoints
//!
//! - `POST /generate_video/` - Generate a narrated scene video with a quiz
//! - `POST /generate_math_video/` - Same video, lesson-shaped response
//! - `POST /generate_educational_content/` - Generate a slideshow lesson
//! - `POST /chat/` - Send one message to the chat model
//! - `GET /health` - Liveness check
//!
//! # Example
//!
//! ```no_run
//! use edureel_orchestrator::{create_router, AppState, Config};
//! use edureel_providers::Credentials;
//!
//! # async fn example() -> edureel_orchestrator::Result<()> {
//! let config = Config::default();
//! let credentials = Credentials::from_env()?;
//! let router = create_router(AppState::from_config(&config, &credentials)?);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use edureel_media::{MediaTools, SceneRenderer, VideoAssembler};
use edureel_providers::{
    ChatMessage, ChatModel, CloudinaryClient, Credentials, OpenAiChat, OpenAiImages, OpenAiSpeech,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::error::{EdureelError, Result};
use crate::extract::Mcq;
use crate::lesson::{LessonArtifact, LessonPipeline, LessonServices};
use crate::pipeline::{CdnPublisher, ManimProducer, Orchestrator, OrchestratorSettings};
use crate::prompt::PromptBuilder;
use crate::request::GenerationRequest;
use crate::Config;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for `POST /generate_video/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoResponse {
    /// Public URL of the video.
    pub video_url: String,
    /// Quiz questions.
    pub mcqs: Vec<Mcq>,
    /// Video title.
    pub title: String,
}

/// Request body for `POST /chat/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
}

/// Response body for `POST /chat/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The model's reply.
    pub response: String,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub detail: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
pub struct AppState {
    /// Scene video orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Slideshow lesson pipeline.
    pub lessons: Arc<LessonPipeline>,
    /// Chat model used by the passthrough endpoint.
    pub chat: Arc<dyn ChatModel>,
}

impl AppState {
    /// Creates state from already-built pipelines.
    #[must_use]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        lessons: Arc<LessonPipeline>,
        chat: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            orchestrator,
            lessons,
            chat,
        }
    }

    /// Builds the hosted-service clients and both pipelines from configuration.
    ///
    /// # Errors
    ///
    /// Returns a provider error if an HTTP client cannot be built.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self> {
        let key = &credentials.openai_api_key;
        let chat: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(
            key,
            &config.llm.model,
            &config.llm.base_url,
            config.llm.temperature,
        )?);
        let images = Arc::new(OpenAiImages::new(
            key,
            &config.images.model,
            &config.images.size,
            &config.llm.base_url,
        )?);
        let speech = Arc::new(OpenAiSpeech::new(
            key,
            &config.speech.model,
            &config.speech.voice,
            &config.llm.base_url,
        )?);
        let host = Arc::new(CloudinaryClient::new(
            &credentials.cloudinary_cloud_name,
            &credentials.cloudinary_api_key,
            &credentials.cloudinary_api_secret,
            &config.cdn.base_url,
        )?);

        let tools = MediaTools::new(&config.assembly.ffmpeg, &config.assembly.ffprobe);
        let renderer = SceneRenderer::new(
            &config.render.command,
            &config.render.scene_name,
            config.render.quality,
        );
        let work_dir = PathBuf::from(&config.work_dir);

        let orchestrator = Orchestrator::new(
            chat.clone(),
            Arc::new(ManimProducer::new(renderer, speech.clone(), tools.clone())),
            Arc::new(CdnPublisher::new(host.clone())),
            OrchestratorSettings {
                work_dir: work_dir.clone(),
                max_retries: config.max_retries,
                keep_on_failure: config.cleanup.keep_on_failure,
                scene_name: config.render.scene_name.clone(),
            },
        );

        let lessons = LessonPipeline::new(
            LessonServices {
                chat: chat.clone(),
                images,
                speech,
                assembler: Arc::new(VideoAssembler::new(
                    tools,
                    config.assembly.images_per_audio,
                    config.assembly.fps,
                )),
                host,
            },
            PromptBuilder::new(config.render.scene_name.clone()),
            work_dir,
            config.cleanup.keep_on_failure,
        );

        Ok(Self::new(Arc::new(orchestrator), Arc::new(lessons), chat))
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Error type for API handlers.
#[derive(Debug)]
struct ApiError(EdureelError);

impl From<EdureelError> for ApiError {
    fn from(err: EdureelError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        warn!(status = status.as_u16(), error = %self.0, "Request failed");
        let body = Json(ErrorResponse {
            detail: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all endpoints, permissive CORS and request
/// tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/generate_video/", post(handle_generate_video))
        .route("/generate_math_video/", post(handle_generate_math_video))
        .route("/generate_educational_content/", post(handle_generate_educational_content))
        .route("/chat/", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `POST /generate_video/`.
async fn handle_generate_video(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerationRequest>,
) -> std::result::Result<Json<VideoResponse>, ApiError> {
    info!(topic = request.topic(), grade = request.grade, "Video requested");
    let artifact = state.orchestrator.generate(&request).await?;

    Ok(Json(VideoResponse {
        video_url: artifact.video_url,
        mcqs: artifact.mcqs,
        title: artifact.title,
    }))
}

/// Handler for `POST /generate_math_video/`.
///
/// Runs the scene orchestrator but answers in the lesson response shape.
async fn handle_generate_math_video(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerationRequest>,
) -> std::result::Result<Json<LessonArtifact>, ApiError> {
    info!(topic = request.topic(), grade = request.grade, "Math video requested");
    let artifact = state.orchestrator.generate(&request).await?;

    Ok(Json(LessonArtifact {
        video_title: artifact.title,
        caption: artifact.caption,
        description: request.topic().to_string(),
        thumbnail: String::new(),
        video_link: artifact.video_url,
        mcqs: artifact.mcqs,
    }))
}

/// Handler for `POST /generate_educational_content/`.
async fn handle_generate_educational_content(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerationRequest>,
) -> std::result::Result<Json<LessonArtifact>, ApiError> {
    info!(topic = request.topic(), grade = request.grade, "Lesson requested");
    Ok(Json(state.lessons.run(&request).await?))
}

/// Handler for `POST /chat/`.
async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(EdureelError::bad_request("message must not be empty").into());
    }

    let response = state
        .chat
        .complete(&[ChatMessage::user(request.message)])
        .await
        .map_err(EdureelError::from)?;
    Ok(Json(ChatResponse { response }))
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
