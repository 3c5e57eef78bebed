//! EduReel orchestrator
//!
//! Turns a topic into a published lesson video: drafts scene code, narration
//! and a quiz with a chat model, renders and narrates the scene, retries with
//! error feedback when any stage fails, and serves it all over HTTP.

pub mod api;
pub mod attempt;
pub mod config;
pub mod error;
pub mod extract;
pub mod lesson;
pub mod pipeline;
pub mod prompt;
pub mod request;

pub use api::{
    create_router, AppState, ChatRequest, ChatResponse, ErrorResponse, HealthResponse,
    VideoResponse,
};
pub use attempt::{AttemptHistory, AttemptRecord, GenerationStage, GenerationState};
pub use config::{
    AssemblyConfig, CdnConfig, CleanupConfig, Config, ImageConfig, LlmConfig, RenderConfig,
    SpeechConfig, CONFIG_FILE_NAME,
};
pub use error::{EdureelError, Result};
pub use extract::{
    extract_payload, parse_mcqs, parse_script, parse_timestamp, salvage_code, ExtractedPayload,
    Mcq, NarrationLine,
};
pub use lesson::{
    parse_lesson_reply, LessonArtifact, LessonContent, LessonPipeline, LessonServices,
    SlideshowAssembler,
};
pub use pipeline::{
    CdnPublisher, ManimProducer, Orchestrator, OrchestratorSettings, PublishedArtifact, Publisher,
    VideoProducer,
};
pub use prompt::PromptBuilder;
pub use request::GenerationRequest;
