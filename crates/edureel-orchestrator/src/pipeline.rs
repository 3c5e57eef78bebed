//! The generation-retry orchestrator.
//!
//! One request runs through up to `max_retries` attempts. Each attempt asks
//! the chat model for a reply, extracts the scene code, narration and quiz,
//! and produces a narrated video. Any failure in those stages is recorded
//! and the next attempt's prompt carries the error and the last code seen.
//! Publishing happens once, after an attempt succeeds, and is never retried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use edureel_media::{JobWorkspace, MediaTools, NarrationClip, SceneRenderer};
use edureel_providers::{ChatModel, MediaHost, ResourceKind, SpeechSynthesizer};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::attempt::{GenerationStage, GenerationState};
use crate::error::{EdureelError, Result};
use crate::extract::{extract_payload, salvage_code, ExtractedPayload, Mcq};
use crate::prompt::PromptBuilder;
use crate::request::GenerationRequest;

// ============================================================================
// Collaborator traits
// ============================================================================

/// Turns an extracted payload into a finished video file.
#[async_trait]
pub trait VideoProducer: Send + Sync {
    /// Produces the video inside `workspace` and returns its path.
    async fn produce(
        &self,
        workspace: &JobWorkspace,
        payload: &ExtractedPayload,
    ) -> Result<PathBuf>;
}

/// Publishes a finished video.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Uploads `video` and returns its public URL.
    async fn publish(&self, video: &Path) -> Result<String>;
}

/// [`Publisher`] backed by a [`MediaHost`].
pub struct CdnPublisher {
    host: Arc<dyn MediaHost>,
}

impl CdnPublisher {
    /// Publishes through `host`.
    #[must_use]
    pub fn new(host: Arc<dyn MediaHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl Publisher for CdnPublisher {
    async fn publish(&self, video: &Path) -> Result<String> {
        self.host
            .upload(video, ResourceKind::Video)
            .await
            .map_err(|e| EdureelError::upload(e.to_string()))
    }
}

/// [`VideoProducer`] that renders the scene, speaks each narration line and
/// lays the clips over the rendered video at their offsets.
pub struct ManimProducer {
    renderer: SceneRenderer,
    speech: Arc<dyn SpeechSynthesizer>,
    tools: MediaTools,
}

impl ManimProducer {
    /// Creates a producer.
    #[must_use]
    pub fn new(
        renderer: SceneRenderer,
        speech: Arc<dyn SpeechSynthesizer>,
        tools: MediaTools,
    ) -> Self {
        Self {
            renderer,
            speech,
            tools,
        }
    }
}

#[async_trait]
impl VideoProducer for ManimProducer {
    async fn produce(
        &self,
        workspace: &JobWorkspace,
        payload: &ExtractedPayload,
    ) -> Result<PathBuf> {
        let rendered = self
            .renderer
            .render(workspace, &payload.code, &workspace.video_name())
            .await?;
        debug!(
            job = %rendered.job,
            path = %rendered.path.display(),
            lines = payload.narration.len(),
            "Narrating rendered scene"
        );

        let mut clips = Vec::with_capacity(payload.narration.len());
        for (n, line) in payload.narration.iter().enumerate() {
            let path = self.speech.synthesize(&line.text, &workspace.audio_path(n)).await?;
            clips.push(NarrationClip {
                path,
                offset_seconds: line.offset_seconds,
            });
        }

        let output = workspace.path(&format!("{}_narrated.mp4", workspace.id()));
        Ok(self.tools.mux_narration(&rendered.path, &clips, &output).await?)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Root directory for job workspaces.
    pub work_dir: PathBuf,
    /// Attempt budget, at least 1.
    pub max_retries: u32,
    /// Keep the job workspace when every attempt failed.
    pub keep_on_failure: bool,
    /// Scene class the generated code must define.
    pub scene_name: String,
}

/// A published lesson video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArtifact {
    /// Public URL of the video.
    pub video_url: String,
    /// Quiz questions.
    pub mcqs: Vec<Mcq>,
    /// Video title.
    pub title: String,
    /// Narration text.
    pub caption: String,
}

struct AttemptFailure {
    code: Option<String>,
    error: EdureelError,
}

impl AttemptFailure {
    fn new(code: Option<String>, error: impl Into<EdureelError>) -> Self {
        Self {
            code,
            error: error.into(),
        }
    }
}

/// Runs the generation-retry loop.
pub struct Orchestrator {
    chat: Arc<dyn ChatModel>,
    producer: Arc<dyn VideoProducer>,
    publisher: Arc<dyn Publisher>,
    prompts: PromptBuilder,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatModel>,
        producer: Arc<dyn VideoProducer>,
        publisher: Arc<dyn Publisher>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            chat,
            producer,
            publisher,
            prompts: PromptBuilder::new(settings.scene_name.clone()),
            settings,
        }
    }

    /// Generates, publishes and returns a lesson for `request`.
    ///
    /// # Errors
    ///
    /// - `BadRequest` if the topic is blank
    /// - `Upload` if publishing fails
    /// - `ExhaustedRetries` if every attempt failed
    pub async fn generate(&self, request: &GenerationRequest) -> Result<PublishedArtifact> {
        request.validate()?;

        let workspace = JobWorkspace::create(&self.settings.work_dir).await?;
        let job = workspace.id();
        let mut state = GenerationState::new(self.settings.max_retries.max(1));
        info!(
            job = %job,
            topic = request.topic(),
            max_attempts = state.max_attempts,
            "Starting generation"
        );

        loop {
            let span = info_span!("attempt", job = %job, attempt = state.attempt);
            let outcome = self
                .run_attempt(&workspace, request, &mut state)
                .instrument(span)
                .await;

            match outcome {
                Ok((payload, video)) => {
                    return self.publish(&workspace, &mut state, request, payload, &video).await;
                }
                Err(failure) => {
                    warn!(
                        job = %job,
                        attempt = state.attempt,
                        stage = %state.stage,
                        error = %failure.error,
                        "Attempt failed"
                    );

                    if !failure.error.is_retryable() {
                        self.discard_failed(&workspace).await;
                        return Err(failure.error);
                    }

                    state.fail(failure.code, failure.error.to_string())?;
                    if !state.retry_or_exhaust()? {
                        self.discard_failed(&workspace).await;
                        let last_error = state.history.last_error().unwrap_or_default().to_string();
                        return Err(EdureelError::exhausted(state.attempt + 1, last_error));
                    }
                }
            }
        }
    }

    async fn run_attempt(
        &self,
        workspace: &JobWorkspace,
        request: &GenerationRequest,
        state: &mut GenerationState,
    ) -> std::result::Result<(ExtractedPayload, PathBuf), AttemptFailure> {
        info!("Drafting");
        let messages = self.prompts.build_attempt_prompt(request, &state.history);
        let reply = self
            .chat
            .complete(&messages)
            .await
            .map_err(|e| AttemptFailure::new(None, e))?;

        state
            .advance(GenerationStage::Extracting)
            .map_err(|e| AttemptFailure::new(None, e))?;
        let payload =
            extract_payload(&reply).map_err(|e| AttemptFailure::new(salvage_code(&reply), e))?;
        info!(
            narration_lines = payload.narration.len(),
            questions = payload.questions.len(),
            "Reply extracted"
        );

        state
            .advance(GenerationStage::Rendering)
            .map_err(|e| AttemptFailure::new(Some(payload.code.clone()), e))?;
        let video = self
            .producer
            .produce(workspace, &payload)
            .await
            .map_err(|e| AttemptFailure::new(Some(payload.code.clone()), e))?;
        info!(video = %video.display(), "Video produced");

        Ok((payload, video))
    }

    async fn publish(
        &self,
        workspace: &JobWorkspace,
        state: &mut GenerationState,
        request: &GenerationRequest,
        payload: ExtractedPayload,
        video: &Path,
    ) -> Result<PublishedArtifact> {
        state.advance(GenerationStage::Publishing)?;
        let video_url = match self.publisher.publish(video).await {
            Ok(url) => url,
            Err(e) => {
                warn!(job = %workspace.id(), error = %e, "Publishing failed");
                self.discard_failed(workspace).await;
                return Err(e);
            }
        };
        state.advance(GenerationStage::Done)?;
        workspace.cleanup().await;

        info!(
            job = %workspace.id(),
            url = %video_url,
            attempts = state.attempt + 1,
            "Generation complete"
        );
        Ok(PublishedArtifact {
            video_url,
            caption: payload.caption(),
            mcqs: payload.questions,
            title: request.topic().to_string(),
        })
    }

    async fn discard_failed(&self, workspace: &JobWorkspace) {
        if self.settings.keep_on_failure {
            info!(
                job = %workspace.id(),
                dir = %workspace.dir().display(),
                "Keeping job workspace for inspection"
            );
        } else {
            workspace.cleanup().await;
        }
    }
}
