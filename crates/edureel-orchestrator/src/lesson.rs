//! Slideshow lessons: illustrated scenes with narration.
//!
//! The chat model describes a handful of scenes as JSON. Each scene's
//! description is drawn several times, its narration is spoken once, and the
//! images and clips are assembled into a slideshow that is then published
//! with its first image as thumbnail. Unlike scene rendering, this runs once
//! with no retry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use edureel_media::{JobWorkspace, VideoAssembler};
use edureel_providers::{ChatModel, ImageGenerator, MediaHost, ResourceKind, SpeechSynthesizer};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{EdureelError, Result};
use crate::extract::Mcq;
use crate::prompt::PromptBuilder;
use crate::request::GenerationRequest;

/// What the chat model returns for a slideshow lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonContent {
    /// `(image description, narration)` per scene.
    #[serde(default)]
    pub scenes: Vec<(String, String)>,
    /// Quiz questions.
    #[serde(default)]
    pub mcqs: Vec<Mcq>,
    /// Catchy title.
    #[serde(default)]
    pub short_topic: String,
    /// Short summary.
    #[serde(default)]
    pub description: String,
}

impl LessonContent {
    /// All narrations joined with single spaces.
    #[must_use]
    pub fn caption(&self) -> String {
        self.scenes
            .iter()
            .map(|(_, narration)| narration.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parses the model's JSON reply, tolerating a surrounding fence or prose.
pub fn parse_lesson_reply(reply: &str) -> Result<LessonContent> {
    let json = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => return Err(EdureelError::extraction("lesson reply contains no JSON object")),
    };
    serde_json::from_str(json)
        .map_err(|e| EdureelError::extraction(format!("invalid lesson JSON: {e}")))
}

/// A published slideshow lesson, shaped for the HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonArtifact {
    /// Video title.
    pub video_title: String,
    /// All narration text.
    pub caption: String,
    /// Description shown with the video.
    pub description: String,
    /// Thumbnail URL, empty when there is none.
    pub thumbnail: String,
    /// Public URL of the video.
    pub video_link: String,
    /// Quiz questions.
    pub mcqs: Vec<Mcq>,
}

/// Assembles still images and narration clips into a video.
#[async_trait]
pub trait SlideshowAssembler: Send + Sync {
    /// Images expected per narration clip.
    fn images_per_audio(&self) -> usize;

    /// Builds the video at `output`.
    async fn assemble(
        &self,
        images: &[PathBuf],
        audio: &[PathBuf],
        output: &Path,
    ) -> Result<PathBuf>;
}

#[async_trait]
impl SlideshowAssembler for VideoAssembler {
    fn images_per_audio(&self) -> usize {
        Self::images_per_audio(self)
    }

    async fn assemble(
        &self,
        images: &[PathBuf],
        audio: &[PathBuf],
        output: &Path,
    ) -> Result<PathBuf> {
        Ok(Self::assemble(self, images, audio, output).await?)
    }
}

/// Hosted services the lesson pipeline talks to.
pub struct LessonServices {
    /// Drafts the lesson.
    pub chat: Arc<dyn ChatModel>,
    /// Draws scene images.
    pub images: Arc<dyn ImageGenerator>,
    /// Speaks narration.
    pub speech: Arc<dyn SpeechSynthesizer>,
    /// Builds the slideshow.
    pub assembler: Arc<dyn SlideshowAssembler>,
    /// Publishes the video and thumbnail.
    pub host: Arc<dyn MediaHost>,
}

/// Runs slideshow lessons end to end.
pub struct LessonPipeline {
    services: LessonServices,
    prompts: PromptBuilder,
    work_dir: PathBuf,
    keep_on_failure: bool,
}

impl LessonPipeline {
    /// Creates a pipeline keeping job workspaces under `work_dir`.
    #[must_use]
    pub fn new(
        services: LessonServices,
        prompts: PromptBuilder,
        work_dir: PathBuf,
        keep_on_failure: bool,
    ) -> Self {
        Self {
            services,
            prompts,
            work_dir,
            keep_on_failure,
        }
    }

    /// Generates, publishes and returns a slideshow lesson.
    ///
    /// # Errors
    ///
    /// - `BadRequest` if the topic is blank or the model judged it unrelated
    ///   to education
    /// - `Upload` if publishing fails
    /// - any provider, media or extraction error, unretried
    #[instrument(skip(self, request), fields(topic = request.topic()))]
    pub async fn run(&self, request: &GenerationRequest) -> Result<LessonArtifact> {
        request.validate()?;

        let per_scene = self.services.assembler.images_per_audio();
        let messages = self.prompts.lesson_prompt(request, per_scene);
        let reply = self.services.chat.complete(&messages).await?;
        let content = parse_lesson_reply(&reply)?;

        if content.scenes.is_empty() {
            return Err(EdureelError::bad_request(
                "The topic is not related to education. Please provide a relevant topic.",
            ));
        }
        info!(scenes = content.scenes.len(), "Lesson drafted");

        let workspace = JobWorkspace::create(&self.work_dir).await?;
        match self.build(&workspace, request, content).await {
            Ok(artifact) => {
                workspace.cleanup().await;
                Ok(artifact)
            }
            Err(e) => {
                warn!(job = %workspace.id(), error = %e, "Lesson failed");
                if !self.keep_on_failure {
                    workspace.cleanup().await;
                }
                Err(e)
            }
        }
    }

    async fn build(
        &self,
        workspace: &JobWorkspace,
        request: &GenerationRequest,
        content: LessonContent,
    ) -> Result<LessonArtifact> {
        let per_scene = self.services.assembler.images_per_audio();
        let mut images = Vec::with_capacity(content.scenes.len() * per_scene);
        let mut audio = Vec::with_capacity(content.scenes.len());

        for (i, (description, narration)) in content.scenes.iter().enumerate() {
            let destinations: Vec<PathBuf> =
                (0..per_scene).map(|k| workspace.image_path(i, k)).collect();
            images.extend(self.services.images.generate(description, &destinations).await?);
            audio.push(
                self.services
                    .speech
                    .synthesize(narration, &workspace.audio_path(i))
                    .await?,
            );
        }

        let output = workspace.path(&workspace.video_name());
        let video = self.services.assembler.assemble(&images, &audio, &output).await?;

        let video_link = self.upload(&video, ResourceKind::Video).await?;
        let thumbnail = match images.first() {
            Some(first) => self.upload(first, ResourceKind::Image).await?,
            None => String::new(),
        };

        info!(job = %workspace.id(), url = %video_link, "Lesson published");
        Ok(LessonArtifact {
            video_title: content.short_topic.clone(),
            caption: content.caption(),
            description: request.topic().to_string(),
            thumbnail,
            video_link,
            mcqs: content.mcqs,
        })
    }

    async fn upload(&self, path: &Path, kind: ResourceKind) -> Result<String> {
        self.services
            .host
            .upload(path, kind)
            .await
            .map_err(|e| EdureelError::upload(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use edureel_providers::{ChatMessage, ProviderError};

    use super::*;

    const LESSON: &str = r#"Here you go:
```json
{
  "scenes": [
    ["a red triangle", "Triangles have three sides."],
    ["a right angle", "Some have a right angle."]
  ],
  "mcqs": [{"question": "Sides?", "options": ["1", "2", "3", "4"], "correctAnswer": "3"}],
  "short_topic": "All About Triangles",
  "description": "Triangles for beginners"
}
```"#;

    struct FixedChat(String);

    #[async_trait]
    impl ChatModel for FixedChat {
        async fn complete(&self, _messages: &[ChatMessage]) -> edureel_providers::Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FileImages;

    #[async_trait]
    impl ImageGenerator for FileImages {
        async fn generate(
            &self,
            _prompt: &str,
            destinations: &[PathBuf],
        ) -> edureel_providers::Result<Vec<PathBuf>> {
            for path in destinations {
                tokio::fs::write(path, b"png").await?;
            }
            Ok(destinations.to_vec())
        }
    }

    struct FileSpeech;

    #[async_trait]
    impl SpeechSynthesizer for FileSpeech {
        async fn synthesize(
            &self,
            _text: &str,
            destination: &Path,
        ) -> edureel_providers::Result<PathBuf> {
            tokio::fs::write(destination, b"mp3").await?;
            Ok(destination.to_path_buf())
        }
    }

    #[derive(Default)]
    struct RecordingAssembler {
        calls: Mutex<Vec<(usize, usize)>>,
    }

    #[async_trait]
    impl SlideshowAssembler for RecordingAssembler {
        fn images_per_audio(&self) -> usize {
            2
        }

        async fn assemble(
            &self,
            images: &[PathBuf],
            audio: &[PathBuf],
            output: &Path,
        ) -> Result<PathBuf> {
            self.calls.lock().unwrap().push((images.len(), audio.len()));
            tokio::fs::write(output, b"mp4").await?;
            Ok(output.to_path_buf())
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        uploads: Mutex<Vec<(PathBuf, ResourceKind)>>,
        fail: bool,
    }

    #[async_trait]
    impl MediaHost for RecordingHost {
        async fn upload(
            &self,
            path: &Path,
            kind: ResourceKind,
        ) -> edureel_providers::Result<String> {
            if self.fail {
                return Err(ProviderError::invalid_response("cloudinary", "rejected"));
            }
            self.uploads.lock().unwrap().push((path.to_path_buf(), kind));
            Ok(format!("https://cdn.example/{}", kind.as_str()))
        }
    }

    fn pipeline(
        reply: &str,
        work_dir: &Path,
        assembler: Arc<RecordingAssembler>,
        host: Arc<RecordingHost>,
    ) -> LessonPipeline {
        LessonPipeline::new(
            LessonServices {
                chat: Arc::new(FixedChat(reply.to_string())),
                images: Arc::new(FileImages),
                speech: Arc::new(FileSpeech),
                assembler,
                host,
            },
            PromptBuilder::new("Video"),
            work_dir.to_path_buf(),
            true,
        )
    }

    #[test]
    fn test_parse_lesson_reply_strips_fence() {
        let content = parse_lesson_reply(LESSON).unwrap();
        assert_eq!(content.scenes.len(), 2);
        assert_eq!(content.scenes[0].0, "a red triangle");
        assert_eq!(content.short_topic, "All About Triangles");
        assert_eq!(content.caption(), "Triangles have three sides. Some have a right angle.");
    }

    #[test]
    fn test_parse_lesson_reply_empty_fields() {
        let reply = r#"{"scenes": [], "mcqs": [], "short_topic": "", "description": ""}"#;
        let content = parse_lesson_reply(reply).unwrap();
        assert!(content.scenes.is_empty());
    }

    #[test]
    fn test_parse_lesson_reply_errors() {
        assert!(parse_lesson_reply("no json at all").is_err());
        let err = parse_lesson_reply(r#"{"scenes": [["only one"]]}"#).unwrap_err();
        assert!(err.to_string().contains("invalid lesson JSON"));
    }

    #[tokio::test]
    async fn test_run_builds_and_publishes() {
        let root = tempfile::tempdir().unwrap();
        let assembler = Arc::new(RecordingAssembler::default());
        let host = Arc::new(RecordingHost::default());
        let lesson = pipeline(LESSON, root.path(), assembler.clone(), host.clone());

        let artifact = lesson.run(&GenerationRequest::new("triangles", 3)).await.unwrap();

        assert_eq!(artifact.video_title, "All About Triangles");
        assert_eq!(artifact.description, "triangles");
        assert_eq!(artifact.video_link, "https://cdn.example/video");
        assert_eq!(artifact.thumbnail, "https://cdn.example/image");
        assert_eq!(artifact.mcqs.len(), 1);

        assert_eq!(*assembler.calls.lock().unwrap(), vec![(4, 2)]);
        let uploads = host.uploads.lock().unwrap();
        assert_eq!(uploads[0].1, ResourceKind::Video);
        assert_eq!(uploads[1].1, ResourceKind::Image);
        assert!(uploads[1].0.ends_with("image_0_0.png"));

        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_rejects_non_educational_topic() {
        let root = tempfile::tempdir().unwrap();
        let lesson = pipeline(
            r#"{"scenes": [], "mcqs": [], "short_topic": "", "description": ""}"#,
            root.path(),
            Arc::new(RecordingAssembler::default()),
            Arc::new(RecordingHost::default()),
        );

        let err = lesson.run(&GenerationRequest::new("celebrity gossip", 5)).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("not related to education"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_upload_failure_is_upload_error() {
        let root = tempfile::tempdir().unwrap();
        let host = Arc::new(RecordingHost {
            fail: true,
            ..Default::default()
        });
        let lesson = pipeline(LESSON, root.path(), Arc::new(RecordingAssembler::default()), host);

        let err = lesson.run(&GenerationRequest::new("triangles", 3)).await.unwrap_err();
        assert!(matches!(err, EdureelError::Upload { .. }));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }
}
