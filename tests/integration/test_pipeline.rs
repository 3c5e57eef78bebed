//! End-to-end tests for the generation pipelines.
//!
//! Hosted services are replaced with in-process stubs; the real media
//! assembler is used where its precondition fails before any tool runs.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use edureel_media::{JobWorkspace, MediaTools, VideoAssembler};
use edureel_orchestrator::{
    parse_script, parse_timestamp, Config, EdureelError, ExtractedPayload, GenerationRequest,
    LessonPipeline, LessonServices, Orchestrator, OrchestratorSettings, PromptBuilder, Publisher,
    VideoProducer,
};
use edureel_providers::{
    ChatMessage, ChatModel, ImageGenerator, MediaHost, ResourceKind, SpeechSynthesizer,
};

const GOOD_REPLY: &str = r#"Sure!

```python
from manim import *

class Video(Scene):
    def construct(self):
        self.play(Create(Circle()))
```

```script
0:00 - Welcome to circles.
0:06 - A circle has no corners.
```

```mcq
[{"question": "Corners?", "options": ["0", "1", "2", "3"], "correctAnswer": "0"}]
```"#;

/// Replays canned replies and records the last user message of each call.
struct ReplayChat {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl ReplayChat {
    fn new(replies: &[&str], fallback: &str) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| (*r).to_string()).collect()),
            fallback: fallback.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt lock").clone()
    }
}

#[async_trait]
impl ChatModel for ReplayChat {
    async fn complete(&self, messages: &[ChatMessage]) -> edureel_providers::Result<String> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().expect("prompt lock").push(last);
        let reply = self.replies.lock().expect("reply lock").pop_front();
        Ok(reply.unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Writes a placeholder video and counts calls.
#[derive(Default)]
struct CountingProducer {
    calls: Mutex<u32>,
}

#[async_trait]
impl VideoProducer for CountingProducer {
    async fn produce(
        &self,
        workspace: &JobWorkspace,
        payload: &ExtractedPayload,
    ) -> edureel_orchestrator::Result<PathBuf> {
        *self.calls.lock().expect("call lock") += 1;
        assert!(payload.code.contains("class Video"));
        let path = workspace.path(&workspace.video_name());
        tokio::fs::write(&path, b"mp4").await?;
        Ok(path)
    }
}

struct FixedPublisher;

#[async_trait]
impl Publisher for FixedPublisher {
    async fn publish(&self, video: &Path) -> edureel_orchestrator::Result<String> {
        assert!(video.exists(), "published video should exist");
        Ok("https://cdn.example/lesson.mp4".to_string())
    }
}

fn orchestrator(
    chat: Arc<ReplayChat>,
    producer: Arc<CountingProducer>,
    work_dir: &Path,
) -> Orchestrator {
    Orchestrator::new(
        chat,
        producer,
        Arc::new(FixedPublisher),
        OrchestratorSettings {
            work_dir: work_dir.to_path_buf(),
            max_retries: 3,
            keep_on_failure: false,
            scene_name: "Video".to_string(),
        },
    )
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

// ============================================================================
// Scene video orchestrator
// ============================================================================

#[tokio::test]
async fn test_generate_publishes_on_first_attempt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chat = Arc::new(ReplayChat::new(&[], GOOD_REPLY));
    let producer = Arc::new(CountingProducer::default());

    let artifact = orchestrator(chat.clone(), producer.clone(), dir.path())
        .generate(&GenerationRequest::new("Circles", 3))
        .await
        .expect("generation should succeed");

    assert_eq!(artifact.video_url, "https://cdn.example/lesson.mp4");
    assert_eq!(artifact.title, "Circles");
    assert_eq!(artifact.caption, "Welcome to circles. A circle has no corners.");
    assert_eq!(artifact.mcqs.len(), 1);
    assert_eq!(chat.prompts().len(), 1);
    assert_eq!(*producer.calls.lock().expect("call lock"), 1);
    assert_eq!(std::fs::read_dir(dir.path()).expect("read work dir").count(), 0);
}

#[tokio::test]
async fn test_always_malformed_reply_exhausts_retries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let chat = Arc::new(ReplayChat::new(&[], "I cannot help with that."));
    let producer = Arc::new(CountingProducer::default());

    let err = orchestrator(chat.clone(), producer.clone(), dir.path())
        .generate(&GenerationRequest::new("Circles", 3))
        .await
        .expect_err("every attempt should fail");

    match &err {
        EdureelError::ExhaustedRetries { attempts, last_error } => {
            assert_eq!(*attempts, 3);
            assert!(last_error.contains("python"));
        }
        other => panic!("expected ExhaustedRetries, got {other:?}"),
    }
    assert!(err.to_string().starts_with("Failed to generate video after 3 attempts"));
    assert_eq!(chat.prompts().len(), 3);
    assert_eq!(*producer.calls.lock().expect("call lock"), 0);
}

#[tokio::test]
async fn test_retry_prompt_carries_previous_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing_mcq = "```python\nclass Video(Scene): pass\n```\n```script\n0:00 - Hi\n```";
    let chat = Arc::new(ReplayChat::new(&[missing_mcq], GOOD_REPLY));
    let producer = Arc::new(CountingProducer::default());

    orchestrator(chat.clone(), producer, dir.path())
        .generate(&GenerationRequest::new("Circles", 3))
        .await
        .expect("second attempt should succeed");

    let prompts = chat.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("previous attempt"));
    assert!(prompts[1].contains("mcq"));
    assert!(prompts[1].contains("class Video(Scene): pass"));
}

// ============================================================================
// Slideshow lessons
// ============================================================================

/// Draws only the first requested image, leaving the slideshow short.
struct ShortImages;

#[async_trait]
impl ImageGenerator for ShortImages {
    async fn generate(
        &self,
        _prompt: &str,
        destinations: &[PathBuf],
    ) -> edureel_providers::Result<Vec<PathBuf>> {
        Ok(destinations.iter().take(1).cloned().collect())
    }
}

struct SilentSpeech;

#[async_trait]
impl SpeechSynthesizer for SilentSpeech {
    async fn synthesize(
        &self,
        _text: &str,
        destination: &Path,
    ) -> edureel_providers::Result<PathBuf> {
        Ok(destination.to_path_buf())
    }
}

struct NoHost;

#[async_trait]
impl MediaHost for NoHost {
    async fn upload(&self, _path: &Path, _kind: ResourceKind) -> edureel_providers::Result<String> {
        panic!("nothing should be uploaded");
    }
}

#[tokio::test]
async fn test_lesson_with_short_image_set_fails_precondition() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reply = r#"{
        "scenes": [["a circle", "Circles are round."], ["a wheel", "Wheels are circles."]],
        "mcqs": [],
        "short_topic": "Circles",
        "description": "d"
    }"#;
    let lessons = LessonPipeline::new(
        LessonServices {
            chat: Arc::new(ReplayChat::new(&[], reply)),
            images: Arc::new(ShortImages),
            speech: Arc::new(SilentSpeech),
            assembler: Arc::new(VideoAssembler::new(
                MediaTools::new("edureel-missing-ffmpeg", "edureel-missing-ffprobe"),
                5,
                1,
            )),
            host: Arc::new(NoHost),
        },
        PromptBuilder::new("Video"),
        dir.path().to_path_buf(),
        false,
    );

    let err = lessons
        .run(&GenerationRequest::new("Circles", 2))
        .await
        .expect_err("two images cannot fill two clips");

    assert!(matches!(err, EdureelError::Precondition { .. }), "got {err:?}");
    assert_eq!(std::fs::read_dir(dir.path()).expect("read work dir").count(), 0);
}

// ============================================================================
// Extraction and configuration
// ============================================================================

#[test]
fn test_script_parsing_is_lenient() {
    let lines = parse_script("0:00 - Hello\ngarbage\n1:05 - Bye");
    let parsed: Vec<(u32, &str)> =
        lines.iter().map(|l| (l.offset_seconds, l.text.as_str())).collect();
    assert_eq!(parsed, vec![(0, "Hello"), (65, "Bye")]);
    assert_eq!(parse_timestamp("12:34"), Some(754));
}

#[test]
fn test_fixture_config_loads() {
    let config = Config::load_from_dir(&fixture_path()).expect("fixture config should load");

    assert_eq!(config.port, 8123);
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.render.quality.directory_tag(), "1080p60");
    assert_eq!(config.assembly.images_per_audio, 3);
    assert!(!config.cleanup.keep_on_failure);
    assert_eq!(config.speech.voice, "alloy");
}
