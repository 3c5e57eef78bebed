//! HTTP API tests against a real server bound on localhost.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use edureel_media::JobWorkspace;
use edureel_orchestrator::{
    create_router, AppState, EdureelError, ExtractedPayload, LessonPipeline, LessonServices,
    Orchestrator, OrchestratorSettings, PromptBuilder, Publisher, SlideshowAssembler,
    VideoProducer,
};
use edureel_providers::{
    ChatMessage, ChatModel, ImageGenerator, MediaHost, ResourceKind, SpeechSynthesizer,
};
use tokio::net::TcpListener;

const SCENE_REPLY: &str = r#"```python
class Video(Scene): pass
```
```script
0:00 - Fractions split a whole.
0:05 - One half is one of two parts.
```
```mcq
[{"question": "Half of 4?", "options": ["1", "2", "3", "4"], "correctAnswer": "2"}]
```"#;

const LESSON_REPLY: &str = r#"```json
{
  "scenes": [
    ["a pizza cut in half", "Halves are equal parts."],
    ["a pizza cut in quarters", "Quarters are smaller."]
  ],
  "mcqs": [
    {"question": "Quarters in a whole?", "options": ["2", "3", "4", "5"], "correctAnswer": "4"}
  ],
  "short_topic": "Slice It Up",
  "description": "Fractions with pizza"
}
```"#;

/// Routes each prompt kind to a canned reply.
struct RoutingChat;

#[async_trait]
impl ChatModel for RoutingChat {
    async fn complete(&self, messages: &[ChatMessage]) -> edureel_providers::Result<String> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        if last.contains("\"scenes\"") {
            if last.contains("celebrity") {
                let empty = r#"{"scenes": [], "mcqs": [], "short_topic": "", "description": ""}"#;
                return Ok(empty.to_string());
            }
            Ok(LESSON_REPLY.to_string())
        } else if last.contains("```python") {
            Ok(SCENE_REPLY.to_string())
        } else {
            Ok(format!("You said: {last}"))
        }
    }
}

struct FileProducer;

#[async_trait]
impl VideoProducer for FileProducer {
    async fn produce(
        &self,
        workspace: &JobWorkspace,
        _payload: &ExtractedPayload,
    ) -> edureel_orchestrator::Result<PathBuf> {
        let path = workspace.path(&workspace.video_name());
        tokio::fs::write(&path, b"mp4").await?;
        Ok(path)
    }
}

struct FixedPublisher;

#[async_trait]
impl Publisher for FixedPublisher {
    async fn publish(&self, _video: &Path) -> edureel_orchestrator::Result<String> {
        Ok("https://cdn.example/fractions.mp4".to_string())
    }
}

struct PlaceholderImages;

#[async_trait]
impl ImageGenerator for PlaceholderImages {
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

struct PlaceholderSpeech;

#[async_trait]
impl SpeechSynthesizer for PlaceholderSpeech {
    async fn synthesize(
        &self,
        _text: &str,
        destination: &Path,
    ) -> edureel_providers::Result<PathBuf> {
        tokio::fs::write(destination, b"mp3").await?;
        Ok(destination.to_path_buf())
    }
}

struct ConcatAssembler;

#[async_trait]
impl SlideshowAssembler for ConcatAssembler {
    fn images_per_audio(&self) -> usize {
        2
    }

    async fn assemble(
        &self,
        images: &[PathBuf],
        audio: &[PathBuf],
        output: &Path,
    ) -> edureel_orchestrator::Result<PathBuf> {
        if images.len() != audio.len() * 2 {
            return Err(EdureelError::Precondition {
                message: format!("{} images for {} clips", images.len(), audio.len()),
            });
        }
        tokio::fs::write(output, b"mp4").await?;
        Ok(output.to_path_buf())
    }
}

struct KindHost;

#[async_trait]
impl MediaHost for KindHost {
    async fn upload(&self, path: &Path, kind: ResourceKind) -> edureel_providers::Result<String> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        Ok(format!("https://cdn.example/{}/{name}", kind.as_str()))
    }
}

/// Starts the API on an ephemeral port and returns its base URL.
async fn spawn_server(work_dir: &Path) -> String {
    let chat: Arc<dyn ChatModel> = Arc::new(RoutingChat);
    let orchestrator = Orchestrator::new(
        chat.clone(),
        Arc::new(FileProducer),
        Arc::new(FixedPublisher),
        OrchestratorSettings {
            work_dir: work_dir.to_path_buf(),
            max_retries: 3,
            keep_on_failure: false,
            scene_name: "Video".to_string(),
        },
    );
    let lessons = LessonPipeline::new(
        LessonServices {
            chat: chat.clone(),
            images: Arc::new(PlaceholderImages),
            speech: Arc::new(PlaceholderSpeech),
            assembler: Arc::new(ConcatAssembler),
            host: Arc::new(KindHost),
        },
        PromptBuilder::new("Video"),
        work_dir.to_path_buf(),
        false,
    );
    let router = create_router(AppState::new(Arc::new(orchestrator), Arc::new(lessons), chat));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_health_over_http() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(dir.path()).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/health"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_generate_video_over_http() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/generate_video/"))
        .json(&serde_json::json!({"topic": "fractions"}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["video_url"], "https://cdn.example/fractions.mp4");
    assert_eq!(body["title"], "fractions");
    assert_eq!(body["mcqs"][0]["correctAnswer"], "2");
    assert_eq!(std::fs::read_dir(dir.path()).expect("read work dir").count(), 0);
}

#[tokio::test]
async fn test_generate_educational_content_over_http() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/generate_educational_content/"))
        .json(&serde_json::json!({"topic": "fractions", "grade": 3}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["video_title"], "Slice It Up");
    assert_eq!(body["description"], "fractions");
    assert_eq!(body["caption"], "Halves are equal parts. Quarters are smaller.");
    let link = body["video_link"].as_str().expect("link");
    assert!(link.starts_with("https://cdn.example/video/"));
    assert_eq!(body["thumbnail"], "https://cdn.example/image/image_0_0.png");
    assert_eq!(body["mcqs"].as_array().expect("mcqs").len(), 1);
}

#[tokio::test]
async fn test_non_educational_topic_is_400() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(dir.path()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/generate_educational_content/"))
        .json(&serde_json::json!({"topic": "celebrity gossip", "grade": 3}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("json");
    assert!(body["detail"].as_str().expect("detail").contains("not related to education"));
}

#[tokio::test]
async fn test_chat_over_http() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = spawn_server(dir.path()).await;

    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{base}/chat/"))
        .json(&serde_json::json!({"message": "What is a prime?"}))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body["response"], "You said: What is a prime?");
}
