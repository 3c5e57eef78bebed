//! Prompts sent to the chat model.

use edureel_providers::ChatMessage;

use crate::attempt::AttemptHistory;
use crate::request::GenerationRequest;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that creates educational videos for school students.";

/// Builds the conversations for scene drafting and slideshow lessons.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    scene_name: String,
}

impl PromptBuilder {
    /// Creates a builder for scenes that must define the class `scene_name`.
    #[must_use]
    pub fn new(scene_name: impl Into<String>) -> Self {
        Self {
            scene_name: scene_name.into(),
        }
    }

    /// The instruction for a fresh attempt.
    #[must_use]
    pub fn instruction(&self, request: &GenerationRequest) -> String {
        let scene = &self.scene_name;
        format!(
            "Create an educational mathematics video for students of grade {grade}.\n\
             You can add more details relevant to the topic. Make the visualization colorful and \
             add on-screen text that never covers the main content. The video should be at least \
             20 seconds long.\n\n\
             The topic is: {topic}\n\n\
             Reply with exactly three fenced blocks, in this order:\n\n\
             1. A ```python block with manim code defining one scene class named '{scene}'.\n\
             2. A ```script block with the narration, one line per sentence, each written as \
             `m:ss - text` where m:ss is when the sentence starts. For example:\n\
             0:00 - Welcome to our video about triangles!\n\
             0:05 - A triangle is a shape with three sides.\n\
             3. A ```mcq block with a JSON array of 5 multiple-choice questions about the topic, \
             each an object with \"question\", \"options\" (4 strings) and \"correctAnswer\" \
             (one of the options).",
            grade = request.grade,
            topic = request.topic(),
        )
    }

    /// The conversation for the next attempt.
    ///
    /// After a failure the original instruction is followed by the most recent
    /// error and the last code the model produced.
    #[must_use]
    pub fn build_attempt_prompt(
        &self,
        request: &GenerationRequest,
        history: &AttemptHistory,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(self.instruction(request)),
        ];

        if let Some(error) = history.last_error() {
            let mut retry = format!(
                "The previous attempt to generate manim code for '{topic}' failed with the \
                 error: {error}\n\n\
                 Please provide an improved version that addresses this issue, keeping all three \
                 blocks. Remember to name the scene class '{scene}'.",
                topic = request.topic(),
                scene = self.scene_name,
            );
            if let Some(code) = history.last_code() {
                retry.push_str("\n\nHere is the previously generated code for reference:\n\n");
                retry.push_str(code);
            }
            messages.push(ChatMessage::user(retry));
        }

        messages
    }

    /// The conversation for a slideshow lesson.
    #[must_use]
    pub fn lesson_prompt(
        &self,
        request: &GenerationRequest,
        images_per_scene: usize,
    ) -> Vec<ChatMessage> {
        let instruction = format!(
            "Generate educational video content for students of grade {grade}. \
             Additionally, provide 5 multiple-choice questions related to the topic and a short \
             catchy video title and description.\n\n\
             The topic is: {topic}\n\n\
             Reply with a single JSON object and nothing else, shaped like this:\n\
             {{\n\
             \x20 \"scenes\": [[\"<description of the scene's images>\", \
             \"<narration for the scene>\"]],\n\
             \x20 \"mcqs\": [{{\"question\": \"...\", \"options\": [\"a\", \"b\", \"c\", \"d\"], \
             \"correctAnswer\": \"a\"}}],\n\
             \x20 \"short_topic\": \"<catchy title>\",\n\
             \x20 \"description\": \"<short summary of the video>\"\n\
             }}\n\n\
             Each scene description is used to draw {images_per_scene} illustrations, so describe \
             something visual. If the topic is not related to education, return every field empty.",
            grade = request.grade,
            topic = request.topic(),
        );

        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(instruction)]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use edureel_providers::MessageRole;

    use super::*;
    use crate::attempt::{AttemptRecord, GenerationStage};

    fn request() -> GenerationRequest {
        GenerationRequest::new("Pythagorean theorem", 8)
    }

    #[test]
    fn test_first_attempt_has_no_retry_context() {
        let builder = PromptBuilder::new("Video");
        let messages = builder.build_attempt_prompt(&request(), &AttemptHistory::new());

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[1].content.contains("Pythagorean theorem"));
        assert!(messages[1].content.contains("grade 8"));
        assert!(messages[1].content.contains("class named 'Video'"));
        assert!(messages[1].content.contains("```mcq"));
    }

    #[test]
    fn test_retry_includes_last_error_and_code() {
        let builder = PromptBuilder::new("Video");
        let first = AttemptRecord::new(
            0,
            GenerationStage::Rendering,
            Some("class Video: pass".into()),
            "first error",
            Utc::now(),
        );
        let second =
            AttemptRecord::new(1, GenerationStage::Extracting, None, "second error", Utc::now());
        let history = AttemptHistory::new().push(first).push(second);

        let messages = builder.build_attempt_prompt(&request(), &history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, builder.instruction(&request()));

        let retry = &messages[2].content;
        assert!(retry.contains("second error"));
        assert!(!retry.contains("first error"));
        assert!(retry.contains("class Video: pass"));
    }

    #[test]
    fn test_retry_without_code_omits_reference_section() {
        let builder = PromptBuilder::new("Video");
        let record = AttemptRecord::new(0, GenerationStage::Drafting, None, "timeout", Utc::now());
        let history = AttemptHistory::new().push(record);
        let messages = builder.build_attempt_prompt(&request(), &history);
        assert!(!messages[2].content.contains("previously generated code"));
    }

    #[test]
    fn test_lesson_prompt_describes_json_shape() {
        let builder = PromptBuilder::new("Video");
        let messages = builder.lesson_prompt(&request(), 5);
        let content = &messages[1].content;
        assert!(content.contains("\"scenes\""));
        assert!(content.contains("\"short_topic\""));
        assert!(content.contains("draw 5 illustrations"));
        assert!(content.contains("not related to education"));
    }
}
