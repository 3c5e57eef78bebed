//! Text-to-speech client.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{ProviderError, Result};
use crate::http::{build_http_client, check_status, map_http_error};

const SERVICE: &str = "speech";

/// Synthesizes narration audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speaks `text` and writes the mp3 audio to `destination`.
    async fn synthesize(&self, text: &str, destination: &Path) -> Result<PathBuf>;
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

/// Speech client for the OpenAI audio API.
#[derive(Debug, Clone)]
pub struct OpenAiSpeech {
    client: Client,
    api_key: String,
    model: String,
    voice: String,
    base_url: String,
}

impl OpenAiSpeech {
    /// Creates a new client.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    #[instrument(skip(self, text), fields(voice = %self.voice, chars = text.len()))]
    async fn synthesize(&self, text: &str, destination: &Path) -> Result<PathBuf> {
        if text.trim().is_empty() {
            return Err(ProviderError::invalid_response(SERVICE, "cannot synthesize empty text"));
        }

        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_http_error(SERVICE, &e))?;
        let audio = check_status(SERVICE, response)
            .await?
            .bytes()
            .await
            .map_err(|e| map_http_error(SERVICE, &e))?;

        if audio.is_empty() {
            return Err(ProviderError::invalid_response(SERVICE, "received empty audio"));
        }

        tokio::fs::write(destination, &audio).await?;
        debug!(path = %destination.display(), bytes = audio.len(), "Narration saved");
        Ok(destination.to_path_buf())
    }
}
