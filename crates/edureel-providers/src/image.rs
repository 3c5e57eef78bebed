//! Text-to-image client.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ProviderError, Result};
use crate::http::{build_http_client, check_status, map_http_error};

const SERVICE: &str = "images";

/// Generates still images from a text description.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates one image per entry in `destinations` and writes each to
    /// its path, returning the written paths in the same order.
    async fn generate(&self, prompt: &str, destinations: &[PathBuf]) -> Result<Vec<PathBuf>>;
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: usize,
    size: &'a str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

/// Collects exactly `wanted` image URLs from a generation response.
fn image_urls(response: ImageResponse, wanted: usize) -> Result<Vec<String>> {
    let urls: Vec<String> = response.data.into_iter().filter_map(|d| d.url).collect();
    if urls.len() < wanted {
        return Err(ProviderError::invalid_response(
            SERVICE,
            format!("requested {wanted} images but received {}", urls.len()),
        ));
    }
    Ok(urls.into_iter().take(wanted).collect())
}

/// Image client for the OpenAI images API.
#[derive(Debug, Clone)]
pub struct OpenAiImages {
    client: Client,
    api_key: String,
    model: String,
    size: String,
    base_url: String,
}

impl OpenAiImages {
    /// Creates a new client.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        size: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key: api_key.into(),
            model: model.into(),
            size: size.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_http_error(SERVICE, &e))?;
        let bytes = check_status(SERVICE, response)
            .await?
            .bytes()
            .await
            .map_err(|e| map_http_error(SERVICE, &e))?;
        tokio::fs::write(destination, &bytes).await?;
        debug!(path = %destination.display(), bytes = bytes.len(), "Image saved");
        Ok(())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    #[instrument(
        skip(self, prompt, destinations),
        fields(model = %self.model, count = destinations.len())
    )]
    async fn generate(&self, prompt: &str, destinations: &[PathBuf]) -> Result<Vec<PathBuf>> {
        if destinations.is_empty() {
            return Ok(Vec::new());
        }

        let body = ImageRequest {
            model: &self.model,
            prompt,
            n: destinations.len(),
            size: &self.size,
            response_format: "url",
        };

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_http_error(SERVICE, &e))?;
        let parsed: ImageResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| map_http_error(SERVICE, &e))?;

        let urls = image_urls(parsed, destinations.len())?;
        for (url, destination) in urls.iter().zip(destinations) {
            self.download(url, destination).await?;
        }

        Ok(destinations.to_vec())
    }
}
