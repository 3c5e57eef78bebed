//! Media hosting on Cloudinary.
//!
//! Uploads use Cloudinary's signed-upload scheme: the request parameters are
//! sorted by name, joined as `key=value` pairs with `&`, the API secret is
//! appended, and the SHA-1 hex digest of that string is sent as `signature`.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{info, instrument};

use crate::error::{ProviderError, Result};
use crate::http::{build_http_client, check_status, map_http_error};

const SERVICE: &str = "cloudinary";

/// Kind of asset being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A still image.
    Image,
    /// A video file.
    Video,
}

impl ResourceKind {
    /// Path segment Cloudinary uses for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// A host that stores a local file and returns its public URL.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Uploads the file at `path` and returns its secure public URL.
    async fn upload(&self, path: &Path, kind: ResourceKind) -> Result<String>;
}

/// Computes the Cloudinary signature for a set of upload parameters.
///
/// Parameter order does not matter; they are sorted by name before hashing.
#[must_use]
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

/// Client for Cloudinary's upload API.
#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl CloudinaryClient {
    /// Creates a new client.
    ///
    /// `base_url` is the API root, e.g. `https://api.cloudinary.com/v1_1`.
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn upload_url(&self, kind: ResourceKind) -> String {
        format!("{}/{}/{}/upload", self.base_url, self.cloud_name, kind.as_str())
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    #[instrument(skip(self), fields(kind = kind.as_str()))]
    async fn upload(&self, path: &Path, kind: ResourceKind) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let mut params = BTreeMap::new();
        params.insert("timestamp", timestamp.clone());
        let signature = sign(&params, &self.api_secret);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .client
            .post(self.upload_url(kind))
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_http_error(SERVICE, &e))?;
        let parsed: UploadResponse = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| map_http_error(SERVICE, &e))?;

        let url = parsed
            .secure_url
            .or(parsed.url)
            .ok_or_else(|| ProviderError::invalid_response(SERVICE, "upload response had no URL"))?;

        info!(url = %url, "Uploaded asset");
        Ok(url)
    }
}
