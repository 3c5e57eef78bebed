//! Configuration types for the EduReel service.
//!
//! Everything except credentials lives in `edureel.json`. Every field has a
//! default, so a missing file or a partial file is valid.

use std::path::Path;

use edureel_media::RenderQuality;
use serde::{Deserialize, Serialize};

use crate::error::{EdureelError, Result};

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "edureel.json";

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_work_dir() -> String {
    ".edureel/jobs".to_string()
}

/// Default attempt budget for the generation-retry loop.
const fn default_max_retries() -> u32 {
    3
}

fn default_llm_model() -> String {
    "gpt-4-turbo".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

fn default_image_model() -> String {
    "dall-e-2".to_string()
}

fn default_image_size() -> String {
    "512x512".to_string()
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_render_command() -> String {
    "manim".to_string()
}

fn default_scene_name() -> String {
    "Video".to_string()
}

const fn default_images_per_audio() -> usize {
    5
}

const fn default_fps() -> u32 {
    1
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_cdn_base_url() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

const fn default_true() -> bool {
    true
}

/// Main configuration for the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Address the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root directory for per-request job workspaces.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Maximum number of end-to-end generation attempts per request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Chat model settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Image generation settings.
    #[serde(default)]
    pub images: ImageConfig,

    /// Speech synthesis settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Scene renderer settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Slideshow assembly settings.
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Media host settings.
    #[serde(default)]
    pub cdn: CdnConfig,

    /// Job workspace retention.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            work_dir: default_work_dir(),
            max_retries: default_max_retries(),
            llm: LlmConfig::default(),
            images: ImageConfig::default(),
            speech: SpeechConfig::default(),
            render: RenderConfig::default(),
            assembly: AssemblyConfig::default(),
            cdn: CdnConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `edureel.json` in the current directory. If not found,
    /// returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            EdureelError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `edureel.json` in a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `EdureelError::ConfigParseError` if the file exists but
    /// contains invalid JSON or invalid enum values.
    ///
    /// Returns `EdureelError::ConfigValidationError` if the values are
    /// invalid (e.g., zero retries, empty paths).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(EdureelError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| EdureelError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `EdureelError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(EdureelError::config_validation(
                "maxRetries must be greater than 0",
                "Set maxRetries to at least 1 in your edureel.json",
            ));
        }

        if self.assembly.images_per_audio == 0 {
            return Err(EdureelError::config_validation(
                "assembly.imagesPerAudio must be greater than 0",
                "Set assembly.imagesPerAudio to at least 1 in your edureel.json",
            ));
        }

        if self.assembly.fps == 0 {
            return Err(EdureelError::config_validation(
                "assembly.fps must be greater than 0",
                "Set assembly.fps to at least 1 in your edureel.json",
            ));
        }

        let required = [
            ("workDir", &self.work_dir),
            ("llm.model", &self.llm.model),
            ("render.command", &self.render.command),
            ("render.sceneName", &self.render.scene_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(EdureelError::config_validation(
                    format!("{name} must not be empty"),
                    format!("Provide a value for {name} in your edureel.json"),
                ));
            }
        }

        Ok(())
    }
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// Model name.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API root shared by the chat, image and speech clients.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: default_openai_base_url(),
            temperature: default_temperature(),
        }
    }
}

/// Image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// Model name.
    #[serde(default = "default_image_model")]
    pub model: String,

    /// Image dimensions, e.g. `512x512`.
    #[serde(default = "default_image_size")]
    pub size: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: default_image_model(),
            size: default_image_size(),
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    /// Model name.
    #[serde(default = "default_speech_model")]
    pub model: String,

    /// Voice preset.
    #[serde(default = "default_voice")]
    pub voice: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: default_speech_model(),
            voice: default_voice(),
        }
    }
}

/// Scene renderer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Renderer executable.
    #[serde(default = "default_render_command")]
    pub command: String,

    /// Scene class the generated code must define.
    #[serde(default = "default_scene_name")]
    pub scene_name: String,

    /// Quality preset.
    #[serde(default)]
    pub quality: RenderQuality,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            command: default_render_command(),
            scene_name: default_scene_name(),
            quality: RenderQuality::default(),
        }
    }
}

/// Slideshow assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyConfig {
    /// Images shown per narration clip.
    #[serde(default = "default_images_per_audio")]
    pub images_per_audio: usize,

    /// Output frame rate.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// `ffmpeg` executable.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// `ffprobe` executable.
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            images_per_audio: default_images_per_audio(),
            fps: default_fps(),
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Media host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnConfig {
    /// Upload API root.
    #[serde(default = "default_cdn_base_url")]
    pub base_url: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            base_url: default_cdn_base_url(),
        }
    }
}

/// Job workspace retention.
///
/// Workspaces are always removed after a successful request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupConfig {
    /// Keep the job workspace when every attempt failed.
    #[serde(default = "default_true")]
    pub keep_on_failure: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            keep_on_failure: true,
        }
    }
}
