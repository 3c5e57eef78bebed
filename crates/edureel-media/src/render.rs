//! Scene rendering with `manim`.
//!
//! Generated scene code is written to `scene.py` inside the job directory and
//! rendered with the job directory as working directory, so manim's output
//! lands under `<job>/media/videos/scene/<quality tag>/<output name>`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{MediaError, Result};
use crate::ffmpeg::run_tool;
use crate::workspace::{JobId, JobWorkspace};

/// Module file the scene code is written to.
const SCENE_FILE: &str = "scene.py";
/// Module name manim derives from [`SCENE_FILE`].
const SCENE_MODULE: &str = "scene";
/// Media directory, relative to the job directory.
const MEDIA_DIR: &str = "media";

/// Render quality preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderQuality {
    /// 480p at 15 fps.
    #[default]
    Low,
    /// 720p at 30 fps.
    Medium,
    /// 1080p at 60 fps.
    High,
    /// 2160p at 60 fps.
    Production,
}

impl RenderQuality {
    /// Parses a string into a `RenderQuality`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "production" => Some(Self::Production),
            _ => None,
        }
    }

    /// Command-line flag selecting this quality.
    #[must_use]
    pub const fn flag(&self) -> &'static str {
        match self {
            Self::Low => "-ql",
            Self::Medium => "-qm",
            Self::High => "-qh",
            Self::Production => "-qk",
        }
    }

    /// Directory name manim writes this quality's output into.
    #[must_use]
    pub const fn directory_tag(&self) -> &'static str {
        match self {
            Self::Low => "480p15",
            Self::Medium => "720p30",
            Self::High => "1080p60",
            Self::Production => "2160p60",
        }
    }
}

impl<'de> Deserialize<'de> for RenderQuality {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid render quality '{s}': expected one of 'low', 'medium', 'high', 'production'"
            ))
        })
    }
}

impl Serialize for RenderQuality {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Production => "production",
        };
        serializer.serialize_str(s)
    }
}

/// A video file produced by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedVideo {
    /// Location of the rendered file.
    pub path: PathBuf,
    /// Job the video belongs to.
    pub job: JobId,
}

/// Invokes the scene renderer.
#[derive(Debug, Clone)]
pub struct SceneRenderer {
    command: String,
    scene_name: String,
    quality: RenderQuality,
}

impl SceneRenderer {
    /// Creates a renderer running `command` on the scene class `scene_name`.
    #[must_use]
    pub fn new(
        command: impl Into<String>,
        scene_name: impl Into<String>,
        quality: RenderQuality,
    ) -> Self {
        Self {
            command: command.into(),
            scene_name: scene_name.into(),
            quality,
        }
    }

    /// Where the renderer will write `output_name` for `workspace`.
    #[must_use]
    pub fn expected_output(&self, workspace: &JobWorkspace, output_name: &str) -> PathBuf {
        workspace
            .dir()
            .join(MEDIA_DIR)
            .join("videos")
            .join(SCENE_MODULE)
            .join(self.quality.directory_tag())
            .join(output_name)
    }

    /// Renders `code` into `output_name` inside the job workspace.
    ///
    /// The output file is checked once after the renderer exits.
    #[instrument(
        skip(self, workspace, code),
        fields(job = %workspace.id(), quality = ?self.quality)
    )]
    pub async fn render(
        &self,
        workspace: &JobWorkspace,
        code: &str,
        output_name: &str,
    ) -> Result<RenderedVideo> {
        tokio::fs::write(workspace.path(SCENE_FILE), code).await?;

        let args = [
            SCENE_FILE,
            self.scene_name.as_str(),
            self.quality.flag(),
            "-o",
            output_name,
            "--media_dir",
            MEDIA_DIR,
        ];
        run_tool(&self.command, args, Some(workspace.dir()))
            .await
            .map_err(|e| match e {
                MediaError::ToolFailed { message, .. } => MediaError::render(
                    message,
                    format!("Make sure the code defines a scene class named '{}'", self.scene_name),
                ),
                MediaError::ToolUnavailable { tool, message } => MediaError::render(
                    format!("could not run {tool}: {message}"),
                    format!("Install {tool} and make sure it is on PATH"),
                ),
                other => other,
            })?;

        let path = self.expected_output(workspace, output_name);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(MediaError::render(
                format!("expected output {} was not created", path.display()),
                format!("Make sure the code defines a scene class named '{}'", self.scene_name),
            ));
        }

        info!(path = %path.display(), "Scene rendered");
        Ok(RenderedVideo {
            path,
            job: workspace.id(),
        })
    }
}
