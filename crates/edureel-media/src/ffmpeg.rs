//! Thin wrappers around the `ffmpeg` and `ffprobe` command-line tools.

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, Result};

/// Number of trailing stderr characters kept in error messages.
const STDERR_TAIL: usize = 2000;

/// Runs `program` with `args` in `cwd` and waits for it to exit.
///
/// Spawn failures become [`MediaError::ToolUnavailable`]; a non-zero exit
/// becomes [`MediaError::ToolFailed`] carrying the tail of stderr.
pub(crate) async fn run_tool<I, S>(program: &str, args: I, cwd: Option<&Path>) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    debug!(command = ?command.as_std(), "Running external tool");

    let output = command.output().await.map_err(|e| MediaError::ToolUnavailable {
        tool: program.to_string(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);
        warn!(tool = program, exit_code, "External tool failed");
        return Err(MediaError::ToolFailed {
            tool: program.to_string(),
            exit_code,
            message: stderr_tail(&stderr),
        });
    }

    Ok(output)
}

/// Last [`STDERR_TAIL`] characters of a tool's stderr, trimmed.
pub(crate) fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - STDERR_TAIL).collect()
}

/// Parses the bare number printed by `ffprobe -show_entries format=duration`.
fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// An audio clip to be laid over a video starting at `offset_seconds`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationClip {
    /// Audio file.
    pub path: PathBuf,
    /// Start time within the video.
    pub offset_seconds: u32,
}

/// Builds the `-filter_complex` graph that delays each narration input
/// (inputs `1..=n`) to its offset and mixes them into `[narration]`.
fn narration_filter(clips: &[NarrationClip]) -> String {
    let mut filter = String::new();
    if let [only] = clips {
        let delay_ms = u64::from(only.offset_seconds) * 1000;
        let _ = write!(filter, "[1:a]adelay=delays={delay_ms}:all=1[narration]");
        return filter;
    }

    for (i, clip) in clips.iter().enumerate() {
        let _ = write!(
            filter,
            "[{}:a]adelay=delays={}:all=1[a{i}];",
            i + 1,
            u64::from(clip.offset_seconds) * 1000
        );
    }
    for i in 0..clips.len() {
        let _ = write!(filter, "[a{i}]");
    }
    let _ = write!(filter, "amix=inputs={}:normalize=0[narration]", clips.len());
    filter
}

/// Locations of the ffmpeg toolchain.
#[derive(Debug, Clone)]
pub struct MediaTools {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for MediaTools {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl MediaTools {
    /// Uses the given `ffmpeg` and `ffprobe` executables.
    #[must_use]
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Returns the duration of a media file in seconds.
    pub async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = run_tool(
            &self.ffprobe,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-show_entries"),
                OsStr::new("format=duration"),
                OsStr::new("-of"),
                OsStr::new("default=noprint_wrappers=1:nokey=1"),
                path.as_os_str(),
            ],
            None,
        )
        .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_duration(&stdout).ok_or_else(|| {
            MediaError::probe(path, format!("unexpected ffprobe output '{}'", stdout.trim()))
        })
    }

    /// Runs `ffmpeg -y -hide_banner -loglevel error <args>`.
    pub async fn run_ffmpeg<I, S>(&self, args: I, cwd: Option<&Path>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut full: Vec<std::ffi::OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
            .iter()
            .map(std::ffi::OsString::from)
            .collect();
        full.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        run_tool(&self.ffmpeg, full, cwd).await?;
        Ok(())
    }

    /// Lays the narration clips over `video` at their offsets, writing the
    /// result to `output`. The video stream is copied, not re-encoded.
    pub async fn mux_narration(
        &self,
        video: &Path,
        clips: &[NarrationClip],
        output: &Path,
    ) -> Result<PathBuf> {
        if clips.is_empty() {
            return Err(MediaError::precondition("at least one narration clip is required"));
        }

        let filter = narration_filter(clips);
        let mut args: Vec<std::ffi::OsString> = vec!["-i".into(), video.into()];
        for clip in clips {
            args.push("-i".into());
            args.push(clip.path.clone().into());
        }
        args.extend(
            [
                "-filter_complex",
                filter.as_str(),
                "-map",
                "0:v",
                "-map",
                "[narration]",
                "-c:v",
                "copy",
                "-c:a",
                "aac",
            ]
            .iter()
            .map(std::ffi::OsString::from),
        );
        args.push(output.into());

        self.run_ffmpeg(args, None).await?;
        debug!(output = %output.display(), clips = clips.len(), "Muxed narration");
        Ok(output.to_path_buf())
    }
}
