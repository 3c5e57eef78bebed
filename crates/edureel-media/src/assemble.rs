//! Slideshow assembly: still images timed to narration audio.
//!
//! Images are grouped `images_per_audio` at a time, one group per audio clip.
//! Each clip's duration is split evenly across its group; image `k` is shown
//! for that share while the `k`-th slice of the same clip plays underneath.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::error::{MediaError, Result};
use crate::ffmpeg::MediaTools;

/// One image shown with one slice of an audio clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Image shown for the whole segment.
    pub image: PathBuf,
    /// Audio clip the slice is cut from.
    pub audio: PathBuf,
    /// Offset of the slice within the clip, in seconds.
    pub start: f64,
    /// Length of the segment, in seconds.
    pub duration: f64,
}

/// Checks `images == audio * images_per_audio` without touching any file.
pub fn check_counts(images: usize, audio: usize, images_per_audio: usize) -> Result<()> {
    if images_per_audio == 0 {
        return Err(MediaError::precondition("images per audio clip must be at least 1"));
    }
    if audio == 0 {
        return Err(MediaError::precondition("at least one audio clip is required"));
    }
    if audio.checked_mul(images_per_audio) != Some(images) {
        return Err(MediaError::precondition(format!(
            "expected {} images for {audio} audio clips at {images_per_audio} per clip, got {images}",
            audio.saturating_mul(images_per_audio)
        )));
    }
    Ok(())
}

/// Plans the segments for `images` against `(clip, duration)` pairs.
#[allow(clippy::cast_precision_loss)]
pub fn plan_segments(
    images: &[PathBuf],
    audio: &[(PathBuf, f64)],
    images_per_audio: usize,
) -> Result<Vec<Segment>> {
    check_counts(images.len(), audio.len(), images_per_audio)?;

    let segments = audio
        .iter()
        .zip(images.chunks(images_per_audio))
        .flat_map(|((clip, clip_duration), group)| {
            let share = clip_duration / images_per_audio as f64;
            group.iter().enumerate().map(move |(k, image)| Segment {
                image: image.clone(),
                audio: clip.clone(),
                start: k as f64 * share,
                duration: share,
            })
        })
        .collect();

    Ok(segments)
}

/// Quotes a file name for an ffmpeg concat list.
///
/// The concat demuxer resolves relative entries against the list file's own
/// directory, so entries are bare names of files beside the list.
fn concat_entry(name: &str) -> String {
    format!("file '{}'\n", name.replace('\'', "'\\''"))
}

/// Builds slideshow videos with ffmpeg.
#[derive(Debug, Clone)]
pub struct VideoAssembler {
    tools: MediaTools,
    images_per_audio: usize,
    fps: u32,
}

impl VideoAssembler {
    /// Creates an assembler showing `images_per_audio` images per clip at `fps`.
    #[must_use]
    pub const fn new(tools: MediaTools, images_per_audio: usize, fps: u32) -> Self {
        Self {
            tools,
            images_per_audio,
            fps,
        }
    }

    /// Number of images expected per audio clip.
    #[must_use]
    pub const fn images_per_audio(&self) -> usize {
        self.images_per_audio
    }

    /// Assembles `images` and `audio` into a single video at `output`.
    ///
    /// The image/audio count precondition is checked before any probing,
    /// encoding or file creation.
    #[instrument(skip(self, images, audio), fields(images = images.len(), clips = audio.len()))]
    pub async fn assemble(
        &self,
        images: &[PathBuf],
        audio: &[PathBuf],
        output: &Path,
    ) -> Result<PathBuf> {
        check_counts(images.len(), audio.len(), self.images_per_audio)?;

        let mut timed = Vec::with_capacity(audio.len());
        for clip in audio {
            let duration = self.tools.probe_duration(clip).await?;
            timed.push((clip.clone(), duration));
        }
        let segments = plan_segments(images, &timed, self.images_per_audio)?;

        let work_dir = output.parent().unwrap_or_else(|| Path::new("."));
        let mut list = String::new();
        for (i, segment) in segments.iter().enumerate() {
            let segment_name = format!("segment_{i}.mp4");
            self.encode_segment(segment, &work_dir.join(&segment_name)).await?;
            list.push_str(&concat_entry(&segment_name));
        }

        let list_path = work_dir.join("segments.txt");
        tokio::fs::write(&list_path, list).await?;

        let concat: [&std::ffi::OsStr; 9] = [
            "-f".as_ref(),
            "concat".as_ref(),
            "-safe".as_ref(),
            "0".as_ref(),
            "-i".as_ref(),
            list_path.as_os_str(),
            "-c".as_ref(),
            "copy".as_ref(),
            output.as_os_str(),
        ];
        self.tools.run_ffmpeg(concat, None).await?;

        info!(output = %output.display(), segments = segments.len(), "Slideshow assembled");
        Ok(output.to_path_buf())
    }

    async fn encode_segment(&self, segment: &Segment, destination: &Path) -> Result<()> {
        let fps = self.fps.to_string();
        let start = format!("{:.3}", segment.start);
        let duration = format!("{:.3}", segment.duration);
        debug!(
            image = %segment.image.display(),
            start = %start,
            duration = %duration,
            "Encoding segment"
        );

        let args: [&std::ffi::OsStr; 26] = [
            "-loop".as_ref(),
            "1".as_ref(),
            "-framerate".as_ref(),
            fps.as_ref(),
            "-t".as_ref(),
            duration.as_ref(),
            "-i".as_ref(),
            segment.image.as_os_str(),
            "-ss".as_ref(),
            start.as_ref(),
            "-t".as_ref(),
            duration.as_ref(),
            "-i".as_ref(),
            segment.audio.as_os_str(),
            "-vf".as_ref(),
            "scale=trunc(iw/2)*2:trunc(ih/2)*2,format=yuv420p".as_ref(),
            "-r".as_ref(),
            fps.as_ref(),
            "-c:v".as_ref(),
            "libx264".as_ref(),
            "-tune".as_ref(),
            "stillimage".as_ref(),
            "-c:a".as_ref(),
            "aac".as_ref(),
            "-shortest".as_ref(),
            destination.as_os_str(),
        ];
        self.tools.run_ffmpeg(args, None).await
    }
}
