//! External media tooling for EduReel.
//!
//! This crate wraps the command-line tools the service shells out to:
//!
//! - [`SceneRenderer`] writes generated scene code to the job directory and
//!   runs `manim` on it
//! - [`VideoAssembler`] turns still images and narration clips into a
//!   slideshow video with `ffmpeg`
//! - [`MediaTools`] probes durations and lays narration over rendered video
//!
//! All files of one request live in a [`JobWorkspace`].

pub mod assemble;
pub mod error;
pub mod ffmpeg;
pub mod render;
pub mod workspace;

pub use assemble::{plan_segments, Segment, VideoAssembler};
pub use error::{MediaError, Result};
pub use ffmpeg::{MediaTools, NarrationClip};
pub use render::{RenderQuality, RenderedVideo, SceneRenderer};
pub use workspace::{JobId, JobWorkspace};
