//! Request-scoped job workspaces.
//!
//! Every request works inside its own `work_dir/<job_id>/` directory, so two
//! concurrent requests for the same topic never touch the same files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// Correlation id of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directory holding every temporary file of one request.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    id: JobId,
    dir: PathBuf,
}

impl JobWorkspace {
    /// Creates `root/<new job id>/` and returns a handle to it.
    pub async fn create(root: &Path) -> Result<Self> {
        let id = JobId::new();
        let dir = root.join(id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        debug!(job = %id, dir = %dir.display(), "Created job workspace");
        Ok(Self { id, dir })
    }

    /// The job's id.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// The job directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `name` inside the job directory.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Path for the `k`-th image of scene `scene`.
    #[must_use]
    pub fn image_path(&self, scene: usize, k: usize) -> PathBuf {
        self.path(&format!("image_{scene}_{k}.png"))
    }

    /// Path for the `n`-th audio clip.
    #[must_use]
    pub fn audio_path(&self, n: usize) -> PathBuf {
        self.path(&format!("audio_{n}.mp3"))
    }

    /// File name used for the job's final video.
    #[must_use]
    pub fn video_name(&self) -> String {
        format!("{}.mp4", self.id)
    }

    /// Removes the job directory. Failures are logged, never returned.
    pub async fn cleanup(&self) {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!(job = %self.id, "Removed job workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(job = %self.id, error = %e, "Failed to remove job workspace"),
        }
    }
}
