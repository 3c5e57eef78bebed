//! The caller's request.

use serde::{Deserialize, Serialize};

use crate::error::{EdureelError, Result};

const fn default_grade() -> u8 {
    5
}

/// A request for one lesson video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// What the lesson is about.
    pub topic: String,

    /// School grade of the audience.
    #[serde(default = "default_grade")]
    pub grade: u8,
}

impl GenerationRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(topic: impl Into<String>, grade: u8) -> Self {
        Self {
            topic: topic.into(),
            grade,
        }
    }

    /// The topic with surrounding whitespace removed.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.topic.trim()
    }

    /// Rejects requests that cannot be served.
    pub fn validate(&self) -> Result<()> {
        if self.topic().is_empty() {
            return Err(EdureelError::bad_request("topic must not be empty"));
        }
        Ok(())
    }
}
