//! Error types for media tooling.

use std::path::PathBuf;

/// A specialized `Result` type for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;

/// Errors raised while rendering, probing or assembling media.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Inputs violate a documented precondition. Raised before any I/O.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The scene renderer did not produce a video.
    #[error("Render failed: {message}\n\nSuggestion: {suggestion}")]
    Render {
        /// What went wrong.
        message: String,
        /// Actionable suggestion.
        suggestion: String,
    },

    /// An external tool ran but exited unsuccessfully.
    #[error("{tool} exited with code {exit_code}: {message}")]
    ToolFailed {
        /// Tool name.
        tool: String,
        /// Process exit code, `-1` when terminated by a signal.
        exit_code: i32,
        /// Tail of the tool's stderr.
        message: String,
    },

    /// An external tool could not be started.
    #[error("Could not run {tool}: {message}\n\nSuggestion: Install {tool} and make sure it is on PATH")]
    ToolUnavailable {
        /// Tool name.
        tool: String,
        /// The spawn error.
        message: String,
    },

    /// The duration of a media file could not be determined.
    #[error("Could not probe {}: {message}", path.display())]
    Probe {
        /// File that was probed.
        path: PathBuf,
        /// Why probing failed.
        message: String,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Creates a new `Precondition` error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Creates a new `Render` error.
    #[must_use]
    pub fn render(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `Probe` error.
    #[must_use]
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }
}
