//! Error types for the EduReel orchestrator.
//!
//! This module defines the error hierarchy for configuration loading, reply
//! extraction, rendering, publishing and the generation-retry loop itself.

use std::path::PathBuf;

use edureel_media::MediaError;
use edureel_providers::ProviderError;

/// A specialized `Result` type for orchestrator operations.
pub type Result<T> = std::result::Result<T, EdureelError>;

/// Errors that can occur while generating and publishing a lesson.
///
/// Error variants are grouped by pipeline stage and include actionable
/// suggestions where the operator can do something about them.
#[derive(Debug, thiserror::Error)]
pub enum EdureelError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your edureel.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Generation Errors (retried by the orchestrator)
    // ========================================================================
    /// The model's reply did not contain the expected sections.
    #[error("Extraction failed: {message}")]
    Extraction {
        /// What was missing or malformed.
        message: String,
    },

    /// The generated scene could not be rendered.
    #[error("Render failed: {message}")]
    Render {
        /// Renderer error text.
        message: String,
    },

    /// Media inputs violated a precondition.
    #[error("Precondition failed: {message}")]
    Precondition {
        /// Which precondition failed.
        message: String,
    },

    /// A hosted service call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// An external media tool failed.
    #[error(transparent)]
    Media(MediaError),

    // ========================================================================
    // Terminal Errors
    // ========================================================================
    /// The finished video could not be published.
    #[error("Upload failed: {message}\n\nSuggestion: Check the Cloudinary credentials and quota")]
    Upload {
        /// Upload error text.
        message: String,
    },

    /// Every attempt in the budget failed.
    #[error("Failed to generate video after {attempts} attempts. Last error: {last_error}")]
    ExhaustedRetries {
        /// Number of attempts made.
        attempts: u32,
        /// Error text of the final attempt.
        last_error: String,
    },

    /// The request itself cannot be served.
    #[error("{0}")]
    BadRequest(String),

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Invalid stage transition attempted.
    #[error("Invalid stage transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current stage.
        from: String,
        /// The attempted target stage.
        to: String,
    },
}

impl From<MediaError> for EdureelError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Render { message, .. } => Self::Render { message },
            MediaError::Precondition(message) => Self::Precondition { message },
            other => Self::Media(other),
        }
    }
}

impl EdureelError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `Extraction` error.
    #[must_use]
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    /// Creates a new `Upload` error.
    #[must_use]
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
        }
    }

    /// Creates a new `ExhaustedRetries` error.
    #[must_use]
    pub fn exhausted(attempts: u32, last_error: impl Into<String>) -> Self {
        Self::ExhaustedRetries {
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Creates a new `BadRequest` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if a fresh generation attempt might avoid this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::Upload { .. }
                | Self::ExhaustedRetries { .. }
                | Self::BadRequest(_)
                | Self::InvalidStateTransition { .. }
        )
    }

    /// Returns `true` if the caller sent a request that cannot be served.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::BadRequest(_))
    }
}
