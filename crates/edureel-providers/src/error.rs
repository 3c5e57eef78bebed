//! Error types for the hosted-service clients.
//!
//! Every client in this crate reports failures through [`ProviderError`], with
//! the HTTP status mapped onto a [`ProviderErrorKind`] that picks the
//! suggestion shown to the operator.

/// A specialized `Result` type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while talking to a hosted service.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The service answered with an error status or could not be reached.
    #[error("{service} API error ({kind}): {message}\n\nSuggestion: {suggestion}")]
    Api {
        /// Short name of the service (e.g. "chat", "cloudinary").
        service: String,
        /// The category of failure.
        kind: ProviderErrorKind,
        /// Detailed message, usually the response body.
        message: String,
        /// Actionable suggestion for the operator.
        suggestion: String,
    },

    /// The service answered successfully but the body was not usable.
    #[error("{service} returned an unexpected response: {message}")]
    InvalidResponse {
        /// Short name of the service.
        service: String,
        /// What was wrong with the response.
        message: String,
    },

    /// A required credential was not provided.
    #[error(
        "Missing credential '{name}'\n\nSuggestion: Set {name} in the environment or in a .env file"
    )]
    MissingCredential {
        /// Name of the environment variable.
        name: String,
    },

    /// Local file I/O failed while reading an upload or writing a download.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Categories of hosted-service failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Authentication failure (invalid API key, bad signature).
    Authentication,
    /// Rate limit or quota exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues or timeouts.
    Network,
    /// Other unclassified errors, including 4xx request rejections.
    Other,
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl ProviderErrorKind {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }

    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check the API key or CDN credentials in your environment",
            Self::RateLimit => "Wait and retry, or reduce request frequency",
            Self::Server => "Retry later; the service may be experiencing issues",
            Self::Network => "Check your network connection",
            Self::Other => "Check the request parameters and the service's status page",
        }
    }
}

impl ProviderError {
    /// Creates a new `Api` error with the suggestion derived from `kind`.
    #[must_use]
    pub fn api(
        service: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            service: service.into(),
            kind,
            message: message.into(),
            suggestion: kind.suggestion().to_string(),
        }
    }

    /// Creates a new `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a new `MissingCredential` error.
    #[must_use]
    pub fn missing_credential(name: impl Into<String>) -> Self {
        Self::MissingCredential { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_status() {
        assert_eq!(ProviderErrorKind::from_status(401), ProviderErrorKind::Authentication);
        assert_eq!(ProviderErrorKind::from_status(403), ProviderErrorKind::Authentication);
        assert_eq!(ProviderErrorKind::from_status(429), ProviderErrorKind::RateLimit);
        assert_eq!(ProviderErrorKind::from_status(503), ProviderErrorKind::Server);
        assert_eq!(ProviderErrorKind::from_status(400), ProviderErrorKind::Other);
    }

    #[test]
    fn test_api_error_display_includes_suggestion() {
        let err = ProviderError::api("chat", ProviderErrorKind::RateLimit, "slow down");
        let msg = err.to_string();
        assert!(msg.contains("chat API error (rate_limit)"));
        assert!(msg.contains("slow down"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_missing_credential_display() {
        let msg = ProviderError::missing_credential("OPENAI_API_KEY").to_string();
        assert!(msg.contains("OPENAI_API_KEY"));
        assert!(msg.contains(".env"));
    }
}
