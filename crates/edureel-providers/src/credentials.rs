//! Service credentials read from the environment.

use crate::error::{ProviderError, Result};

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the Cloudinary cloud name.
pub const CLOUDINARY_CLOUD_NAME: &str = "CLOUDINARY_CLOUD_NAME";
/// Environment variable holding the Cloudinary API key.
pub const CLOUDINARY_API_KEY: &str = "CLOUDINARY_API_KEY";
/// Environment variable holding the Cloudinary API secret.
pub const CLOUDINARY_API_SECRET: &str = "CLOUDINARY_API_SECRET";

/// Secrets needed by the hosted-service clients.
#[derive(Clone)]
pub struct Credentials {
    /// OpenAI API key.
    pub openai_api_key: String,
    /// Cloudinary cloud name.
    pub cloudinary_cloud_name: String,
    /// Cloudinary API key.
    pub cloudinary_api_key: String,
    /// Cloudinary API secret.
    pub cloudinary_api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("cloudinary_cloud_name", &self.cloudinary_cloud_name)
            .field("cloudinary_api_key", &"<redacted>")
            .field("cloudinary_api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Reads all credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] naming the first variable
    /// that is unset or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads all credentials through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ProviderError::missing_credential(name))
        };

        Ok(Self {
            openai_api_key: require(OPENAI_API_KEY)?,
            cloudinary_cloud_name: require(CLOUDINARY_CLOUD_NAME)?,
            cloudinary_api_key: require(CLOUDINARY_API_KEY)?,
            cloudinary_api_secret: require(CLOUDINARY_API_SECRET)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (OPENAI_API_KEY, "sk-test".to_string()),
            (CLOUDINARY_CLOUD_NAME, "demo".to_string()),
            (CLOUDINARY_API_KEY, "123".to_string()),
            (CLOUDINARY_API_SECRET, "shh".to_string()),
        ])
    }

    #[test]
    fn test_from_lookup_all_present() {
        let env = full_env();
        let creds = Credentials::from_lookup(|name| env.get(name).cloned()).unwrap();
        assert_eq!(creds.openai_api_key, "sk-test");
        assert_eq!(creds.cloudinary_cloud_name, "demo");
        assert_eq!(creds.cloudinary_api_secret, "shh");
    }

    #[test]
    fn test_from_lookup_missing_variable() {
        let mut env = full_env();
        env.remove(CLOUDINARY_API_KEY);
        let err = Credentials::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingCredential { ref name } if name == CLOUDINARY_API_KEY
        ));
    }

    #[test]
    fn test_from_lookup_blank_counts_as_missing() {
        let mut env = full_env();
        env.insert(OPENAI_API_KEY, "   ".to_string());
        let err = Credentials::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(err.to_string().contains(OPENAI_API_KEY));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let env = full_env();
        let creds = Credentials::from_lookup(|name| env.get(name).cloned()).unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("sk-test"));
        assert!(!debug.contains("shh"));
        assert!(debug.contains("demo"));
    }
}
