//! Configuration types for the GitHub adapter.
//!
//! ```toml
//! [plugins.github]
//! secret = "webhook-secret"
//! token = "ghp_..."
//! ```
//!
//! `GITHUB_VERIFY` (or `GITHUB_SECRET`) supplies the webhook secret from the
//! environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Webhook secret shared with GitHub.
    #[serde(alias = "verify")]
    pub secret: String,

    /// Token for REST calls. Anonymous when unset.
    pub token: Option<String>,

    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GithubConfigError {
    #[error("GitHub webhook secret is not configured (GITHUB_VERIFY)")]
    MissingSecret,
}

impl GithubConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), GithubConfigError> {
        if self.secret.is_empty() {
            return Err(GithubConfigError::MissingSecret);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn verify_is_an_alias_of_secret() {
        let config: GithubConfig = serde_json::from_value(json!({ "verify": "s3cret" })).unwrap();
        assert_eq!(config.secret, "s3cret");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert_eq!(
            GithubConfig::default().validate(),
            Err(GithubConfigError::MissingSecret)
        );
    }
}
