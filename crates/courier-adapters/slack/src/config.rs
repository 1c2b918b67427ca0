//! Configuration types for the Slack adapter.
//!
//! # Example Configuration
//!
//! ```toml
//! [plugins.slack]
//! token = "xoxb-..."
//! signing_secret = "8f742231b10e8888abcd99yyyzzz85a5"
//! bot_user_id = "U0BOT"
//! admins = ["U0ADMIN"]
//! ```
//!
//! Every key can also come from `SLACK_*` environment variables (`SLACK_TOKEN`,
//! `SLACK_SIGNING_SECRET`, `SLACK_ADMINS=U1,U2`, ...).

use std::time::Duration;

use courier_core::{DEFAULT_SIGNATURE_MAX_AGE, ReplyPolicy, Verification};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://slack.com/api/";

/// Slack adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot token used for Web API calls.
    pub token: String,

    /// Id stamped on messages the bot posts. Discovered at startup when unset.
    pub bot_id: Option<String>,

    /// User id of the bot, used for mention detection.
    pub bot_user_id: Option<String>,

    /// User ids allowed to trigger admin handlers.
    #[serde(deserialize_with = "admin_list")]
    pub admins: Vec<String>,

    /// Legacy verification token.
    pub verify: Option<String>,

    /// Request signing secret. Takes precedence over `verify`.
    pub signing_secret: Option<String>,

    /// Accepted clock skew of signed requests.
    pub signature_max_age_secs: u64,

    pub api_url: String,

    pub reply_policy: ReplyPolicy,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            bot_id: None,
            bot_user_id: None,
            admins: Vec::new(),
            verify: None,
            signing_secret: None,
            signature_max_age_secs: DEFAULT_SIGNATURE_MAX_AGE.as_secs(),
            api_url: DEFAULT_API_URL.to_string(),
            reply_policy: ReplyPolicy::default(),
        }
    }
}

/// Errors in the Slack configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlackConfigError {
    #[error("Slack token is not configured (SLACK_TOKEN)")]
    MissingToken,

    #[error("neither a verification token (SLACK_VERIFY) nor a signing secret (SLACK_SIGNING_SECRET) is configured")]
    MissingVerification,
}

impl SlackConfig {
    pub fn validate(&self) -> Result<(), SlackConfigError> {
        if self.token.trim().is_empty() {
            return Err(SlackConfigError::MissingToken);
        }
        if non_empty(&self.verify).is_none() && non_empty(&self.signing_secret).is_none() {
            return Err(SlackConfigError::MissingVerification);
        }
        Ok(())
    }

    /// Verification mode: request signing when a secret is set, the token otherwise.
    pub fn verification(&self) -> Verification {
        Verification::select(
            non_empty(&self.verify).unwrap_or_default(),
            non_empty(&self.signing_secret),
            Duration::from_secs(self.signature_max_age_secs),
        )
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Accepts either a list or a comma separated string.
fn admin_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Admins {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Admins::deserialize(deserializer)? {
        Admins::List(list) => list,
        Admins::Csv(csv) => csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    })
}
