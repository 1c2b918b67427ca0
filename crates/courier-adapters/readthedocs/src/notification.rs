//! Build notification payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use courier_core::PayloadError;

/// Notification posted by Read the Docs when a build finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildNotification {
    /// Project slug.
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    pub build: BuildInfo,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub success: bool,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuildNotification {
    /// Decodes a notification, naming the first required field that is absent.
    pub fn from_body(body: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(body)?;
        if value.get("slug").and_then(Value::as_str).is_none() {
            return Err(PayloadError::MissingField("slug"));
        }
        if value.pointer("/build/success").and_then(Value::as_bool).is_none() {
            return Err(PayloadError::MissingField("build.success"));
        }
        Ok(serde_json::from_value(value)?)
    }
}
