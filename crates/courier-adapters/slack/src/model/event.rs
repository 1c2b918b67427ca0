//! Events API payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use courier_framework::{ChatMessage, EventKey, MessageKey};

/// Outer envelope of every Events API request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Verification token (legacy verification).
    #[serde(default)]
    pub token: Option<String>,

    /// `url_verification` or `event_callback`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Handshake value echoed back on `url_verification`.
    #[serde(default)]
    pub challenge: Option<String>,

    #[serde(default)]
    pub team_id: Option<String>,

    #[serde(default)]
    pub event_id: Option<String>,

    #[serde(default)]
    pub event: Option<Value>,
}

impl Envelope {
    pub const URL_VERIFICATION: &'static str = "url_verification";

    pub fn is_challenge(&self) -> bool {
        self.kind == Self::URL_VERIFICATION || self.challenge.is_some()
    }
}

/// A non-message event, kept as raw fields behind typed accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl SlackEvent {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn subtype(&self) -> Option<&str> {
        self.data.get("subtype").and_then(Value::as_str)
    }

    /// Channel id; some events carry the whole channel object.
    pub fn channel(&self) -> Option<&str> {
        match self.data.get("channel")? {
            Value::String(id) => Some(id),
            Value::Object(channel) => channel.get("id").and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&str> {
        match self.data.get("user")? {
            Value::String(id) => Some(id),
            Value::Object(user) => user.get("id").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Routed by (`type`, `subtype`, `channel`).
impl EventKey for SlackEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn sub_type(&self) -> Option<&str> {
        self.subtype()
    }

    fn sub_sub_type(&self) -> Option<&str> {
        self.channel()
    }
}

/// A `message` event.
///
/// Edits (`message_changed`) carry the new message nested under `message`; text,
/// sender and bot id fall back to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackMessage {
    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub subtype: Option<String>,

    #[serde(default)]
    pub bot_id: Option<String>,

    #[serde(default)]
    pub ts: Option<String>,

    #[serde(default)]
    pub thread_ts: Option<String>,

    #[serde(default)]
    pub message: Option<Box<SlackMessage>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SlackMessage {
    /// A plain message in `channel`.
    pub fn new(channel: impl Into<String>, user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: Some(channel.into()),
            user: Some(user.into()),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Timestamp to reply to in a thread.
    pub fn thread(&self) -> Option<&str> {
        self.thread_ts.as_deref().or(self.ts.as_deref())
    }

    fn uses_nested_text(&self) -> bool {
        self.text.is_empty() && self.message.is_some()
    }
}

impl MessageKey for SlackMessage {
    fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    fn text(&self) -> &str {
        match &self.message {
            Some(nested) if self.text.is_empty() => &nested.text,
            _ => &self.text,
        }
    }
}

impl ChatMessage for SlackMessage {
    fn sender(&self) -> Option<&str> {
        self.user
            .as_deref()
            .or_else(|| self.message.as_ref().and_then(|m| m.user.as_deref()))
    }

    fn bot_ids(&self) -> Vec<&str> {
        self.bot_id
            .as_deref()
            .into_iter()
            .chain(self.message.as_ref().and_then(|m| m.bot_id.as_deref()))
            .collect()
    }

    fn with_text(&self, text: String) -> Self {
        let mut copy = self.clone();
        match copy.message.as_mut() {
            Some(nested) if self.uses_nested_text() => nested.text = text,
            _ => copy.text = text,
        }
        copy
    }
}
