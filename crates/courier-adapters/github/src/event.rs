//! Webhook event payload.

use serde_json::Value;

use courier_core::PayloadError;
use courier_framework::EventKey;

/// A delivered webhook event.
///
/// Routed by `(event, action, repository.full_name)`, so a handler can listen
/// to every `issues` event, only `issues/opened`, or only those of one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct GithubEvent {
    /// Value of `X-GitHub-Event`.
    pub event: String,
    /// Value of `X-GitHub-Delivery`.
    pub delivery_id: String,
    pub data: Value,
}

impl GithubEvent {
    pub fn new(event: impl Into<String>, delivery_id: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            delivery_id: delivery_id.into(),
            data,
        }
    }

    /// Decodes the JSON body of a delivery.
    pub fn from_body(event: &str, delivery_id: &str, body: &[u8]) -> Result<Self, PayloadError> {
        let data = serde_json::from_slice(body)?;
        Ok(Self::new(event, delivery_id, data))
    }

    pub fn action(&self) -> Option<&str> {
        self.data.get("action").and_then(Value::as_str)
    }

    /// `owner/name` of the repository the event belongs to.
    pub fn repository(&self) -> Option<&str> {
        self.data.pointer("/repository/full_name").and_then(Value::as_str)
    }

    /// Login of the user who triggered the event.
    pub fn sender(&self) -> Option<&str> {
        self.data.pointer("/sender/login").and_then(Value::as_str)
    }
}

impl EventKey for GithubEvent {
    fn event_type(&self) -> &str {
        &self.event
    }

    fn sub_type(&self) -> Option<&str> {
        self.action()
    }

    fn sub_sub_type(&self) -> Option<&str> {
        self.repository()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_key() {
        let body = br#"{
            "action": "opened",
            "repository": { "full_name": "courier-rs/courier" },
            "sender": { "login": "octocat" }
        }"#;
        let event = GithubEvent::from_body("pull_request", "d-1", body).unwrap();

        assert_eq!(event.event_type(), "pull_request");
        assert_eq!(event.sub_type(), Some("opened"));
        assert_eq!(event.sub_sub_type(), Some("courier-rs/courier"));
        assert_eq!(event.sender(), Some("octocat"));
    }

    #[test]
    fn ping_has_no_action() {
        let event = GithubEvent::from_body("ping", "d-2", br#"{"zen": "Keep it logically awesome."}"#).unwrap();
        assert_eq!(event.sub_type(), None);
        assert_eq!(event.sub_sub_type(), None);
    }

    #[test]
    fn invalid_json() {
        let err = GithubEvent::from_body("push", "d-3", b"{").unwrap_err();
        assert!(matches!(err, PayloadError::InvalidJson(_)));
    }
}
