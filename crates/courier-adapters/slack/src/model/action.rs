//! Interactive payloads: message buttons, block actions and dialog submissions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use courier_core::PayloadError;
use courier_framework::ActionKey;

use super::decode_form;

/// Interaction family, which decides how the route keys of an action are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Legacy attachment buttons and menus, keyed by `callback_id` and action `name`.
    InteractiveMessage,
    /// Block Kit elements, keyed by `block_id` and `action_id`.
    BlockActions,
    /// Dialog submissions, keyed by `callback_id`.
    DialogSubmission,
    /// Any other interaction type, keyed by `callback_id`.
    Other,
}

/// One element of the `actions` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionElement {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Decoded `payload` field of an interaction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackAction {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub callback_id: Option<String>,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub actions: Vec<ActionElement>,

    #[serde(default)]
    pub user: Option<IdRef>,

    #[serde(default)]
    pub channel: Option<IdRef>,

    #[serde(default)]
    pub response_url: Option<String>,

    #[serde(default)]
    pub trigger_id: Option<String>,

    /// Field values of a dialog submission.
    #[serde(default)]
    pub submission: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SlackAction {
    /// Parses a form body carrying the JSON `payload` field.
    pub fn from_form(body: &[u8]) -> Result<Self, PayloadError> {
        let form = decode_form(body)?;
        let payload = form
            .get("payload")
            .ok_or(PayloadError::MissingField("payload"))?;
        Ok(serde_json::from_str(payload)?)
    }

    pub fn action_kind(&self) -> ActionKind {
        match self.kind.as_str() {
            "interactive_message" => ActionKind::InteractiveMessage,
            "block_actions" => ActionKind::BlockActions,
            "dialog_submission" => ActionKind::DialogSubmission,
            _ => ActionKind::Other,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel.as_ref().map(|c| c.id.as_str())
    }
}

impl ActionKey for SlackAction {
    fn action_keys(&self) -> Vec<(&str, Option<&str>)> {
        match self.action_kind() {
            ActionKind::BlockActions => self
                .actions
                .iter()
                .filter_map(|a| Some((a.block_id.as_deref()?, a.action_id.as_deref())))
                .collect(),
            ActionKind::InteractiveMessage => {
                let Some(callback_id) = self.callback_id.as_deref() else {
                    return Vec::new();
                };
                if self.actions.is_empty() {
                    return vec![(callback_id, None)];
                }
                self.actions
                    .iter()
                    .map(|a| (callback_id, a.name.as_deref()))
                    .collect()
            }
            ActionKind::DialogSubmission | ActionKind::Other => {
                self.callback_id.as_deref().map(|id| (id, None)).into_iter().collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn form(payload: Value) -> Vec<u8> {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", &payload.to_string())
            .finish()
            .into_bytes()
    }

    #[test]
    fn interactive_message_keys() {
        let action = SlackAction::from_form(&form(json!({
            "type": "interactive_message",
            "callback_id": "wopr_game",
            "token": "tok",
            "actions": [{ "name": "choice", "type": "button", "value": "war" }],
            "user": { "id": "U1", "name": "joshua" },
            "channel": { "id": "C1" }
        })))
        .unwrap();

        assert_eq!(action.action_kind(), ActionKind::InteractiveMessage);
        assert_eq!(action.action_keys(), vec![("wopr_game", Some("choice"))]);
        assert_eq!(action.user_id(), Some("U1"));
        assert_eq!(action.actions[0].value.as_deref(), Some("war"));
    }

    #[test]
    fn block_action_keys() {
        let action: SlackAction = serde_json::from_value(json!({
            "type": "block_actions",
            "actions": [
                { "block_id": "deploy", "action_id": "approve", "type": "button" },
                { "block_id": "deploy", "action_id": "reject", "type": "button" },
                { "action_id": "orphan" }
            ]
        }))
        .unwrap();
        assert_eq!(
            action.action_keys(),
            vec![("deploy", Some("approve")), ("deploy", Some("reject"))]
        );
    }

    #[test]
    fn dialog_submission_keys() {
        let action: SlackAction = serde_json::from_value(json!({
            "type": "dialog_submission",
            "callback_id": "ticket",
            "submission": { "title": "broken" }
        }))
        .unwrap();
        assert_eq!(action.action_keys(), vec![("ticket", None)]);
        assert_eq!(action.submission.unwrap()["title"], "broken");
    }

    #[test]
    fn missing_or_invalid_payload() {
        assert_eq!(
            SlackAction::from_form(b"foo=bar").unwrap_err(),
            PayloadError::MissingField("payload")
        );
        assert!(matches!(
            SlackAction::from_form(b"payload=%7Bnot+json").unwrap_err(),
            PayloadError::InvalidJson(_)
        ));
    }
}
