//! Slash command payloads.

use serde::{Deserialize, Serialize};

use courier_core::PayloadError;
use courier_framework::CommandKey;

use super::decode_form;

/// A slash command invocation, posted as a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackCommand {
    /// The command itself, e.g. `/deploy`.
    pub command: String,
    /// Everything after the command.
    pub text: String,
    pub token: Option<String>,
    pub team_id: Option<String>,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub response_url: Option<String>,
    pub trigger_id: Option<String>,
}

impl SlackCommand {
    /// Parses a form-encoded body.
    pub fn from_form(body: &[u8]) -> Result<Self, PayloadError> {
        let mut form = decode_form(body)?;
        let command = form
            .remove("command")
            .filter(|c| !c.is_empty())
            .ok_or(PayloadError::MissingField("command"))?;

        Ok(Self {
            command,
            text: form.remove("text").unwrap_or_default(),
            token: form.remove("token"),
            team_id: form.remove("team_id"),
            channel_id: form.remove("channel_id"),
            channel_name: form.remove("channel_name"),
            user_id: form.remove("user_id"),
            user_name: form.remove("user_name"),
            response_url: form.remove("response_url"),
            trigger_id: form.remove("trigger_id"),
        })
    }

    /// Arguments split on whitespace.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }
}

impl CommandKey for SlackCommand {
    fn command(&self) -> &str {
        &self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form() {
        let body = b"token=gIkuvaNzQIHg97ATvDxqgjtO&team_id=T0001&channel_id=C2147483705\
&user_id=U2147483697&user_name=Steve&command=%2Fweather&text=94070+today\
&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2F1234%2F5678";

        let command = SlackCommand::from_form(body).unwrap();
        assert_eq!(command.command(), "/weather");
        assert_eq!(command.args().collect::<Vec<_>>(), vec!["94070", "today"]);
        assert_eq!(command.user_id.as_deref(), Some("U2147483697"));
        assert_eq!(
            command.response_url.as_deref(),
            Some("https://hooks.slack.com/commands/1234/5678")
        );
    }

    #[test]
    fn missing_command_is_rejected() {
        assert_eq!(
            SlackCommand::from_form(b"text=hello").unwrap_err(),
            PayloadError::MissingField("command")
        );
    }
}
