//! Slack payload models.
//!
//! ```text
//! /slack/events    Envelope { token, type, challenge, event }
//!                  ├── type == "message" → SlackMessage
//!                  └── otherwise         → SlackEvent
//! /slack/commands  form                  → SlackCommand
//! /slack/actions   form `payload` JSON   → SlackAction
//! ```

pub mod action;
pub mod command;
pub mod event;

pub use action::{ActionElement, ActionKind, SlackAction};
pub use command::SlackCommand;
pub use event::{Envelope, SlackEvent, SlackMessage};

use std::collections::HashMap;

use courier_core::PayloadError;

/// Decodes an `application/x-www-form-urlencoded` body.
pub(crate) fn decode_form(body: &[u8]) -> Result<HashMap<String, String>, PayloadError> {
    if std::str::from_utf8(body).is_err() {
        return Err(PayloadError::InvalidForm("body is not valid UTF-8".into()));
    }
    Ok(url::form_urlencoded::parse(body).into_owned().collect())
}
