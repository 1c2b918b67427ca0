//! Handler replies and webhook responses.

use http::StatusCode;
use serde_json::Value;

use crate::error::WebhookError;
use crate::executor::DispatchOutcome;

/// Body of a reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReplyBody {
    /// No body.
    #[default]
    Empty,
    /// Plain-text body.
    Text(String),
    /// JSON body.
    Json(Value),
}

/// A handler's contribution to the HTTP response.
///
/// Only awaited handlers can shape the response; which reply wins among
/// several is decided by the executor's [`ReplyPolicy`](crate::ReplyPolicy).
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: StatusCode,
    body: ReplyBody,
}

impl Reply {
    /// Empty `200 OK`.
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Empty,
        }
    }

    /// `200 OK` with a text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Text(text.into()),
        }
    }

    /// `200 OK` with a JSON body.
    pub fn json(value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: ReplyBody::Json(value),
        }
    }

    /// Overrides the status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ReplyBody {
        &self.body
    }
}

/// Transport-independent response produced by an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: ReplyBody,
}

impl WebhookResponse {
    /// Empty `200 OK`.
    pub fn ok() -> Self {
        Self::empty(StatusCode::OK)
    }

    /// Empty response with the given status.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: ReplyBody::Empty,
        }
    }

    /// Text response with the given status.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            status,
            body: ReplyBody::Text(text.into()),
        }
    }

    /// JSON response with the given status.
    pub fn json(status: StatusCode, value: Value) -> Self {
        Self {
            status,
            body: ReplyBody::Json(value),
        }
    }
}

impl From<Reply> for WebhookResponse {
    fn from(reply: Reply) -> Self {
        Self {
            status: reply.status,
            body: reply.body,
        }
    }
}

impl From<WebhookError> for WebhookResponse {
    fn from(err: WebhookError) -> Self {
        Self::empty(err.status())
    }
}

impl From<DispatchOutcome> for WebhookResponse {
    /// Any awaited failure yields 500; otherwise the selected reply, or an
    /// empty 200 when no handler replied.
    fn from(outcome: DispatchOutcome) -> Self {
        if !outcome.is_success() {
            return WebhookError::HandlerFailed {
                failed: outcome.failures.len(),
            }
            .into();
        }
        outcome.reply.map(Into::into).unwrap_or_else(Self::ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::HandlerFailure;
    use crate::handler::HandlerId;

    #[test]
    fn reply_builders() {
        let reply = Reply::json(serde_json::json!({"text": "hi"})).with_status(StatusCode::ACCEPTED);
        assert_eq!(reply.status(), StatusCode::ACCEPTED);
        assert_eq!(reply.body(), &ReplyBody::Json(serde_json::json!({"text": "hi"})));
    }

    #[test]
    fn outcome_without_reply_is_empty_ok() {
        let response = WebhookResponse::from(DispatchOutcome::default());
        assert_eq!(response, WebhookResponse::ok());
    }

    #[test]
    fn outcome_with_failure_is_server_error() {
        let outcome = DispatchOutcome {
            reply: Some(Reply::text("ignored")),
            failures: vec![HandlerFailure {
                id: HandlerId::next(),
                error: "boom".into(),
            }],
            ..Default::default()
        };
        let response = WebhookResponse::from(outcome);
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body, ReplyBody::Empty);
    }

    #[test]
    fn outcome_reply_is_forwarded() {
        let outcome = DispatchOutcome {
            reply: Some(Reply::text("pong")),
            ..Default::default()
        };
        let response = WebhookResponse::from(outcome);
        assert_eq!(response, WebhookResponse::text(StatusCode::OK, "pong"));
    }
}
