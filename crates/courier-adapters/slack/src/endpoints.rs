//! Request handling of the Slack endpoints.
//!
//! | Failure | Status |
//! |---------|--------|
//! | malformed body | 400 |
//! | failed verification | 401 |
//! | failed token check during the URL handshake | 500 |
//!
//! In signature mode the signature is checked before the body is decoded,
//! so an unsigned request is a 401 whatever its body holds. Token mode has
//! to decode first to reach the embedded token.
//! | an awaited handler failed | 500 |

use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use courier_core::{
    AppContext, DispatchOutcome, PayloadError, Verification, VerificationError, WebhookError,
    WebhookRequest, WebhookResponse,
};
use courier_framework::Routes;

use crate::model::{Envelope, SlackAction, SlackCommand, SlackEvent, SlackMessage};
use crate::plugin::SlackPlugin;

pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";

const EVENT_CALLBACK: &str = "event_callback";

impl SlackPlugin {
    /// Checks the request signature in signature mode. Runs before the body
    /// is decoded, so an unsigned request never reaches the parser.
    pub(crate) fn verify_signature(&self, request: &WebhookRequest) -> Result<(), VerificationError> {
        let Verification::Signature(verifier) = &self.verification else {
            return Ok(());
        };
        let timestamp = request
            .header(TIMESTAMP_HEADER)
            .ok_or(VerificationError::MissingHeader(TIMESTAMP_HEADER))?;
        let signature = request
            .header(SIGNATURE_HEADER)
            .ok_or(VerificationError::MissingHeader(SIGNATURE_HEADER))?;
        verifier.verify(timestamp, signature, &request.body)
    }

    /// Compares the token embedded in the payload in token mode. Signed
    /// requests were already checked by [`Self::verify_signature`].
    pub(crate) fn verify_token(&self, token: Option<&str>) -> Result<(), VerificationError> {
        match &self.verification {
            Verification::Token(verifier) => verifier.verify(token.unwrap_or_default()),
            Verification::Signature(_) => Ok(()),
        }
    }
}

fn respond(route: &str, result: Result<WebhookResponse, WebhookError>) -> WebhookResponse {
    result.unwrap_or_else(|e| {
        match &e {
            WebhookError::Verification(_) | WebhookError::ChallengeRejected => {
                warn!(route, error = %e, "Rejected unverified Slack request")
            }
            WebhookError::Payload(_) => debug!(route, error = %e, "Malformed Slack payload"),
            WebhookError::HandlerFailed { .. } => error!(route, error = %e, "Slack dispatch failed"),
        }
        e.into()
    })
}

fn outcome_response(route: &str, outcome: DispatchOutcome) -> Result<WebhookResponse, WebhookError> {
    if !outcome.is_success() {
        return Err(WebhookError::HandlerFailed {
            failed: outcome.failures.len(),
        });
    }
    trace!(route, invoked = outcome.invoked, awaited = outcome.awaited, "Slack dispatch finished");
    Ok(outcome.into())
}

// =============================================================================
// Events
// =============================================================================

pub(crate) async fn incoming_event(
    plugin: &SlackPlugin,
    request: WebhookRequest,
    app: AppContext,
) -> WebhookResponse {
    respond("slack:events", handle_event(plugin, &request, &app).await)
}

async fn handle_event(
    plugin: &SlackPlugin,
    request: &WebhookRequest,
    app: &AppContext,
) -> Result<WebhookResponse, WebhookError> {
    plugin.verify_signature(request)?;
    let envelope: Envelope = serde_json::from_slice(&request.body).map_err(PayloadError::from)?;
    let verified = plugin.verify_token(envelope.token.as_deref());

    if envelope.is_challenge() {
        verified.map_err(|_| WebhookError::ChallengeRejected)?;
        let challenge = envelope
            .challenge
            .ok_or(PayloadError::MissingField("challenge"))?;
        debug!("Answering Slack URL verification");
        return Ok(WebhookResponse::text(StatusCode::OK, challenge));
    }
    verified?;

    if envelope.kind != EVENT_CALLBACK {
        debug!(kind = %envelope.kind, "Ignoring Slack envelope");
        return Ok(WebhookResponse::ok());
    }

    let event = envelope.event.ok_or(PayloadError::MissingField("event"))?;
    let event_type = event
        .get("type")
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingField("event.type"))?;
    trace!(event_id = envelope.event_id.as_deref().unwrap_or("-"), event_type, "Incoming Slack event");

    if event_type == "message" {
        let message: SlackMessage = serde_json::from_value(event).map_err(PayloadError::from)?;
        return dispatch_message(plugin, message, app).await;
    }

    let event: SlackEvent = serde_json::from_value(event).map_err(PayloadError::from)?;
    let route = format!("slack:event:{}", event.event_type);
    let entries = plugin.events.dispatch(&event);
    let outcome = plugin
        .executor
        .execute_all(&route, Arc::new(event), entries, app)
        .await;
    outcome_response(&route, outcome)
}

async fn dispatch_message(
    plugin: &SlackPlugin,
    message: SlackMessage,
    app: &AppContext,
) -> Result<WebhookResponse, WebhookError> {
    let route = format!(
        "slack:message:{}",
        message.channel.as_deref().unwrap_or("-")
    );
    let jobs = plugin.gate.route(&plugin.messages, Arc::new(message));
    let outcome = plugin.executor.execute(&route, jobs, app).await;
    outcome_response(&route, outcome)
}

// =============================================================================
// Commands and actions
// =============================================================================

pub(crate) async fn incoming_command(
    plugin: &SlackPlugin,
    request: WebhookRequest,
    app: AppContext,
) -> WebhookResponse {
    respond("slack:commands", handle_command(plugin, &request, &app).await)
}

async fn handle_command(
    plugin: &SlackPlugin,
    request: &WebhookRequest,
    app: &AppContext,
) -> Result<WebhookResponse, WebhookError> {
    plugin.verify_signature(request)?;
    let command = SlackCommand::from_form(&request.body)?;
    plugin.verify_token(command.token.as_deref())?;

    let route = format!("slack:command:{}", command.command);
    let entries = plugin.commands.dispatch(&command);
    let outcome = plugin
        .executor
        .execute_all(&route, Arc::new(command), entries, app)
        .await;
    outcome_response(&route, outcome)
}

pub(crate) async fn incoming_action(
    plugin: &SlackPlugin,
    request: WebhookRequest,
    app: AppContext,
) -> WebhookResponse {
    respond("slack:actions", handle_action(plugin, &request, &app).await)
}

async fn handle_action(
    plugin: &SlackPlugin,
    request: &WebhookRequest,
    app: &AppContext,
) -> Result<WebhookResponse, WebhookError> {
    plugin.verify_signature(request)?;
    let action = SlackAction::from_form(&request.body)?;
    plugin.verify_token(action.token.as_deref())?;

    let route = format!("slack:action:{}", action.kind);
    let entries = plugin.actions.dispatch(&action);
    let outcome = plugin
        .executor
        .execute_all(&route, Arc::new(action), entries, app)
        .await;
    outcome_response(&route, outcome)
}
