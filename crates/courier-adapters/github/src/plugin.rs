//! The GitHub plugin.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use courier_core::{
    AppContext, BoxError, Endpoint, Executor, Handler, HandlerId, HandlerOptions,
    HubSignatureVerifier, PayloadError, Plugin, VerificationError, WebhookError, WebhookRequest,
    WebhookResponse,
};
use courier_framework::{EventRoute, EventRouter, Routes};

use crate::api::GithubApi;
use crate::config::{GithubConfig, GithubConfigError};
use crate::event::GithubEvent;

pub const WEBHOOK_PATH: &str = "/github";

pub const EVENT_HEADER: &str = "X-GitHub-Event";
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// GitHub webhook adapter.
///
/// The repository or organisation webhook must point at `<root>/github`
/// with content type `application/json` and the configured secret.
pub struct GithubPlugin {
    config: GithubConfig,
    verifier: HubSignatureVerifier,
    executor: Executor,
    router: EventRouter<GithubEvent>,
}

impl GithubPlugin {
    pub fn new(config: GithubConfig) -> Result<Self, GithubConfigError> {
        config.validate()?;
        Ok(Self {
            verifier: HubSignatureVerifier::new(config.secret.as_bytes()),
            executor: Executor::default(),
            router: EventRouter::new(),
            config,
        })
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// REST client authenticated with the configured token.
    pub fn api(&self, app: &AppContext) -> GithubApi {
        GithubApi::new(
            app.http().clone(),
            app.user_agent(),
            self.config.token.clone(),
            &self.config.api_url,
        )
    }

    /// Registers `handler` for every delivery of `event`.
    pub fn on_event<H>(&mut self, event: &str, handler: H, options: HandlerOptions) -> HandlerId
    where
        H: Handler<GithubEvent>,
    {
        self.router.register(event, handler, options)
    }

    /// Registers `handler` for `event` narrowed by action and repository (`owner/name`).
    pub fn on_event_detail<H>(
        &mut self,
        event: &str,
        action: Option<&str>,
        repository: Option<&str>,
        handler: H,
        options: HandlerOptions,
    ) -> HandlerId
    where
        H: Handler<GithubEvent>,
    {
        let mut route = EventRoute::new(event);
        if let Some(action) = action {
            route = route.sub_type(action);
        }
        if let Some(repository) = repository {
            route = route.sub_sub_type(repository);
        }
        self.router.register(route, handler, options)
    }

    async fn incoming(&self, request: WebhookRequest, app: AppContext) -> WebhookResponse {
        self.handle(&request, &app).await.unwrap_or_else(|e| {
            match &e {
                WebhookError::Verification(_) => warn!(error = %e, "GitHub webhook failed verification"),
                WebhookError::Payload(_) => debug!(error = %e, "Malformed GitHub webhook"),
                _ => error!(error = %e, "GitHub dispatch failed"),
            }
            e.into()
        })
    }

    async fn handle(&self, request: &WebhookRequest, app: &AppContext) -> Result<WebhookResponse, WebhookError> {
        let signature = request
            .header(SIGNATURE_HEADER)
            .ok_or(VerificationError::MissingHeader(SIGNATURE_HEADER))?;
        self.verifier.verify(signature, &request.body)?;

        let header = |name: &'static str| request.header(name).ok_or(PayloadError::MissingHeader(name));
        let event = header(EVENT_HEADER)?;
        let delivery = header(DELIVERY_HEADER)?;
        let event = GithubEvent::from_body(event, delivery, &request.body)?;
        trace!(event = %event.event, delivery = %event.delivery_id, "Incoming GitHub event");

        let route = format!("github:{}", event.event);
        let entries = self.router.dispatch(&event);
        let outcome = self
            .executor
            .execute_all(&route, Arc::new(event), entries, app)
            .await;

        if !outcome.is_success() {
            return Err(WebhookError::HandlerFailed {
                failed: outcome.failures.len(),
            });
        }
        Ok(outcome.into())
    }
}

#[async_trait]
impl Plugin for GithubPlugin {
    fn name(&self) -> &'static str {
        "github"
    }

    fn endpoints(self: Arc<Self>) -> Vec<Endpoint> {
        vec![Endpoint::post(WEBHOOK_PATH, move |request, app| {
            let plugin = Arc::clone(&self);
            async move { plugin.incoming(request, app).await }
        })]
    }

    async fn on_startup(&self, _app: &AppContext) -> Result<(), BoxError> {
        info!(
            handlers = self.router.handler_count(),
            authenticated = self.config.token.is_some(),
            "GitHub plugin ready"
        );
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use courier_core::HandlerResult;
    use http::{HeaderMap, HeaderValue, Method, StatusCode};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "It's a Secret to Everybody";

    fn endpoint(plugin: GithubPlugin) -> Endpoint {
        Arc::new(plugin).endpoints().remove(0)
    }

    fn delivery(event: &str, body: &str, signature: Option<String>) -> WebhookRequest {
        let mut headers = HeaderMap::new();
        headers.insert(EVENT_HEADER, HeaderValue::from_str(event).unwrap());
        headers.insert(DELIVERY_HEADER, HeaderValue::from_static("72d3162e-cc78-11e3-81ab-4c9367dc0958"));
        if let Some(signature) = signature {
            headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&signature).unwrap());
        }
        WebhookRequest::new(Method::POST, WEBHOOK_PATH, headers, body.to_owned())
    }

    fn signed(event: &str, body: &str) -> WebhookRequest {
        let signature = HubSignatureVerifier::new(SECRET).sign(body.as_bytes());
        delivery(event, body, Some(signature))
    }

    fn counter(
        calls: &Arc<AtomicUsize>,
    ) -> impl Fn(Arc<GithubEvent>, AppContext) -> std::future::Ready<HandlerResult> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move |_event: Arc<GithubEvent>, _app: AppContext| {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(None))
        }
    }

    #[test]
    fn new_requires_secret() {
        assert_eq!(
            GithubPlugin::new(GithubConfig::default()).err(),
            Some(GithubConfigError::MissingSecret)
        );
    }

    #[tokio::test]
    async fn signed_delivery_is_dispatched() {
        let all = Arc::new(AtomicUsize::new(0));
        let opened_here = Arc::new(AtomicUsize::new(0));
        let mut plugin = GithubPlugin::new(GithubConfig::new(SECRET)).unwrap();
        plugin.on_event("issues", counter(&all), HandlerOptions::new());
        plugin.on_event_detail(
            "issues",
            Some("opened"),
            Some("courier-rs/courier"),
            counter(&opened_here),
            HandlerOptions::new(),
        );
        let endpoint = endpoint(plugin);

        let opened = json!({ "action": "opened", "repository": { "full_name": "courier-rs/courier" } });
        let closed = json!({ "action": "closed", "repository": { "full_name": "courier-rs/courier" } });
        for body in [opened, closed] {
            let response = endpoint
                .call(signed("issues", &body.to_string()), AppContext::default())
                .await;
            assert_eq!(response, WebhookResponse::ok());
        }

        assert_eq!(all.load(Ordering::SeqCst), 2);
        assert_eq!(opened_here.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bad_signature_is_unauthorized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut plugin = GithubPlugin::new(GithubConfig::new(SECRET)).unwrap();
        plugin.on_event("push", counter(&calls), HandlerOptions::new());
        let endpoint = endpoint(plugin);

        let body = r#"{"ref": "refs/heads/main"}"#;
        let forged = HubSignatureVerifier::new("wrong").sign(body.as_bytes());

        let response = endpoint
            .call(delivery("push", body, Some(forged)), AppContext::default())
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        let response = endpoint
            .call(delivery("push", body, Some("sha1=abc".into())), AppContext::default())
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_signature_is_unauthorized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut plugin = GithubPlugin::new(GithubConfig::new(SECRET)).unwrap();
        plugin.on_event("push", counter(&calls), HandlerOptions::new());
        let endpoint = endpoint(plugin);

        let response = endpoint
            .call(delivery("push", "{}", None), AppContext::default())
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);

        // Verification runs before the body or the other headers are read.
        let mut bare = delivery("push", "{not json", None);
        bare.headers.remove(EVENT_HEADER);
        let response = endpoint.call(bare, AppContext::default()).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_headers_and_bad_json_are_bad_requests() {
        let endpoint = endpoint(GithubPlugin::new(GithubConfig::new(SECRET)).unwrap());

        let mut no_event = signed("push", "{}");
        no_event.headers.remove(EVENT_HEADER);
        let response = endpoint.call(no_event, AppContext::default()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let response = endpoint
            .call(signed("push", "{not json"), AppContext::default())
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn awaited_failure_is_a_server_error() {
        let mut plugin = GithubPlugin::new(GithubConfig::new(SECRET)).unwrap();
        plugin.on_event(
            "ping",
            |_event: Arc<GithubEvent>, _app: AppContext| async { HandlerResult::Err("boom".into()) },
            HandlerOptions::new(),
        );
        let endpoint = endpoint(plugin);

        let response = endpoint
            .call(signed("ping", r#"{"zen": "Design for failure."}"#), AppContext::default())
            .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unrouted_event_is_acknowledged() {
        let endpoint = endpoint(GithubPlugin::new(GithubConfig::new(SECRET)).unwrap());
        let response = endpoint
            .call(signed("star", r#"{"action": "created"}"#), AppContext::default())
            .await;
        assert_eq!(response, WebhookResponse::ok());
    }
}
