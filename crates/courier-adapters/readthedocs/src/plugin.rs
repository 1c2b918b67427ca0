//! The Read the Docs plugin.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::USER_AGENT;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use courier_core::{
    ApiError, AppContext, BoxError, BoxedHandler, Endpoint, Executor, Handler, HandlerEntry,
    HandlerId, HandlerOptions, PayloadError, Plugin, WebhookError, WebhookRequest, WebhookResponse,
};

use crate::config::{ProjectConfig, RtdConfig};
use crate::notification::BuildNotification;

pub const WEBHOOK_PATH: &str = "/readthedocs";

/// Branch built when none is given.
pub const DEFAULT_BRANCH: &str = "latest";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unknown project '{0}'")]
    UnknownProject(String),

    #[error("project '{0}' has no build URL")]
    NoBuildTrigger(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Default)]
struct Project {
    trigger: Option<ProjectConfig>,
    handlers: Vec<HandlerEntry<BuildNotification>>,
}

/// Read the Docs adapter.
///
/// Build notifications arrive on `POST /readthedocs` and run every handler
/// of the project named by `slug`. The response waits for all of them.
#[derive(Default)]
pub struct RtdPlugin {
    projects: HashMap<String, Project>,
    executor: Executor,
}

impl RtdPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugin with the projects declared in `config`.
    pub fn from_config(config: RtdConfig) -> Self {
        let mut plugin = Self::new();
        for (slug, project) in config.projects {
            plugin.register_project(&slug, project.build_url, project.token, Vec::new());
        }
        plugin
    }

    /// Registers or updates the build trigger of `project`.
    ///
    /// A non-empty `handlers` list replaces the project's handlers; an empty
    /// one keeps those registered so far.
    pub fn register_project(
        &mut self,
        project: &str,
        build_url: impl Into<String>,
        token: impl Into<String>,
        handlers: Vec<BoxedHandler<BuildNotification>>,
    ) {
        let entry = self.projects.entry(project.to_owned()).or_default();
        entry.trigger = Some(ProjectConfig {
            build_url: build_url.into(),
            token: token.into(),
        });
        if !handlers.is_empty() {
            entry.handlers = handlers
                .into_iter()
                .map(|handler| HandlerEntry::from_boxed(handler, HandlerOptions::new()))
                .collect();
        }
        debug!(project, handlers = entry.handlers.len(), "Registered Read the Docs project");
    }

    /// Appends `handler` to `project`, creating the project if needed.
    pub fn register_handler<H>(&mut self, project: &str, handler: H) -> HandlerId
    where
        H: Handler<BuildNotification>,
    {
        let entry = HandlerEntry::new(handler, HandlerOptions::new());
        let id = entry.id();
        self.projects
            .entry(project.to_owned())
            .or_default()
            .handlers
            .push(entry);
        debug!(project, handler = %id, "Registered Read the Docs handler");
        id
    }

    pub fn has_project(&self, project: &str) -> bool {
        self.projects.contains_key(project)
    }

    /// Handlers of `project` in registration order.
    pub fn handlers(&self, project: &str) -> Option<Vec<HandlerId>> {
        self.projects
            .get(project)
            .map(|p| p.handlers.iter().map(HandlerEntry::id).collect())
    }

    /// Triggers a build of `branch` (default [`DEFAULT_BRANCH`]).
    pub async fn build(&self, app: &AppContext, project: &str, branch: Option<&str>) -> Result<(), BuildError> {
        let trigger = self
            .projects
            .get(project)
            .ok_or_else(|| BuildError::UnknownProject(project.to_owned()))?
            .trigger
            .as_ref()
            .ok_or_else(|| BuildError::NoBuildTrigger(project.to_owned()))?;
        let branch = branch.unwrap_or(DEFAULT_BRANCH);

        info!(project, branch, "Triggering Read the Docs build");
        let response = app
            .http()
            .post(&trigger.build_url)
            .header(USER_AGENT, app.user_agent())
            .json(&json!({ "branch": branch, "token": trigger.token }))
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body }.into());
        }
        Ok(())
    }

    async fn incoming(&self, request: WebhookRequest, app: AppContext) -> WebhookResponse {
        self.handle(&request, &app).await.unwrap_or_else(|e| {
            match &e {
                WebhookError::HandlerFailed { .. } => error!(error = %e, "Read the Docs dispatch failed"),
                _ => debug!(error = %e, "Rejected Read the Docs notification"),
            }
            e.into()
        })
    }

    async fn handle(&self, request: &WebhookRequest, app: &AppContext) -> Result<WebhookResponse, WebhookError> {
        let notification = BuildNotification::from_body(&request.body)?;
        let project = self
            .projects
            .get(&notification.slug)
            .ok_or_else(|| PayloadError::UnknownTarget(notification.slug.clone()))?;
        debug!(
            project = %notification.slug,
            success = notification.build.success,
            "Incoming Read the Docs notification"
        );

        let route = format!("readthedocs:{}", notification.slug);
        let outcome = self
            .executor
            .execute_all(&route, Arc::new(notification), project.handlers.clone(), app)
            .await;

        if !outcome.is_success() {
            return Err(WebhookError::HandlerFailed {
                failed: outcome.failures.len(),
            });
        }
        Ok(WebhookResponse::ok())
    }
}

#[async_trait]
impl Plugin for RtdPlugin {
    fn name(&self) -> &'static str {
        "readthedocs"
    }

    fn endpoints(self: Arc<Self>) -> Vec<Endpoint> {
        vec![Endpoint::post(WEBHOOK_PATH, move |request, app| {
            let plugin = Arc::clone(&self);
            async move { plugin.incoming(request, app).await }
        })]
    }

    async fn on_startup(&self, _app: &AppContext) -> Result<(), BoxError> {
        info!(projects = self.projects.len(), "Read the Docs plugin ready");
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::routing::post;
    use axum::{Json, Router};
    use courier_core::HandlerResult;
    use http::{HeaderMap, Method, StatusCode};
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::*;

    const NOTIFICATION: &str = r#"{
        "build": { "date": "2018-03-02 11:33:05", "id": 6831644, "success": false },
        "name": "Courier",
        "slug": "courier"
    }"#;

    fn noop() -> impl Fn(Arc<BuildNotification>, AppContext) -> std::future::Ready<HandlerResult> + Send + Sync + 'static {
        |_notification: Arc<BuildNotification>, _app: AppContext| std::future::ready(Ok(None))
    }

    fn request(body: &str) -> WebhookRequest {
        WebhookRequest::new(Method::POST, WEBHOOK_PATH, HeaderMap::new(), body.to_owned())
    }

    fn endpoint(plugin: RtdPlugin) -> Endpoint {
        Arc::new(plugin).endpoints().remove(0)
    }

    #[test]
    fn handlers_keep_registration_order() {
        let mut plugin = RtdPlugin::new();
        let first = plugin.register_handler("courier", noop());
        let second = plugin.register_handler("courier", noop());

        assert_eq!(plugin.handlers("courier"), Some(vec![first, second]));
    }

    #[test]
    fn project_registration_keeps_earlier_handlers() {
        let mut plugin = RtdPlugin::new();
        let id = plugin.register_handler("courier", noop());
        plugin.register_project("courier", "https://example.com", "aaaaaa", Vec::new());

        assert_eq!(plugin.handlers("courier"), Some(vec![id]));
    }

    #[test]
    fn project_registration_replaces_handlers_when_given() {
        let mut plugin = RtdPlugin::new();
        plugin.register_handler("courier", noop());
        let handlers: Vec<BoxedHandler<BuildNotification>> = vec![Arc::new(noop()), Arc::new(noop())];
        plugin.register_project("courier", "https://example.com", "aaaaaa", handlers);

        assert_eq!(plugin.handlers("courier").map(|h| h.len()), Some(2));
        assert!(plugin.has_project("courier"));
    }

    #[test]
    fn projects_from_config() {
        let config = RtdConfig {
            projects: HashMap::from([(
                "courier".to_string(),
                ProjectConfig {
                    build_url: "https://example.com".into(),
                    token: "aaaaaa".into(),
                },
            )]),
        };
        let plugin = RtdPlugin::from_config(config);
        assert!(plugin.has_project("courier"));
        assert_eq!(plugin.handlers("courier"), Some(Vec::new()));
    }

    async fn mock_trigger() -> (SocketAddr, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/build",
            post(move |Json(body): Json<Value>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(body);
                    Json(json!({ "build_triggered": true }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (addr, rx)
    }

    #[tokio::test]
    async fn build_posts_branch_and_token() {
        let (addr, mut received) = mock_trigger().await;
        let mut plugin = RtdPlugin::new();
        plugin.register_project("courier", format!("http://{addr}/build"), "aaaaaa", Vec::new());
        let app = AppContext::default();

        plugin.build(&app, "courier", None).await.unwrap();
        plugin.build(&app, "courier", Some("dev")).await.unwrap();

        assert_eq!(received.recv().await, Some(json!({ "branch": "latest", "token": "aaaaaa" })));
        assert_eq!(received.recv().await, Some(json!({ "branch": "dev", "token": "aaaaaa" })));
    }

    #[tokio::test]
    async fn build_needs_a_trigger() {
        let mut plugin = RtdPlugin::new();
        plugin.register_handler("courier", noop());
        let app = AppContext::default();

        assert!(matches!(
            plugin.build(&app, "courier", None).await,
            Err(BuildError::NoBuildTrigger(_))
        ));
        assert!(matches!(
            plugin.build(&app, "unknown", None).await,
            Err(BuildError::UnknownProject(_))
        ));
    }

    #[tokio::test]
    async fn notification_runs_project_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut plugin = RtdPlugin::new();
        let counter = Arc::clone(&calls);
        plugin.register_handler("courier", move |notification: Arc<BuildNotification>, _app: AppContext| {
            let counter = Arc::clone(&counter);
            async move {
                assert_eq!(notification.build.id, Some(6831644));
                counter.fetch_add(1, Ordering::SeqCst);
                HandlerResult::Ok(None)
            }
        });
        let endpoint = endpoint(plugin);

        let response = endpoint.call(request(NOTIFICATION), AppContext::default()).await;

        assert_eq!(response, WebhookResponse::ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_error_is_a_server_error() {
        let mut plugin = RtdPlugin::new();
        plugin.register_handler("courier", |_n: Arc<BuildNotification>, _app: AppContext| async {
            HandlerResult::Err("build hook failed".into())
        });
        let endpoint = endpoint(plugin);

        let response = endpoint.call(request(NOTIFICATION), AppContext::default()).await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn project_without_handlers_is_acknowledged() {
        let mut plugin = RtdPlugin::new();
        plugin.register_project("courier", "https://example.com", "aaaaaa", Vec::new());
        let endpoint = endpoint(plugin);

        let response = endpoint.call(request(NOTIFICATION), AppContext::default()).await;

        assert_eq!(response, WebhookResponse::ok());
    }

    #[tokio::test]
    async fn bad_notifications_are_bad_requests() {
        let endpoint = endpoint(RtdPlugin::new());

        for body in [
            NOTIFICATION,
            r#"{"a": "b"}"#,
            r#"{"build": {"id": 1, "success": true}, "name": "Courier"}"#,
            "{",
        ] {
            let response = endpoint.call(request(body), AppContext::default()).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        }
    }
}
