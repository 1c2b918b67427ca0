//! Plugin abstraction.
//!
//! A plugin is a named unit that contributes HTTP endpoints to the host and
//! may run hooks when the host starts and stops. Endpoints receive a
//! transport-independent [`WebhookRequest`] and answer with a
//! [`WebhookResponse`]; the transport layer does the HTTP plumbing.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::app::AppContext;
use crate::error::BoxError;
use crate::handler::BoxFuture;
use crate::reply::WebhookResponse;

/// An inbound HTTP request as seen by an endpoint.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl WebhookRequest {
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            body: body.into(),
        }
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Type-erased endpoint callback.
pub type EndpointFn = Arc<dyn Fn(WebhookRequest, AppContext) -> BoxFuture<'static, WebhookResponse> + Send + Sync>;

/// An HTTP route contributed by a plugin.
#[derive(Clone)]
pub struct Endpoint {
    method: Method,
    path: String,
    handler: EndpointFn,
}

impl Endpoint {
    pub fn new<F, Fut>(method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(WebhookRequest, AppContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WebhookResponse> + Send + 'static,
    {
        Self {
            method,
            path: path.into(),
            handler: Arc::new(move |request, app| Box::pin(handler(request, app))),
        }
    }

    pub fn post<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(WebhookRequest, AppContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WebhookResponse> + Send + 'static,
    {
        Self::new(Method::POST, path, handler)
    }

    pub fn get<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(WebhookRequest, AppContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WebhookResponse> + Send + 'static,
    {
        Self::new(Method::GET, path, handler)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn call(&self, request: WebhookRequest, app: AppContext) -> WebhookResponse {
        (self.handler)(request, app).await
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// A named unit registered with the host.
///
/// Plugins are loaded before the host starts and frozen afterwards; routing
/// tables are therefore immutable while requests are served.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Unique name under which the plugin is registered.
    fn name(&self) -> &'static str;

    /// HTTP endpoints this plugin serves.
    fn endpoints(self: Arc<Self>) -> Vec<Endpoint>;

    /// Runs once before the server accepts traffic.
    async fn on_startup(&self, _app: &AppContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs once after the server stopped accepting traffic.
    async fn on_shutdown(&self, _app: &AppContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Upcast used for typed lookups through [`AppContext::plugin`].
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A type-erased, shareable plugin.
pub type BoxedPlugin = Arc<dyn Plugin>;

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    #[tokio::test]
    async fn endpoint_forwards_to_handler() {
        let endpoint = Endpoint::post("/hook", |request: WebhookRequest, _app: AppContext| async move {
            WebhookResponse::text(StatusCode::OK, String::from_utf8_lossy(&request.body).into_owned())
        });
        assert_eq!(endpoint.method(), &Method::POST);
        assert_eq!(endpoint.path(), "/hook");

        let request = WebhookRequest::new(Method::POST, "/hook", HeaderMap::new(), "ping");
        let response = endpoint.call(request, AppContext::default()).await;
        assert_eq!(response, WebhookResponse::text(StatusCode::OK, "ping"));
    }

    #[test]
    fn header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("x-test", "value".parse().unwrap());
        let request = WebhookRequest::new(Method::GET, "/", headers, Bytes::new());
        assert_eq!(request.header("X-Test"), Some("value"));
        assert_eq!(request.header("missing"), None);
    }
}
