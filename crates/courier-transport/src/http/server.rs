//! HTTP server.
//!
//! Mounts every plugin endpoint plus the diagnostic plugin listing on a
//! single axum [`Router`]:
//!
//! ```text
//! 0.0.0.0:8080
//! ├── GET  /courier/plugins  → JSON array of loaded plugin names
//! ├── POST /slack/events     → slack plugin
//! ├── POST /github           → github plugin
//! └── POST /readthedocs      → readthedocs plugin
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::{
    Json, Router,
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
};
use courier_core::{AppContext, Endpoint, ReplyBody, WebhookRequest, WebhookResponse};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{TransportError, TransportResult};

/// Path of the diagnostic endpoint listing loaded plugins.
pub const PLUGINS_PATH: &str = "/courier/plugins";

/// The built-in diagnostic endpoint.
pub fn plugins_endpoint() -> Endpoint {
    Endpoint::get(PLUGINS_PATH, |_request: WebhookRequest, app: AppContext| async move {
        WebhookResponse::json(StatusCode::OK, serde_json::json!(app.plugin_names()))
    })
}

/// Converts an endpoint response into an axum response.
pub fn into_response(response: WebhookResponse) -> Response {
    match response.body {
        ReplyBody::Empty => response.status.into_response(),
        ReplyBody::Text(text) => (response.status, text).into_response(),
        ReplyBody::Json(value) => (response.status, Json(value)).into_response(),
    }
}

/// Builds the router serving `endpoints` and the diagnostic endpoint.
///
/// Fails on duplicate method/path pairs instead of letting axum panic.
pub fn build_router(app: AppContext, endpoints: Vec<Endpoint>) -> TransportResult<Router> {
    let mut seen: HashSet<(Method, String)> = HashSet::new();
    let mut routes: Vec<(String, MethodRouter)> = Vec::new();

    for endpoint in std::iter::once(plugins_endpoint()).chain(endpoints) {
        let path = endpoint.path().to_owned();
        let method = endpoint.method().clone();

        if !path.starts_with('/') {
            return Err(TransportError::InvalidPath(path));
        }
        if !seen.insert((method.clone(), path.clone())) {
            return Err(TransportError::DuplicateRoute { method, path });
        }
        let filter =
            MethodFilter::try_from(method.clone()).map_err(|_| TransportError::UnsupportedMethod(method.clone()))?;

        debug!(method = %method, path = %path, "Mounting endpoint");
        let app = app.clone();
        let handler = move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let app = app.clone();
            let endpoint = endpoint.clone();
            async move {
                let request = WebhookRequest::new(method.clone(), uri.path(), headers, body);
                let response = endpoint.call(request, app).await;
                debug!(method = %method, path = %uri.path(), status = %response.status, "Request served");
                into_response(response)
            }
        };

        match routes.iter_mut().find(|(p, _)| *p == path) {
            Some((_, existing)) => {
                let merged = std::mem::take(existing).on(filter, handler);
                *existing = merged;
            }
            None => routes.push((path, MethodRouter::new().on(filter, handler))),
        }
    }

    Ok(routes
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| router.route(&path, method_router)))
}

/// A bound HTTP listener ready to serve a router.
pub struct WebhookServer {
    listener: TcpListener,
    router: Router,
}

impl WebhookServer {
    pub async fn bind(addr: &str, router: Router) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|source| TransportError::Bind {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self { listener, router })
    }

    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until `shutdown` is cancelled, then drains in-flight requests.
    pub async fn serve(self, shutdown: CancellationToken) -> TransportResult<()> {
        let addr = self.local_addr()?;
        info!(addr = %addr, "HTTP server listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!(addr = %addr, "HTTP server stopped");
        Ok(())
    }
}
