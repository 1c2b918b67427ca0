//! Small GitHub REST client.

use http::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use courier_core::{ApiError, ApiResult};

const MEDIA_TYPE: &str = "application/vnd.github+json";

/// REST client sharing the application's HTTP client.
///
/// Paths are relative to the configured API root, e.g. `repos/owner/name/issues`.
#[derive(Clone)]
pub struct GithubApi {
    http: Client,
    user_agent: String,
    token: Option<String>,
    api_url: String,
}

impl GithubApi {
    pub fn new(
        http: Client,
        user_agent: impl Into<String>,
        token: Option<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            user_agent: user_agent.into(),
            token,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, MEDIA_TYPE);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        debug!(path, "GET GitHub API");
        let response = self.request(self.http.get(self.url(path))).send().await?;
        Self::parse(response).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> ApiResult<Value> {
        debug!(path, "POST GitHub API");
        let response = self
            .request(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse(response: reqwest::Response) -> ApiResult<Value> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for GithubApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubApi")
            .field("api_url", &self.api_url)
            .field("user_agent", &self.user_agent)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    async fn whoami(headers: HeaderMap) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        Json(json!({
            "user_agent": header("user-agent"),
            "authorization": header("authorization"),
            "accept": header("accept"),
        }))
    }

    async fn mock_api() -> SocketAddr {
        let app = Router::new()
            .route("/user", get(whoami))
            .route("/missing", get(|| async { (http::StatusCode::NOT_FOUND, "Not Found") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    #[tokio::test]
    async fn sends_identity_headers() {
        let addr = mock_api().await;
        let api = GithubApi::new(
            Client::new(),
            "courier-test",
            Some("ghp_token".into()),
            format!("http://{addr}/"),
        );

        let echoed = api.get("/user").await.unwrap();

        assert_eq!(echoed["user_agent"], "courier-test");
        assert_eq!(echoed["authorization"], "Bearer ghp_token");
        assert_eq!(echoed["accept"], MEDIA_TYPE);
    }

    #[tokio::test]
    async fn anonymous_without_token() {
        let addr = mock_api().await;
        let api = GithubApi::new(Client::new(), "courier-test", None, format!("http://{addr}"));

        let echoed = api.get("user").await.unwrap();

        assert_eq!(echoed["authorization"], "");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let addr = mock_api().await;
        let api = GithubApi::new(Client::new(), "courier-test", None, format!("http://{addr}"));

        let err = api.get("missing").await.unwrap_err();

        assert!(matches!(err, ApiError::Status { status, .. } if status == http::StatusCode::NOT_FOUND));
    }
}
