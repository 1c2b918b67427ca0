//! Minimal Slack Web API client.
//!
//! ```rust,ignore
//! let slack = app.plugin::<SlackPlugin>().ok_or("slack plugin not loaded")?;
//! slack.api(&app).post_message("C123", "deployed").await?;
//! ```

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, trace};

use courier_core::{ApiError, ApiResult};

/// Web API client sharing the application's HTTP client.
#[derive(Debug, Clone)]
pub struct SlackApi {
    http: Client,
    token: String,
    api_url: String,
}

impl SlackApi {
    pub fn new(http: Client, token: impl Into<String>, api_url: impl Into<String>) -> Self {
        let mut api_url = api_url.into();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        Self {
            http,
            token: token.into(),
            api_url,
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}{}", self.api_url, method.trim_start_matches('/'))
    }

    /// Calls a read-style method with form-encoded arguments.
    pub async fn query(&self, method: &str, params: &[(&str, &str)]) -> ApiResult<Value> {
        debug!(method, "Calling Slack API");
        let response = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.token)
            .form(params)
            .send()
            .await?;
        Self::parse(method, response).await
    }

    /// Calls a write-style method with a JSON body.
    pub async fn post_json(&self, method: &str, body: &Value) -> ApiResult<Value> {
        debug!(method, "Calling Slack API");
        let response = self
            .http
            .post(self.url(method))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::parse(method, response).await
    }

    async fn parse(method: &str, response: reqwest::Response) -> ApiResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let body: Value = response.json().await?;
        trace!(method, response = %body, "Slack API response");

        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            return Err(ApiError::Api { message });
        }
        Ok(body)
    }

    /// `users.info`.
    pub async fn users_info(&self, user: &str) -> ApiResult<Value> {
        self.query("users.info", &[("user", user)]).await
    }

    /// `chat.postMessage`.
    pub async fn post_message(&self, channel: &str, text: &str) -> ApiResult<Value> {
        self.post_json("chat.postMessage", &json!({ "channel": channel, "text": text }))
            .await
    }

    /// `chat.postMessage` in the thread of `thread_ts`.
    pub async fn reply_in_thread(&self, channel: &str, thread_ts: &str, text: &str) -> ApiResult<Value> {
        self.post_json(
            "chat.postMessage",
            &json!({ "channel": channel, "thread_ts": thread_ts, "text": text }),
        )
        .await
    }
}
