//! Outbound HTTP client construction.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::debug;

use crate::error::{TransportError, TransportResult};

/// Settings of the shared outbound client.
#[derive(Debug, Clone)]
pub struct HttpClientOptions {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            user_agent: courier_core::DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Builds the client every plugin shares through the application context.
pub fn build_client(options: &HttpClientOptions) -> TransportResult<Client> {
    debug!(user_agent = %options.user_agent, timeout = ?options.timeout, "Building HTTP client");
    ClientBuilder::new()
        .user_agent(options.user_agent.as_str())
        .timeout(options.timeout)
        .build()
        .map_err(|e| TransportError::Client(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_build() {
        let options = HttpClientOptions::default();
        assert!(options.user_agent.starts_with("courier/"));
        assert!(build_client(&options).is_ok());
    }
}
