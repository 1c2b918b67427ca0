//! Shared application context.
//!
//! The context owns the outbound HTTP client and the frozen plugin list. It
//! is cheap to clone and handed to every endpoint and handler.

use std::fmt;
use std::sync::Arc;

use crate::plugin::{BoxedPlugin, Plugin};

/// Default outbound user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppInner>,
}

struct AppInner {
    http: reqwest::Client,
    user_agent: String,
    plugins: Vec<BoxedPlugin>,
}

impl AppContext {
    pub fn new(http: reqwest::Client, user_agent: impl Into<String>, plugins: Vec<BoxedPlugin>) -> Self {
        Self {
            inner: Arc::new(AppInner {
                http,
                user_agent: user_agent.into(),
                plugins,
            }),
        }
    }

    /// Shared outbound HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }

    /// Names of the loaded plugins, in load order.
    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.inner.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn plugins(&self) -> &[BoxedPlugin] {
        &self.inner.plugins
    }

    /// Returns the loaded plugin of concrete type `P`, if any.
    pub fn plugin<P: Plugin>(&self) -> Option<Arc<P>> {
        self.inner
            .plugins
            .iter()
            .find_map(|p| Arc::clone(p).as_any().downcast::<P>().ok())
    }

    /// Returns the loaded plugin registered under `name`.
    pub fn plugin_by_name(&self, name: &str) -> Option<&BoxedPlugin> {
        self.inner.plugins.iter().find(|p| p.name() == name)
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), DEFAULT_USER_AGENT, Vec::new())
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("user_agent", &self.inner.user_agent)
            .field("plugins", &self.plugin_names())
            .finish()
    }
}
