//! Runtime error types.

use courier_transport::TransportError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A plugin's configuration section could not be deserialized.
    #[error("Invalid configuration for plugin '{plugin}': {reason}")]
    PluginConfig { plugin: String, reason: String },

    /// A plugin with the same name is already loaded.
    #[error("Plugin already loaded: {0}")]
    PluginExists(String),

    /// A startup hook failed; the runtime does not serve traffic.
    #[error("Startup hook of plugin '{plugin}' failed: {reason}")]
    Startup { plugin: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Installing a shutdown signal handler failed.
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),
}

impl RuntimeError {
    pub fn plugin_config(plugin: impl Into<String>, reason: impl ToString) -> Self {
        Self::PluginConfig {
            plugin: plugin.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
