//! # Courier
//!
//! A plugin-hosted webhook dispatcher. Each plugin owns a set of HTTP
//! endpoints; incoming requests are verified, decoded and routed to the
//! handlers registered for them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌────────────┐     ┌──────────────┐
//! │   Runtime   │────▶│ Plugin endpoint  │────▶│   Router   │────▶│   Executor   │
//! │ (axum, cfg) │     │ verify + decode  │     │ (+ gate)   │     │ wait / fire  │
//! └─────────────┘     └──────────────────┘     └────────────┘     └──────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging, plugin lifecycle and the HTTP server
//! - **Plugins**: Slack, GitHub and Read the Docs adapters
//! - **Routers**: map payload keys to handlers; the message gate filters chat traffic
//! - **Executor**: runs handlers, waiting for those that shape the response
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//! use courier::slack::{SlackConfig, SlackMessage, SlackPlugin};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = CourierRuntime::new();
//!
//!     let mut slack = SlackPlugin::new(runtime.plugin_config::<SlackConfig>("slack")?)?;
//!     slack.on_message("^hello", |message: Arc<SlackMessage>, _app: AppContext| async move {
//!         HandlerResult::Ok(Some(Reply::text(format!("hi <@{}>", message.user.as_deref().unwrap_or("there")))))
//!     }, HandlerOptions::new().mention(true))?;
//!
//!     runtime.load_plugin(slack)?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `slack`, `github`, `readthedocs`: provider adapters (all default)
//! - `toml-config` (default), `yaml-config`: configuration file formats
//! - `json-log`: JSON log output

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;
pub use courier_transport as transport;

#[cfg(feature = "github")]
pub use courier_adapter_github as github;
#[cfg(feature = "readthedocs")]
pub use courier_adapter_readthedocs as readthedocs;
#[cfg(feature = "slack")]
pub use courier_adapter_slack as slack;

/// Commonly used types for wiring plugins and writing handlers.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime
    pub use courier_runtime::{CourierRuntime, RuntimeError, RuntimeHandle};

    // Handlers
    pub use courier_core::{
        AppContext, BoxError, Handler, HandlerId, HandlerOptions, HandlerResult, Reply,
    };

    // Plugin authoring
    pub use courier_core::{Endpoint, Plugin, WebhookRequest, WebhookResponse, async_trait};

    // Logging
    pub use courier_runtime::prelude::*;
}
