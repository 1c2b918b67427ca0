//! # Courier Slack Adapter
//!
//! Receives Slack Events API callbacks, slash commands and interactive
//! component payloads, and routes them to registered handlers.
//!
//! ## Example
//!
//! ```rust,ignore
//! use courier_adapter_slack::{SlackConfig, SlackMessage, SlackPlugin};
//! use courier_core::{AppContext, HandlerOptions, HandlerResult};
//!
//! let config: SlackConfig = runtime.plugin_config("slack")?;
//! let mut slack = SlackPlugin::new(config)?;
//!
//! slack.on_message("^ping$", |message: Arc<SlackMessage>, app: AppContext| async move {
//!     let slack = app.plugin::<SlackPlugin>().ok_or("slack plugin not loaded")?;
//!     if let Some(channel) = message.channel.as_deref() {
//!         slack.api(&app).post_message(channel, "pong").await?;
//!     }
//!     HandlerResult::Ok(None)
//! }, HandlerOptions::new().mention(true))?;
//!
//! runtime.load_plugin(slack)?;
//! ```

pub mod api;
pub mod config;
mod endpoints;
pub mod model;
mod plugin;

pub use api::SlackApi;
pub use config::{DEFAULT_API_URL, SlackConfig, SlackConfigError};
pub use endpoints::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use model::{
    ActionElement, ActionKind, Envelope, SlackAction, SlackCommand, SlackEvent, SlackMessage,
};
pub use plugin::{ACTIONS_PATH, COMMANDS_PATH, EVENTS_PATH, SlackPlugin};
