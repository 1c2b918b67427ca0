//! # Courier GitHub Adapter
//!
//! Receives GitHub webhooks on `POST /github`, checks `X-Hub-Signature-256`
//! and routes each delivery by event, action and repository.
//!
//! ```rust,ignore
//! use courier_adapter_github::{GithubConfig, GithubEvent, GithubPlugin};
//!
//! let mut github = GithubPlugin::new(runtime.plugin_config::<GithubConfig>("github")?)?;
//! github.on_event_detail("pull_request", Some("opened"), None, |event: Arc<GithubEvent>, app: AppContext| async move {
//!     tracing::info!(repository = ?event.repository(), "New pull request");
//!     HandlerResult::Ok(None)
//! }, HandlerOptions::new());
//! runtime.load_plugin(github)?;
//! ```

pub mod api;
pub mod config;
pub mod event;
mod plugin;

pub use api::GithubApi;
pub use config::{GithubConfig, GithubConfigError};
pub use event::GithubEvent;
pub use plugin::{DELIVERY_HEADER, EVENT_HEADER, GithubPlugin, SIGNATURE_HEADER, WEBHOOK_PATH};
