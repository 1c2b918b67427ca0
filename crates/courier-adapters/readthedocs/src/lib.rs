//! # Courier Read the Docs Adapter
//!
//! Runs per-project handlers when Read the Docs reports a finished build,
//! and triggers builds through a project's generic webhook.
//!
//! ```rust,ignore
//! use courier_adapter_readthedocs::{BuildNotification, RtdPlugin};
//!
//! let mut rtd = RtdPlugin::new();
//! rtd.register_project("courier", build_url, token, Vec::new());
//! rtd.register_handler("courier", |n: Arc<BuildNotification>, app: AppContext| async move {
//!     if !n.build.success {
//!         tracing::warn!(project = %n.slug, "Documentation build failed");
//!     }
//!     HandlerResult::Ok(None)
//! });
//! runtime.load_plugin(rtd)?;
//! ```

pub mod config;
pub mod notification;
mod plugin;

pub use config::{ProjectConfig, RtdConfig};
pub use notification::{BuildInfo, BuildNotification};
pub use plugin::{BuildError, DEFAULT_BRANCH, RtdPlugin, WEBHOOK_PATH};
