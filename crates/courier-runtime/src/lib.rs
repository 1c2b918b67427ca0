//! Courier Runtime - orchestration layer for the Courier webhook dispatcher.
//!
//! This crate provides:
//! - Layered configuration (`courier.toml`, `COURIER_*` environment, per-plugin sections)
//! - Logging setup from configuration
//! - Plugin loading and the runtime lifecycle (`CourierRuntime`)
//!
//! ```ignore
//! use courier_runtime::CourierRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = CourierRuntime::new();
//!     runtime.load_plugin(MyPlugin::default())?;
//!
//!     // Serve until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use registry::PluginRegistry;
pub use runtime::{CourierRuntime, RuntimeBuilder, RuntimeHandle};

pub use tracing;

/// Logging macros for plugin and handler code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
