//! # Courier Transport
//!
//! HTTP plumbing for the Courier webhook dispatcher.
//!
//! ## Features
//!
//! - `http-server`: axum server mounting plugin endpoints
//! - `http-client`: shared reqwest client construction
//! - `full`: both
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Plugins            │  (Slack, GitHub, Read the Docs)
//! │  (endpoints)        │
//! ├─────────────────────┤
//! │  courier-core       │  (Endpoint, WebhookRequest/Response)
//! ├─────────────────────┤
//! │  courier-transport  │  <- This crate (axum / reqwest)
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```

pub mod error;

#[cfg(any(feature = "http-client", feature = "http-server"))]
pub mod http;

pub use error::{TransportError, TransportResult};

#[cfg(feature = "http-client")]
pub use http::{HttpClientOptions, build_client};

#[cfg(feature = "http-server")]
pub use http::{PLUGINS_PATH, WebhookServer, build_router, into_response};
