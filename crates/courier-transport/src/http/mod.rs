//! HTTP transport.
//!
//! This module provides the inbound webhook server and the outbound client.

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::{HttpClientOptions, build_client};

#[cfg(feature = "http-server")]
mod server;
#[cfg(feature = "http-server")]
pub use server::{PLUGINS_PATH, WebhookServer, build_router, into_response, plugins_endpoint};
