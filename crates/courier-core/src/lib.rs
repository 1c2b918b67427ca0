//! # Courier Core
//!
//! Core abstractions of the Courier webhook dispatcher.
//!
//! ## Building Blocks
//!
//! - **Handlers**: async callables over a decoded payload ([`Handler`], [`HandlerEntry`], [`HandlerOptions`])
//! - **Executor**: runs resolved handlers with wait / fire-and-forget semantics ([`Executor`], [`DispatchOutcome`])
//! - **Verification**: shared-token and HMAC request authentication ([`Verification`])
//! - **Plugins**: named units contributing endpoints and lifecycle hooks ([`Plugin`], [`Endpoint`])
//! - **Application context**: shared HTTP client and frozen plugin registry ([`AppContext`])
//!
//! ## Request Flow
//!
//! ```text
//! ┌───────────┐    ┌────────────┐    ┌──────────┐    ┌──────────┐
//! │  Endpoint │───▶│ Verifier   │───▶│  Router  │───▶│ Executor │
//! │ (adapter) │    │ token/HMAC │    │ (lookup) │    │ (tasks)  │
//! └───────────┘    └────────────┘    └──────────┘    └──────────┘
//! ```

pub mod app;
pub mod error;
pub mod executor;
pub mod handler;
pub mod plugin;
pub mod reply;
pub mod verify;

pub use app::{AppContext, DEFAULT_USER_AGENT};
pub use error::{
    ApiError, ApiResult, BoxError, PayloadError, RegistrationError, VerificationError, WebhookError,
};
pub use executor::{DispatchOutcome, Executor, HandlerFailure, Job, ReplyPolicy};
pub use handler::{
    BoxFuture, BoxedHandler, Handler, HandlerEntry, HandlerId, HandlerOptions, HandlerResult,
};
pub use plugin::{BoxedPlugin, Endpoint, EndpointFn, Plugin, WebhookRequest};
pub use reply::{Reply, ReplyBody, WebhookResponse};
pub use verify::{
    DEFAULT_SIGNATURE_MAX_AGE, HubSignatureVerifier, SignatureVerifier, TokenVerifier, Verification,
};

// Re-exported so plugin crates implement `Plugin` without a direct dependency.
pub use async_trait::async_trait;
