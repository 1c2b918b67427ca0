//! Handler capability.
//!
//! A handler is any async function (or closure) taking the decoded payload
//! and the shared [`AppContext`], returning an optional [`Reply`]. The
//! blanket implementation below covers every such function, similar to
//! Axum's handler system, so plain `async fn`s register directly:
//!
//! ```rust,ignore
//! async fn greet(message: Arc<Message>, app: AppContext) -> HandlerResult {
//!     Ok(Some(Reply::text(format!("hi {}", message.user()))))
//! }
//! ```
//!
//! Synchronous functions do not satisfy the bounds and are rejected at
//! compile time.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::app::AppContext;
use crate::error::BoxError;
use crate::reply::Reply;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler resolves to.
pub type HandlerResult = Result<Option<Reply>, BoxError>;

// ============================================================================
// Handler Trait
// ============================================================================

/// An async callable receiving a payload of type `T`.
pub trait Handler<T>: Send + Sync + 'static {
    /// Starts the handler. The returned future owns everything it needs.
    fn call(&self, input: Arc<T>, app: AppContext) -> BoxFuture<'static, HandlerResult>;
}

impl<T, F, Fut> Handler<T> for F
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>, AppContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, input: Arc<T>, app: AppContext) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(input, app))
    }
}

/// A type-erased, shareable handler.
pub type BoxedHandler<T> = Arc<dyn Handler<T>>;

// ============================================================================
// Identity and Options
// ============================================================================

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handler identity, assigned at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-registration behaviour flags.
///
/// - `wait`: the response waits for this handler; its failure yields 500.
/// - `mention`: only run when the bot was addressed (chat messages only).
/// - `admin`: only run when the sender is a configured admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerOptions {
    pub wait: bool,
    pub mention: bool,
    pub admin: bool,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            wait: true,
            mention: false,
            admin: false,
        }
    }
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a handler the response does not wait for.
    pub fn fire_and_forget() -> Self {
        Self::default().wait(false)
    }

    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn mention(mut self, mention: bool) -> Self {
        self.mention = mention;
        self
    }

    pub fn admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }
}

// ============================================================================
// HandlerEntry
// ============================================================================

/// A registered handler together with its identity and options.
pub struct HandlerEntry<T> {
    id: HandlerId,
    handler: BoxedHandler<T>,
    options: HandlerOptions,
}

impl<T> HandlerEntry<T> {
    pub fn new<H>(handler: H, options: HandlerOptions) -> Self
    where
        H: Handler<T>,
    {
        Self {
            id: HandlerId::next(),
            handler: Arc::new(handler),
            options,
        }
    }

    /// Wraps an already type-erased handler.
    pub fn from_boxed(handler: BoxedHandler<T>, options: HandlerOptions) -> Self {
        Self {
            id: HandlerId::next(),
            handler,
            options,
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn options(&self) -> HandlerOptions {
        self.options
    }

    pub fn handler(&self) -> &BoxedHandler<T> {
        &self.handler
    }
}

impl<T> Clone for HandlerEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
            options: self.options,
        }
    }
}

impl<T> fmt::Debug for HandlerEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("id", &self.id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
