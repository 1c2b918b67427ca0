//! # Courier Framework
//!
//! Routing tables and dispatch resolution built on [`courier_core`].
//!
//! - [`routing`]: per-provider routers mapping payload keys to handlers
//! - [`gate`]: chat filters (self-loop, mention, admin) applied between
//!   routing and execution
//!
//! ## Example
//!
//! ```rust,ignore
//! use courier_framework::routing::{EventRoute, EventRouter, Routes};
//!
//! let mut router = EventRouter::new();
//! router.register(EventRoute::new("pull_request").sub_type("opened"), greet, HandlerOptions::new());
//!
//! let entries = router.dispatch(&event);
//! let outcome = Executor::default().execute_all("github:pull_request", Arc::new(event), entries, &app).await;
//! ```

pub mod gate;
pub mod routing;

pub use gate::{BotIdentity, ChatMessage, MessageGate};
pub use routing::{
    ActionKey, ActionRoute, ActionRouter, CommandKey, CommandRouter, EventKey, EventRoute, EventRouter,
    MessageKey, MessageRoute, MessageRouter, Routes, WILDCARD,
};
