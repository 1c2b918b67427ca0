//! Routing tables.
//!
//! Each router maps a routing key extracted from a payload to an ordered
//! list of [`HandlerEntry`]s. Routers are filled before the server starts
//! and only read afterwards, so lookups take `&self`.
//!
//! | Router            | Key                                              |
//! |-------------------|--------------------------------------------------|
//! | [`EventRouter`]   | `(type, sub_type, sub_sub_type)` with `*` levels |
//! | [`CommandRouter`] | exact command name                               |
//! | [`MessageRouter`] | `(channel, subtype, pattern)`                    |
//! | [`ActionRouter`]  | `(callback / block id, name / action id)`        |

pub mod action;
pub mod command;
pub mod event;
pub mod message;

pub use action::{ActionKey, ActionRoute, ActionRouter};
pub use command::{CommandKey, CommandRouter};
pub use event::{EventKey, EventRoute, EventRouter};
pub use message::{MessageKey, MessageRoute, MessageRouter};

use courier_core::HandlerEntry;

/// Wildcard routing key matching any value at its level.
pub const WILDCARD: &str = "*";

/// Common lookup interface of every router.
pub trait Routes<T> {
    /// Entries selected for `input`, in dispatch order.
    fn dispatch(&self, input: &T) -> Vec<HandlerEntry<T>>;

    /// Number of registered entries.
    fn handler_count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.handler_count() == 0
    }
}

/// Lookup candidates for one level: the exact value (when present and not
/// itself a wildcard), then the wildcard.
pub(crate) fn candidates(value: Option<&str>) -> impl Iterator<Item = &str> {
    let exact = value.filter(|v| !v.is_empty() && *v != WILDCARD);
    exact.into_iter().chain(std::iter::once(WILDCARD))
}

/// Normalises a registration key: empty means wildcard.
pub(crate) fn key_or_wildcard(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => WILDCARD.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_put_exact_before_wildcard() {
        assert_eq!(candidates(Some("opened")).collect::<Vec<_>>(), vec!["opened", "*"]);
        assert_eq!(candidates(None).collect::<Vec<_>>(), vec!["*"]);
        assert_eq!(candidates(Some("")).collect::<Vec<_>>(), vec!["*"]);
        assert_eq!(candidates(Some("*")).collect::<Vec<_>>(), vec!["*"]);
    }
}
