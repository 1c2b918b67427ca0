//! Event router.
//!
//! Handlers are keyed by a three-level key `(type, sub_type, sub_sub_type)`
//! where the two lower levels may be the wildcard `*`. A payload selects
//! every entry whose levels equal its own or are wildcards, in this order:
//!
//! 1. `(type, sub, subsub)`
//! 2. `(type, sub, *)`
//! 3. `(type, *, subsub)`
//! 4. `(type, *, *)`
//!
//! Within one key, entries keep registration order.

use std::collections::HashMap;

use courier_core::{Handler, HandlerEntry, HandlerId, HandlerOptions};
use tracing::{debug, trace};

use super::{Routes, WILDCARD, candidates, key_or_wildcard};

/// Routing key extraction for event payloads.
pub trait EventKey {
    fn event_type(&self) -> &str;

    fn sub_type(&self) -> Option<&str> {
        None
    }

    fn sub_sub_type(&self) -> Option<&str> {
        None
    }
}

/// Registration key of an event handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRoute {
    event_type: String,
    sub_type: String,
    sub_sub_type: String,
}

impl EventRoute {
    /// Key matching every event of `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            sub_type: WILDCARD.to_owned(),
            sub_sub_type: WILDCARD.to_owned(),
        }
    }

    pub fn sub_type(mut self, sub_type: &str) -> Self {
        self.sub_type = key_or_wildcard(Some(sub_type));
        self
    }

    pub fn sub_sub_type(mut self, sub_sub_type: &str) -> Self {
        self.sub_sub_type = key_or_wildcard(Some(sub_sub_type));
        self
    }
}

impl From<&str> for EventRoute {
    fn from(event_type: &str) -> Self {
        Self::new(event_type)
    }
}

impl From<String> for EventRoute {
    fn from(event_type: String) -> Self {
        Self::new(event_type)
    }
}

type Level<V> = HashMap<String, V>;

/// Three-level event routing table.
pub struct EventRouter<T> {
    routes: Level<Level<Level<Vec<HandlerEntry<T>>>>>,
    count: usize,
}

impl<T> Default for EventRouter<T> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            count: 0,
        }
    }
}

impl<T: Send + Sync + 'static> EventRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `route`.
    pub fn register<H>(&mut self, route: impl Into<EventRoute>, handler: H, options: HandlerOptions) -> HandlerId
    where
        H: Handler<T>,
    {
        self.register_entry(route, HandlerEntry::new(handler, options))
    }

    /// Registers a pre-built entry under `route`.
    pub fn register_entry(&mut self, route: impl Into<EventRoute>, entry: HandlerEntry<T>) -> HandlerId {
        let route = route.into();
        let id = entry.id();
        debug!(
            event_type = %route.event_type,
            sub_type = %route.sub_type,
            sub_sub_type = %route.sub_sub_type,
            handler = %id,
            "Registering event handler"
        );

        self.routes
            .entry(route.event_type)
            .or_default()
            .entry(route.sub_type)
            .or_default()
            .entry(route.sub_sub_type)
            .or_default()
            .push(entry);
        self.count += 1;
        id
    }
}

impl<T: EventKey> Routes<T> for EventRouter<T> {
    fn dispatch(&self, event: &T) -> Vec<HandlerEntry<T>> {
        let Some(by_sub) = self.routes.get(event.event_type()) else {
            trace!(event_type = event.event_type(), "No handlers for event type");
            return Vec::new();
        };

        let mut selected = Vec::new();
        for sub in candidates(event.sub_type()) {
            let Some(by_subsub) = by_sub.get(sub) else {
                continue;
            };
            for subsub in candidates(event.sub_sub_type()) {
                if let Some(entries) = by_subsub.get(subsub) {
                    selected.extend(entries.iter().cloned());
                }
            }
        }

        trace!(
            event_type = event.event_type(),
            matched = selected.len(),
            "Resolved event handlers"
        );
        selected
    }

    fn handler_count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use courier_core::{AppContext, HandlerResult};

    use super::*;

    struct TestEvent {
        kind: &'static str,
        sub: Option<&'static str>,
        subsub: Option<&'static str>,
    }

    impl EventKey for TestEvent {
        fn event_type(&self) -> &str {
            self.kind
        }
        fn sub_type(&self) -> Option<&str> {
            self.sub
        }
        fn sub_sub_type(&self) -> Option<&str> {
            self.subsub
        }
    }

    async fn noop(_: Arc<TestEvent>, _: AppContext) -> HandlerResult {
        Ok(None)
    }

    fn event(kind: &'static str, sub: Option<&'static str>, subsub: Option<&'static str>) -> TestEvent {
        TestEvent { kind, sub, subsub }
    }

    fn ids(entries: &[HandlerEntry<TestEvent>]) -> Vec<HandlerId> {
        entries.iter().map(|e| e.id()).collect()
    }

    #[test]
    fn wildcard_and_exact_keys_both_match() {
        let mut router = EventRouter::new();
        let any = router.register("push", noop, HandlerOptions::new());
        let exact = router.register(
            EventRoute::new("push").sub_type("created"),
            noop,
            HandlerOptions::new(),
        );

        let selected = router.dispatch(&event("push", Some("created"), None));
        assert_eq!(ids(&selected), vec![exact, any]);

        let selected = router.dispatch(&event("push", None, None));
        assert_eq!(ids(&selected), vec![any]);
    }

    #[test]
    fn unknown_event_selects_nothing() {
        let mut router = EventRouter::new();
        router.register("push", noop, HandlerOptions::new());
        assert!(router.dispatch(&event("issues", None, None)).is_empty());
    }

    #[test]
    fn different_subtype_is_not_selected() {
        let mut router = EventRouter::new();
        router.register(
            EventRoute::new("pull_request").sub_type("opened"),
            noop,
            HandlerOptions::new(),
        );
        assert!(router.dispatch(&event("pull_request", Some("closed"), None)).is_empty());
    }

    #[test]
    fn dispatch_order_is_most_specific_first() {
        let mut router = EventRouter::new();
        let any_any = router.register("message", noop, HandlerOptions::new());
        let any_c = router.register(
            EventRoute::new("message").sub_sub_type("C1"),
            noop,
            HandlerOptions::new(),
        );
        let s_any = router.register(
            EventRoute::new("message").sub_type("changed"),
            noop,
            HandlerOptions::new(),
        );
        let s_c = router.register(
            EventRoute::new("message").sub_type("changed").sub_sub_type("C1"),
            noop,
            HandlerOptions::new(),
        );

        let selected = router.dispatch(&event("message", Some("changed"), Some("C1")));
        assert_eq!(ids(&selected), vec![s_c, s_any, any_c, any_any]);
        assert_eq!(router.handler_count(), 4);
    }

    #[test]
    fn registration_order_within_a_key() {
        let mut router = EventRouter::new();
        let first = router.register("team_join", noop, HandlerOptions::new());
        let second = router.register("team_join", noop, HandlerOptions::new().wait(false));

        let selected = router.dispatch(&event("team_join", None, None));
        assert_eq!(ids(&selected), vec![first, second]);
        assert!(!selected[1].options().wait);
    }

    #[test]
    fn empty_registration_key_is_wildcard() {
        let mut router = EventRouter::new();
        let id = router.register(EventRoute::new("push").sub_type(""), noop, HandlerOptions::new());
        assert_eq!(ids(&router.dispatch(&event("push", Some("x"), None))), vec![id]);
    }
}
