//! Message router.
//!
//! Handlers are keyed by `(channel, subtype, pattern)`. Patterns are regular
//! expressions compiled at registration and searched (not anchored) in the
//! message text, so an invalid pattern fails registration instead of the
//! first matching request.
//!
//! Dispatch order:
//!
//! 1. entries registered for the message's channel, then entries registered
//!    for any channel (`*`);
//! 2. within a channel scope, entries for the message's exact subtype, then
//!    entries registered without a subtype (which accept any subtype);
//! 3. within those, patterns in registration order, and entries sharing a
//!    pattern in registration order.

use std::collections::HashMap;

use courier_core::{Handler, HandlerEntry, HandlerId, HandlerOptions, RegistrationError};
use regex::Regex;
use tracing::{debug, trace};

use super::{Routes, WILDCARD, candidates, key_or_wildcard};

/// Routing key extraction for chat messages.
pub trait MessageKey {
    fn channel(&self) -> Option<&str>;

    fn subtype(&self) -> Option<&str>;

    /// Text patterns are matched against.
    fn text(&self) -> &str;
}

/// Registration key of a message handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRoute {
    pattern: String,
    channel: String,
    subtype: Option<String>,
}

impl MessageRoute {
    /// Any message whose text matches `pattern`, in any channel.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            channel: WILDCARD.to_owned(),
            subtype: None,
        }
    }

    pub fn channel(mut self, channel: &str) -> Self {
        self.channel = key_or_wildcard(Some(channel));
        self
    }

    pub fn subtype(mut self, subtype: &str) -> Self {
        self.subtype = Some(subtype.to_owned()).filter(|s| !s.is_empty());
        self
    }
}

impl From<&str> for MessageRoute {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for MessageRoute {
    fn from(pattern: String) -> Self {
        Self::new(pattern)
    }
}

struct PatternRoute<T> {
    pattern: Regex,
    entries: Vec<HandlerEntry<T>>,
}

type SubtypeRoutes<T> = HashMap<Option<String>, Vec<PatternRoute<T>>>;

pub struct MessageRouter<T> {
    routes: HashMap<String, SubtypeRoutes<T>>,
    count: usize,
}

impl<T> Default for MessageRouter<T> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            count: 0,
        }
    }
}

impl<T: Send + Sync + 'static> MessageRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `route`; fails when the pattern does not compile.
    pub fn register<H>(
        &mut self,
        route: impl Into<MessageRoute>,
        handler: H,
        options: HandlerOptions,
    ) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<T>,
    {
        let route = route.into();
        let pattern = Regex::new(&route.pattern).map_err(|e| RegistrationError::InvalidPattern {
            pattern: route.pattern.clone(),
            reason: e.to_string(),
        })?;

        let entry = HandlerEntry::new(handler, options);
        let id = entry.id();
        debug!(
            pattern = %route.pattern,
            channel = %route.channel,
            subtype = route.subtype.as_deref().unwrap_or("-"),
            handler = %id,
            "Registering message handler"
        );

        let patterns = self
            .routes
            .entry(route.channel)
            .or_default()
            .entry(route.subtype)
            .or_default();
        match patterns.iter_mut().find(|p| p.pattern.as_str() == pattern.as_str()) {
            Some(existing) => existing.entries.push(entry),
            None => patterns.push(PatternRoute {
                pattern,
                entries: vec![entry],
            }),
        }
        self.count += 1;
        Ok(id)
    }
}

impl<T: MessageKey> Routes<T> for MessageRouter<T> {
    fn dispatch(&self, message: &T) -> Vec<HandlerEntry<T>> {
        let text = message.text();
        let subtype = message.subtype().filter(|s| !s.is_empty());
        let mut selected = Vec::new();

        for channel in candidates(message.channel()) {
            let Some(by_subtype) = self.routes.get(channel) else {
                continue;
            };
            let exact = subtype.and_then(|s| by_subtype.get(&Some(s.to_owned())));
            let any = by_subtype.get(&None);
            for patterns in exact.into_iter().chain(any) {
                for route in patterns.iter().filter(|r| r.pattern.is_match(text)) {
                    selected.extend(route.entries.iter().cloned());
                }
            }
        }

        trace!(
            channel = message.channel().unwrap_or("-"),
            matched = selected.len(),
            "Resolved message handlers"
        );
        selected
    }

    fn handler_count(&self) -> usize {
        self.count
    }
}
