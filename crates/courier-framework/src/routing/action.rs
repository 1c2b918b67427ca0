//! Action router.
//!
//! Interactive payloads are keyed by a top-level identifier (callback id or
//! block id) and a secondary identifier (choice name or action id), where the
//! secondary level may be the wildcard `*`. A payload can carry several
//! keys (one per action), and each handler is selected at most once.

use std::collections::{HashMap, HashSet};

use courier_core::{Handler, HandlerEntry, HandlerId, HandlerOptions, RegistrationError};
use tracing::{debug, trace};

use super::{Routes, WILDCARD, candidates, key_or_wildcard};

/// Routing key extraction for interactive payloads.
pub trait ActionKey {
    /// `(top, secondary)` keys carried by the payload, in payload order.
    fn action_keys(&self) -> Vec<(&str, Option<&str>)>;
}

/// Registration key of an action handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRoute {
    key: String,
    secondary: String,
}

impl ActionRoute {
    /// Any action under `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secondary: WILDCARD.to_owned(),
        }
    }

    pub fn secondary(mut self, secondary: &str) -> Self {
        self.secondary = key_or_wildcard(Some(secondary));
        self
    }
}

impl From<&str> for ActionRoute {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

pub struct ActionRouter<T> {
    routes: HashMap<String, HashMap<String, Vec<HandlerEntry<T>>>>,
    count: usize,
}

impl<T> Default for ActionRouter<T> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            count: 0,
        }
    }
}

impl<T: Send + Sync + 'static> ActionRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(
        &mut self,
        route: impl Into<ActionRoute>,
        handler: H,
        options: HandlerOptions,
    ) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<T>,
    {
        let route = route.into();
        if route.key.is_empty() {
            return Err(RegistrationError::EmptyKey("callback_id"));
        }

        let entry = HandlerEntry::new(handler, options);
        let id = entry.id();
        debug!(key = %route.key, secondary = %route.secondary, handler = %id, "Registering action handler");
        self.routes
            .entry(route.key)
            .or_default()
            .entry(route.secondary)
            .or_default()
            .push(entry);
        self.count += 1;
        Ok(id)
    }
}

impl<T: ActionKey> Routes<T> for ActionRouter<T> {
    fn dispatch(&self, action: &T) -> Vec<HandlerEntry<T>> {
        let mut seen = HashSet::new();
        let mut selected = Vec::new();

        for (key, secondary) in action.action_keys() {
            let Some(by_secondary) = self.routes.get(key) else {
                continue;
            };
            for candidate in candidates(secondary) {
                let Some(entries) = by_secondary.get(candidate) else {
                    continue;
                };
                for entry in entries {
                    if seen.insert(entry.id()) {
                        selected.push(entry.clone());
                    }
                }
            }
        }

        trace!(matched = selected.len(), "Resolved action handlers");
        selected
    }

    fn handler_count(&self) -> usize {
        self.count
    }
}
