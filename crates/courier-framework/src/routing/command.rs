//! Command router: exact command-name lookup.

use std::collections::HashMap;

use courier_core::{Handler, HandlerEntry, HandlerId, HandlerOptions, RegistrationError};
use tracing::debug;

use super::Routes;

/// Routing key extraction for command payloads.
pub trait CommandKey {
    fn command(&self) -> &str;
}

pub struct CommandRouter<T> {
    routes: HashMap<String, Vec<HandlerEntry<T>>>,
    count: usize,
}

impl<T> Default for CommandRouter<T> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            count: 0,
        }
    }
}

impl<T: Send + Sync + 'static> CommandRouter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `command`, e.g. `/deploy`.
    pub fn register<H>(&mut self, command: &str, handler: H, options: HandlerOptions) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<T>,
    {
        if command.trim().is_empty() {
            return Err(RegistrationError::EmptyKey("command"));
        }
        let entry = HandlerEntry::new(handler, options);
        let id = entry.id();
        debug!(command, handler = %id, "Registering command handler");
        self.routes.entry(command.to_owned()).or_default().push(entry);
        self.count += 1;
        Ok(id)
    }
}

impl<T: CommandKey> Routes<T> for CommandRouter<T> {
    fn dispatch(&self, command: &T) -> Vec<HandlerEntry<T>> {
        self.routes
            .get(command.command())
            .cloned()
            .unwrap_or_default()
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

    struct Cmd(&'static str);

    impl CommandKey for Cmd {
        fn command(&self) -> &str {
            self.0
        }
    }

    async fn noop(_: Arc<Cmd>, _: AppContext) -> HandlerResult {
        Ok(None)
    }

    #[test]
    fn exact_match_only() {
        let mut router = CommandRouter::new();
        let a = router.register("/deploy", noop, HandlerOptions::new()).unwrap();
        let b = router.register("/deploy", noop, HandlerOptions::new()).unwrap();
        router.register("/status", noop, HandlerOptions::new()).unwrap();

        let ids: Vec<_> = router.dispatch(&Cmd("/deploy")).iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(router.dispatch(&Cmd("/deplo")).is_empty());
        assert!(router.dispatch(&Cmd("/DEPLOY")).is_empty());
        assert_eq!(router.handler_count(), 3);
    }

    #[test]
    fn empty_command_is_rejected() {
        let mut router = CommandRouter::<Cmd>::new();
        assert_eq!(
            router.register(" ", noop, HandlerOptions::new()),
            Err(RegistrationError::EmptyKey("command"))
        );
    }
}
