//! Message gate.
//!
//! Applies the chat-specific filters around message routing:
//!
//! - **Self-loop**: messages authored by the bot itself are dropped before
//!   any handler runs, once the bot's own id is known.
//! - **Mention**: handlers registered with `mention` only run when the bot
//!   was addressed (its user id appears in the text, or the channel is a
//!   direct conversation). They are matched against, and receive, a copy of
//!   the message with the mention token removed, so anchored patterns such
//!   as `^deploy` work. Every other handler is matched against the original.
//! - **Admin**: handlers registered with `admin` only run for senders in the
//!   configured admin list.
//!
//! Jobs come out in two groups: handlers matched on the original text
//! first, then mention handlers matched on the stripped text. Each group
//! keeps the router's order.

use std::collections::HashSet;
use std::sync::Arc;

use courier_core::{HandlerEntry, Job};
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, trace};

use crate::routing::{MessageKey, Routes};

/// A chat message the gate can inspect.
pub trait ChatMessage: MessageKey + Send + Sync + 'static {
    /// User id of the sender.
    fn sender(&self) -> Option<&str>;

    /// Bot ids attached to the message (top level and nested edits).
    fn bot_ids(&self) -> Vec<&str>;

    /// A copy of the message carrying `text` instead of its own text.
    fn with_text(&self, text: String) -> Self
    where
        Self: Sized;
}

/// Bot identity used by the gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotIdentity {
    /// Id the platform stamps on messages the bot posts.
    pub bot_id: Option<String>,
    /// User id used to address the bot in text.
    pub bot_user_id: Option<String>,
}

/// Chat filters applied to resolved message handlers.
pub struct MessageGate {
    identity: RwLock<BotIdentity>,
    admins: HashSet<String>,
    mention: Option<Regex>,
}

impl MessageGate {
    pub fn new(identity: BotIdentity, admins: impl IntoIterator<Item = String>) -> Self {
        let mention = identity.bot_user_id.as_deref().and_then(mention_pattern);
        Self {
            identity: RwLock::new(identity),
            admins: admins.into_iter().collect(),
            mention,
        }
    }

    /// Records the bot id discovered after construction.
    pub fn set_bot_id(&self, bot_id: impl Into<String>) {
        self.identity.write().bot_id = Some(bot_id.into());
    }

    pub fn identity(&self) -> BotIdentity {
        self.identity.read().clone()
    }

    pub fn has_admins(&self) -> bool {
        !self.admins.is_empty()
    }

    pub fn is_admin(&self, user: Option<&str>) -> bool {
        user.is_some_and(|u| self.admins.contains(u))
    }

    /// True when the message was posted by the bot itself.
    pub fn is_self_message<M: ChatMessage>(&self, message: &M) -> bool {
        let identity = self.identity.read();
        let Some(own) = identity.bot_id.as_deref() else {
            return false;
        };
        message.bot_ids().contains(&own)
    }

    /// True when the bot was addressed.
    pub fn is_mention<M: ChatMessage>(&self, message: &M) -> bool {
        let direct = message.channel().is_some_and(|c| c.starts_with('D'));
        let named = self
            .identity
            .read()
            .bot_user_id
            .as_deref()
            .is_some_and(|id| message.text().contains(id));
        direct || named
    }

    /// Removes the bot's mention token from `text` and trims the result.
    pub fn strip_mention(&self, text: &str) -> String {
        match &self.mention {
            Some(pattern) => pattern.replace_all(text, " ").trim().to_owned(),
            None => text.trim().to_owned(),
        }
    }

    /// Routes `message` through `router` and turns the matches into jobs,
    /// applying every filter.
    pub fn route<M, R>(&self, router: &R, message: Arc<M>) -> Vec<Job<M>>
    where
        M: ChatMessage,
        R: Routes<M> + ?Sized,
    {
        if self.is_self_message(message.as_ref()) {
            debug!("Ignoring message posted by the bot itself");
            return Vec::new();
        }

        let sender = message.sender();
        let mut jobs: Vec<Job<M>> = router
            .dispatch(message.as_ref())
            .into_iter()
            .filter(|entry| !entry.options().mention && self.admits(entry, sender))
            .map(|entry| Job::new(entry, Arc::clone(&message)))
            .collect();

        if !self.is_mention(message.as_ref()) {
            trace!("Bot not addressed, mention handlers skipped");
            return jobs;
        }

        let stripped = Arc::new(message.with_text(self.strip_mention(message.text())));
        jobs.extend(
            router
                .dispatch(stripped.as_ref())
                .into_iter()
                .filter(|entry| entry.options().mention && self.admits(entry, sender))
                .map(|entry| Job::new(entry, Arc::clone(&stripped))),
        );
        jobs
    }

    fn admits<M>(&self, entry: &HandlerEntry<M>, sender: Option<&str>) -> bool {
        if entry.options().admin && !self.is_admin(sender) {
            trace!(handler = %entry.id(), "Skipping admin handler for non-admin sender");
            return false;
        }
        true
    }
}

fn mention_pattern(bot_user_id: &str) -> Option<Regex> {
    let id = regex::escape(bot_user_id);
    let pattern = format!(r"\s*(?:<@{id}(?:\|[^>]*)?>|@?{id})[:,]?\s*");
    Regex::new(&pattern).ok()
}
