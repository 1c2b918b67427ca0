//! The Slack plugin: handler registration, endpoints and bot id discovery.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use courier_core::{
    AppContext, BoxError, Endpoint, Executor, Handler, HandlerId, HandlerOptions, Plugin,
    RegistrationError, Verification,
};
use courier_framework::{
    ActionRoute, ActionRouter, BotIdentity, CommandRouter, EventRoute, EventRouter, MessageGate,
    MessageRoute, MessageRouter, Routes,
};

use crate::api::SlackApi;
use crate::config::{SlackConfig, SlackConfigError};
use crate::endpoints;
use crate::model::{SlackAction, SlackCommand, SlackEvent, SlackMessage};

pub const EVENTS_PATH: &str = "/slack/events";
pub const COMMANDS_PATH: &str = "/slack/commands";
pub const ACTIONS_PATH: &str = "/slack/actions";

/// Slack adapter.
///
/// **Endpoints**
/// - `POST /slack/events`: Events API (JSON)
/// - `POST /slack/commands`: slash commands (form)
/// - `POST /slack/actions`: interactive components (form with a JSON `payload`)
///
/// Handlers are registered while the plugin is owned mutably, before it is
/// loaded into the runtime.
pub struct SlackPlugin {
    config: SlackConfig,
    pub(crate) verification: Verification,
    pub(crate) executor: Executor,
    pub(crate) gate: MessageGate,
    pub(crate) events: EventRouter<SlackEvent>,
    pub(crate) messages: MessageRouter<SlackMessage>,
    pub(crate) commands: CommandRouter<SlackCommand>,
    /// Interactive messages, block actions and dialog submissions share one table.
    pub(crate) actions: ActionRouter<SlackAction>,
}

impl SlackPlugin {
    pub fn new(config: SlackConfig) -> Result<Self, SlackConfigError> {
        config.validate()?;

        if config.bot_user_id.is_none() {
            warn!(
                "`bot_user_id` not set. It is required for mention routing and for \
                 discarding messages posted by the bot itself"
            );
        }

        let gate = MessageGate::new(
            BotIdentity {
                bot_id: config.bot_id.clone(),
                bot_user_id: config.bot_user_id.clone(),
            },
            config.admins.iter().cloned(),
        );

        Ok(Self {
            verification: config.verification(),
            executor: Executor::new(config.reply_policy),
            gate,
            events: EventRouter::new(),
            messages: MessageRouter::new(),
            commands: CommandRouter::new(),
            actions: ActionRouter::new(),
            config,
        })
    }

    pub fn config(&self) -> &SlackConfig {
        &self.config
    }

    /// Current bot identity, including a bot id discovered at startup.
    pub fn identity(&self) -> BotIdentity {
        self.gate.identity()
    }

    /// Web API client over the application's HTTP client.
    pub fn api(&self, app: &AppContext) -> SlackApi {
        SlackApi::new(app.http().clone(), &self.config.token, &self.config.api_url)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers `handler` for every event of `event_type`.
    pub fn on_event<H>(&mut self, event_type: &str, handler: H, options: HandlerOptions) -> HandlerId
    where
        H: Handler<SlackEvent>,
    {
        self.events.register(event_type, handler, options)
    }

    /// Registers `handler` for events of `event_type` narrowed by subtype and channel.
    pub fn on_event_detail<H>(
        &mut self,
        event_type: &str,
        subtype: Option<&str>,
        channel: Option<&str>,
        handler: H,
        options: HandlerOptions,
    ) -> HandlerId
    where
        H: Handler<SlackEvent>,
    {
        let mut route = EventRoute::new(event_type);
        if let Some(subtype) = subtype {
            route = route.sub_type(subtype);
        }
        if let Some(channel) = channel {
            route = route.sub_sub_type(channel);
        }
        self.events.register(route, handler, options)
    }

    pub fn on_command<H>(
        &mut self,
        command: &str,
        handler: H,
        options: HandlerOptions,
    ) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<SlackCommand>,
    {
        self.commands.register(command, handler, options)
    }

    /// Registers `handler` for messages whose text matches `pattern` in any channel.
    pub fn on_message<H>(
        &mut self,
        pattern: &str,
        handler: H,
        options: HandlerOptions,
    ) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<SlackMessage>,
    {
        self.on_message_route(MessageRoute::new(pattern), handler, options)
    }

    /// Registers `handler` for messages in `channel`, optionally of one `subtype`.
    pub fn on_message_in<H>(
        &mut self,
        pattern: &str,
        channel: &str,
        subtype: Option<&str>,
        handler: H,
        options: HandlerOptions,
    ) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<SlackMessage>,
    {
        let mut route = MessageRoute::new(pattern).channel(channel);
        if let Some(subtype) = subtype {
            route = route.subtype(subtype);
        }
        self.on_message_route(route, handler, options)
    }

    fn on_message_route<H>(
        &mut self,
        route: MessageRoute,
        handler: H,
        options: HandlerOptions,
    ) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<SlackMessage>,
    {
        if options.admin && !self.gate.has_admins() {
            warn!("Slack admins are not set. Admin-limited handlers will never run");
        }
        self.messages.register(route, handler, options)
    }

    /// Registers `handler` for interactive message actions of `callback_id`,
    /// optionally only for the action named `name`.
    pub fn on_action<H>(
        &mut self,
        callback_id: &str,
        name: Option<&str>,
        handler: H,
        options: HandlerOptions,
    ) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<SlackAction>,
    {
        self.actions.register(action_route(callback_id, name), handler, options)
    }

    /// Registers `handler` for `block_actions` of `block_id`, optionally only `action_id`.
    pub fn on_block<H>(
        &mut self,
        block_id: &str,
        action_id: Option<&str>,
        handler: H,
        options: HandlerOptions,
    ) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<SlackAction>,
    {
        self.actions
            .register(action_route(block_id, action_id), handler, options)
    }

    /// Registers `handler` for dialog submissions of `callback_id`.
    ///
    /// The route is the same as `on_action(callback_id, None)`, so handlers of
    /// either kind see both interactive messages and dialogs under that id.
    pub fn on_dialog_submission<H>(
        &mut self,
        callback_id: &str,
        handler: H,
        options: HandlerOptions,
    ) -> Result<HandlerId, RegistrationError>
    where
        H: Handler<SlackAction>,
    {
        self.actions
            .register(ActionRoute::new(callback_id), handler, options)
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Looks up the bot id of `bot_user_id` through `users.info`.
    async fn find_bot_id(&self, app: &AppContext, bot_user_id: &str) -> Result<(), BoxError> {
        let response = self.api(app).users_info(bot_user_id).await?;
        let bot_id = response
            .pointer("/user/profile/bot_id")
            .and_then(Value::as_str)
            .ok_or("users.info response has no user.profile.bot_id")?;

        self.gate.set_bot_id(bot_id);
        warn!(
            bot_id,
            "`bot_id` not set. For a faster start time set it to this value"
        );
        Ok(())
    }
}

fn action_route(key: &str, secondary: Option<&str>) -> ActionRoute {
    match secondary {
        Some(secondary) => ActionRoute::new(key).secondary(secondary),
        None => ActionRoute::new(key),
    }
}

#[async_trait]
impl Plugin for SlackPlugin {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn endpoints(self: Arc<Self>) -> Vec<Endpoint> {
        let events = Arc::clone(&self);
        let commands = Arc::clone(&self);
        let actions = self;
        vec![
            Endpoint::post(EVENTS_PATH, move |request, app| {
                let plugin = Arc::clone(&events);
                async move { endpoints::incoming_event(&plugin, request, app).await }
            }),
            Endpoint::post(COMMANDS_PATH, move |request, app| {
                let plugin = Arc::clone(&commands);
                async move { endpoints::incoming_command(&plugin, request, app).await }
            }),
            Endpoint::post(ACTIONS_PATH, move |request, app| {
                let plugin = Arc::clone(&actions);
                async move { endpoints::incoming_action(&plugin, request, app).await }
            }),
        ]
    }

    async fn on_startup(&self, app: &AppContext) -> Result<(), BoxError> {
        info!(
            events = self.events.handler_count(),
            messages = self.messages.handler_count(),
            commands = self.commands.handler_count(),
            actions = self.actions.handler_count(),
            signed = self.verification.is_signature(),
            "Slack plugin ready"
        );

        let identity = self.gate.identity();
        match (identity.bot_user_id, identity.bot_id) {
            (Some(bot_user_id), None) => self.find_bot_id(app, &bot_user_id).await,
            _ => Ok(()),
        }
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::config::DEFAULT_API_URL;

    async fn users_info(body: String) -> Json<Value> {
        if body.contains("user=U0BOT") {
            Json(json!({ "ok": true, "user": { "id": "U0BOT", "profile": { "bot_id": "B0BOT" } } }))
        } else {
            Json(json!({ "ok": false, "error": "user_not_found" }))
        }
    }

    async fn mock_api() -> SocketAddr {
        let app = Router::new().route("/users.info", post(users_info));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    fn config(api_url: String, bot_user_id: &str) -> SlackConfig {
        SlackConfig {
            token: "xoxb-test".into(),
            verify: Some("verification-token".into()),
            bot_user_id: Some(bot_user_id.into()),
            api_url,
            ..Default::default()
        }
    }

    #[test]
    fn new_requires_verification() {
        let config = SlackConfig {
            token: "xoxb-test".into(),
            ..Default::default()
        };
        assert_eq!(
            SlackPlugin::new(config).err(),
            Some(SlackConfigError::MissingVerification)
        );
    }

    #[test]
    fn signing_secret_selects_signature_mode() {
        let config = SlackConfig {
            signing_secret: Some("secret".into()),
            ..config(DEFAULT_API_URL.into(), "U0BOT")
        };
        let plugin = SlackPlugin::new(config).unwrap();
        assert!(plugin.verification.is_signature());
        assert_eq!(plugin.name(), "slack");
    }

    #[test]
    fn endpoints_cover_the_three_surfaces() {
        let plugin = Arc::new(SlackPlugin::new(config(DEFAULT_API_URL.into(), "U0BOT")).unwrap());
        let paths: Vec<_> = plugin
            .endpoints()
            .iter()
            .map(|e| e.path().to_owned())
            .collect();
        assert_eq!(paths, vec![EVENTS_PATH, COMMANDS_PATH, ACTIONS_PATH]);
    }

    #[test]
    fn repeated_command_appends_and_empty_command_is_rejected() {
        let mut plugin = SlackPlugin::new(config(DEFAULT_API_URL.into(), "U0BOT")).unwrap();
        let noop = |_command: Arc<SlackCommand>, _app: AppContext| async {
            courier_core::HandlerResult::Ok(None)
        };
        let first = plugin.on_command("/deploy", noop, HandlerOptions::new()).unwrap();
        let second = plugin.on_command("/deploy", noop, HandlerOptions::new()).unwrap();
        assert_ne!(first, second);
        assert_eq!(plugin.commands.handler_count(), 2);

        assert_eq!(
            plugin.on_command("", noop, HandlerOptions::new()).unwrap_err(),
            RegistrationError::EmptyKey("command")
        );
    }

    #[test]
    fn every_action_kind_registers_into_one_table() {
        let mut plugin = SlackPlugin::new(config(DEFAULT_API_URL.into(), "U0BOT")).unwrap();
        let noop = |_action: Arc<SlackAction>, _app: AppContext| async {
            courier_core::HandlerResult::Ok(None)
        };
        plugin.on_action("deploy", Some("go"), noop, HandlerOptions::new()).unwrap();
        plugin.on_block("deploy", Some("approve"), noop, HandlerOptions::new()).unwrap();
        plugin.on_dialog_submission("deploy", noop, HandlerOptions::new()).unwrap();
        assert_eq!(plugin.actions.handler_count(), 3);
    }

    #[tokio::test]
    async fn startup_discovers_bot_id() {
        let addr = mock_api().await;
        let plugin = SlackPlugin::new(config(format!("http://{addr}"), "U0BOT")).unwrap();
        assert_eq!(plugin.identity().bot_id, None);

        plugin.on_startup(&AppContext::default()).await.unwrap();

        assert_eq!(plugin.identity().bot_id.as_deref(), Some("B0BOT"));
    }

    #[tokio::test]
    async fn startup_fails_when_lookup_fails() {
        let addr = mock_api().await;
        let plugin = SlackPlugin::new(config(format!("http://{addr}/"), "UNOBODY")).unwrap();

        let err = plugin.on_startup(&AppContext::default()).await.unwrap_err();

        assert!(err.to_string().contains("user_not_found"));
        assert_eq!(plugin.identity().bot_id, None);
    }

    #[tokio::test]
    async fn startup_skips_lookup_when_bot_id_is_configured() {
        // Nothing listens on the discard port, so a lookup would fail.
        let config = SlackConfig {
            bot_id: Some("B0CONF".into()),
            ..config("http://127.0.0.1:9/".into(), "U0BOT")
        };
        let plugin = SlackPlugin::new(config).unwrap();

        plugin.on_startup(&AppContext::default()).await.unwrap();

        assert_eq!(plugin.identity().bot_id.as_deref(), Some("B0CONF"));
    }
}
