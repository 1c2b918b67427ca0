//! Echo Bot
//!
//! Wires the three adapters from configuration. A provider is loaded when
//! its `[plugins.<name>]` section exists or its credentials are in the
//! environment.
//!
//! ```toml
//! # courier.toml
//! [server]
//! port = 8080
//!
//! [plugins.slack]
//! token = "xoxb-..."
//! signing_secret = "..."
//! bot_user_id = "U0BOT"
//!
//! [plugins.github]
//! secret = "..."
//!
//! [plugins.readthedocs.projects.courier]
//! build_url = "https://readthedocs.org/api/v2/webhook/courier/12345/"
//! token = "..."
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --config courier.toml --notify C0DOCS
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use courier::github::{GithubConfig, GithubEvent, GithubPlugin};
use courier::prelude::*;
use courier::readthedocs::{BuildNotification, RtdConfig, RtdPlugin};
use courier::slack::{SlackAction, SlackCommand, SlackConfig, SlackMessage, SlackPlugin};

#[derive(Debug, Parser)]
#[command(name = "echo-bot", about = "Courier demo bot")]
struct Args {
    /// Configuration file (defaults to courier.toml / config.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `dev` loads courier.dev.toml on top
    #[arg(short, long)]
    profile: Option<String>,

    /// Slack channel receiving documentation build results
    #[arg(long)]
    notify: Option<String>,
}

// ============================================================================
// Slack handlers
// ============================================================================

async fn ping(message: Arc<SlackMessage>, app: AppContext) -> HandlerResult {
    let slack = app.plugin::<SlackPlugin>().ok_or("slack plugin not loaded")?;
    let Some(channel) = message.channel.as_deref() else {
        return Ok(None);
    };
    match message.thread() {
        Some(thread) => slack.api(&app).reply_in_thread(channel, thread, "pong").await?,
        None => slack.api(&app).post_message(channel, "pong").await?,
    };
    Ok(None)
}

async fn log_message(message: Arc<SlackMessage>, _app: AppContext) -> HandlerResult {
    info!(
        channel = message.channel.as_deref().unwrap_or("-"),
        user = message.user.as_deref().unwrap_or("-"),
        "{}",
        message.text
    );
    Ok(None)
}

async fn echo(command: Arc<SlackCommand>, _app: AppContext) -> HandlerResult {
    if command.text.trim().is_empty() {
        return Ok(Some(Reply::text(format!("usage: {} <text>", command.command))));
    }
    Ok(Some(Reply::text(command.text.clone())))
}

async fn approve(action: Arc<SlackAction>, _app: AppContext) -> HandlerResult {
    info!(user = action.user_id().unwrap_or("-"), "Deployment approved");
    Ok(Some(Reply::text("Approved :rocket:")))
}

// ============================================================================
// GitHub handlers
// ============================================================================

async fn pull_request_opened(event: Arc<GithubEvent>, _app: AppContext) -> HandlerResult {
    let title = event
        .data
        .pointer("/pull_request/title")
        .and_then(|t| t.as_str())
        .unwrap_or_default();
    info!(
        repository = event.repository().unwrap_or("-"),
        sender = event.sender().unwrap_or("-"),
        title,
        "Pull request opened"
    );
    Ok(None)
}

async fn github_ping(event: Arc<GithubEvent>, _app: AppContext) -> HandlerResult {
    info!(delivery = %event.delivery_id, "GitHub webhook configured");
    Ok(None)
}

// ============================================================================
// Wiring
// ============================================================================

fn wants(runtime: &CourierRuntime, name: &str, env: Option<&str>) -> bool {
    runtime.config().plugins.contains_key(name) || env.is_some_and(|var| std::env::var_os(var).is_some())
}

fn load_slack(runtime: &mut CourierRuntime) -> Result<()> {
    let mut slack = SlackPlugin::new(runtime.plugin_config::<SlackConfig>("slack")?)?;

    slack.on_message("^ping$", ping, HandlerOptions::fire_and_forget().mention(true))?;
    slack.on_message("", log_message, HandlerOptions::fire_and_forget())?;
    slack.on_command("/echo", echo, HandlerOptions::new())?;
    slack.on_block("deploy", Some("approve"), approve, HandlerOptions::new())?;

    runtime.load_plugin(slack)?;
    Ok(())
}

fn load_github(runtime: &mut CourierRuntime) -> Result<()> {
    let mut github = GithubPlugin::new(runtime.plugin_config::<GithubConfig>("github")?)?;

    github.on_event("ping", github_ping, HandlerOptions::new());
    github.on_event_detail(
        "pull_request",
        Some("opened"),
        None,
        pull_request_opened,
        HandlerOptions::fire_and_forget(),
    );

    runtime.load_plugin(github)?;
    Ok(())
}

fn load_readthedocs(runtime: &mut CourierRuntime, notify: Option<String>) -> Result<()> {
    let config = runtime.plugin_config::<RtdConfig>("readthedocs")?;
    let projects: Vec<String> = config.projects.keys().cloned().collect();
    let mut rtd = RtdPlugin::from_config(config);

    for project in projects {
        let notify = notify.clone();
        rtd.register_handler(&project, move |build: Arc<BuildNotification>, app: AppContext| {
            let notify = notify.clone();
            async move {
                let outcome = if build.build.success { "succeeded" } else { "failed" };
                info!(project = %build.slug, outcome, "Documentation build finished");

                if let (Some(channel), Some(slack)) = (notify, app.plugin::<SlackPlugin>()) {
                    let text = format!("Documentation build of `{}` {outcome}", build.slug);
                    slack.api(&app).post_message(&channel, &text).await?;
                }
                HandlerResult::Ok(None)
            }
        });
    }

    runtime.load_plugin(rtd)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = CourierRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let mut runtime = builder.build()?;

    if wants(&runtime, "slack", Some("SLACK_TOKEN")) {
        load_slack(&mut runtime)?;
    }
    if wants(&runtime, "github", Some("GITHUB_VERIFY")) {
        load_github(&mut runtime)?;
    }
    if wants(&runtime, "readthedocs", None) {
        load_readthedocs(&mut runtime, args.notify)?;
    }

    if runtime.plugin_names().is_empty() {
        warn!("No plugin configured, only the diagnostic endpoint is served");
    }

    runtime.run().await?;
    Ok(())
}
