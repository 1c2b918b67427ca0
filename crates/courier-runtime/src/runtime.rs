//! Runtime orchestration: configuration, plugin loading, serving and shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! let mut runtime = CourierRuntime::builder().config_file("courier.toml").build()?;
//!
//! let config = runtime.plugin_config::<SlackConfig>("slack")?;
//! let mut slack = SlackPlugin::new(config)?;
//! slack.on_command("/deploy", deploy, HandlerOptions::new())?;
//! runtime.load_plugin(slack)?;
//!
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::net::SocketAddr;

use courier_core::{AppContext, Plugin};
use courier_transport::{HttpClientOptions, WebhookServer, build_client, build_router};
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::de::DeserializeOwned;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, CourierConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::registry::PluginRegistry;

/// The Courier runtime.
///
/// Plugins are configured (handlers registered) while the caller still owns them and are
/// frozen once passed to [`load_plugin`](Self::load_plugin).
pub struct CourierRuntime {
    config: CourierConfig,
    registry: PluginRegistry,
}

impl CourierRuntime {
    /// Creates a runtime from the configuration found in the default locations.
    ///
    /// Falls back to the built-in defaults if loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .with_user_config_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                CourierConfig::default()
            });

        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging from it.
    pub fn from_config(config: &CourierConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            address = %config.server.address(),
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            registry: PluginRegistry::new(),
        }
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Deserializes the configuration of plugin `name`.
    ///
    /// The `[plugins.<name>]` section is layered under `<NAME>_*` environment variables,
    /// e.g. `SLACK_TOKEN` overrides `plugins.slack.token`.
    pub fn plugin_config<T: DeserializeOwned>(&self, name: &str) -> RuntimeResult<T> {
        let section = self
            .config
            .plugins
            .get(name)
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        let prefix = format!("{}_", name.to_uppercase());
        Figment::from(Serialized::defaults(section))
            .merge(Env::prefixed(&prefix))
            .extract()
            .map_err(|e| RuntimeError::plugin_config(name, e))
    }

    /// Adds a plugin. Plugin names must be unique.
    pub fn load_plugin<P: Plugin>(&mut self, plugin: P) -> RuntimeResult<()> {
        let name = plugin.name();
        self.registry.insert(plugin)?;
        info!(plugin = name, "Loaded plugin");
        Ok(())
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    fn app_context(&self) -> RuntimeResult<AppContext> {
        let options = HttpClientOptions {
            user_agent: self.config.http.user_agent.clone(),
            timeout: self.config.http.timeout(),
        };
        let client = build_client(&options)?;
        Ok(AppContext::new(
            client,
            options.user_agent,
            self.registry.plugins().to_vec(),
        ))
    }

    /// Runs startup hooks and starts serving on the configured address.
    pub async fn start(&self) -> RuntimeResult<RuntimeHandle> {
        self.start_at(&self.config.server.address()).await
    }

    /// Runs startup hooks and starts serving on `addr`.
    ///
    /// A failing startup hook aborts before the listener is bound.
    pub async fn start_at(&self, addr: &str) -> RuntimeResult<RuntimeHandle> {
        let app = self.app_context()?;

        for plugin in app.plugins() {
            debug!(plugin = plugin.name(), "Running startup hook");
            plugin.on_startup(&app).await.map_err(|e| {
                error!(plugin = plugin.name(), error = %e, "Startup hook failed");
                RuntimeError::Startup {
                    plugin: plugin.name().to_string(),
                    reason: e.to_string(),
                }
            })?;
        }

        let router = build_router(app.clone(), self.registry.endpoints())?;
        let server = WebhookServer::bind(addr, router).await?;
        let local_addr = server.local_addr()?;

        let shutdown = CancellationToken::new();
        let server_task = tokio::spawn(server.serve(shutdown.clone()));

        info!(
            addr = %local_addr,
            plugins = ?app.plugin_names(),
            "Courier runtime started"
        );

        Ok(RuntimeHandle {
            app,
            local_addr,
            shutdown,
            server_task,
        })
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(self) -> RuntimeResult<()> {
        let handle = self.start().await?;
        info!("Courier runtime is now running. Press Ctrl+C to stop.");

        let waited = wait_for_shutdown().await;
        handle.shutdown().await?;
        waited
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let handle = self.start().await?;
        shutdown.await;
        handle.shutdown().await
    }
}

impl Default for CourierRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// A started runtime.
pub struct RuntimeHandle {
    app: AppContext,
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    server_task: JoinHandle<courier_transport::TransportResult<()>>,
}

impl RuntimeHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn app(&self) -> &AppContext {
        &self.app
    }

    /// Stops accepting requests, drains in-flight ones, then runs shutdown hooks.
    pub async fn shutdown(self) -> RuntimeResult<()> {
        info!("Stopping Courier runtime");
        self.shutdown.cancel();

        let served = match self.server_task.await {
            Ok(result) => result.map_err(RuntimeError::from),
            Err(e) => {
                error!(error = %e, "Server task panicked");
                Ok(())
            }
        };

        for plugin in self.app.plugins() {
            if let Err(e) = plugin.on_shutdown(&self.app).await {
                warn!(plugin = plugin.name(), error = %e, "Shutdown hook failed");
            }
        }

        info!("Courier runtime stopped");
        served
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(RuntimeError::Signal)?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`CourierRuntime`] with custom configuration sources.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> ConfigResult<CourierRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        Ok(CourierRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use courier_core::{BoxError, Endpoint, WebhookRequest, WebhookResponse, async_trait};
    use figment::Jail;
    use serde::Deserialize;

    use super::*;

    #[derive(Default)]
    struct Probe {
        name: &'static str,
        fail_startup: bool,
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn endpoints(self: Arc<Self>) -> Vec<Endpoint> {
            vec![Endpoint::post(
                format!("/{}", self.name),
                |_req: WebhookRequest, _app: AppContext| async { WebhookResponse::ok() },
            )]
        }

        async fn on_startup(&self, _app: &AppContext) -> Result<(), BoxError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if self.fail_startup {
                return Err("users.info unavailable".into());
            }
            Ok(())
        }

        async fn on_shutdown(&self, _app: &AppContext) -> Result<(), BoxError> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn runtime() -> CourierRuntime {
        CourierRuntime::from_config(&CourierConfig::default())
    }

    #[tokio::test]
    async fn test_serves_plugin_listing_and_runs_hooks() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));

        let mut runtime = runtime();
        runtime
            .load_plugin(Probe {
                name: "probe",
                started: started.clone(),
                stopped: stopped.clone(),
                ..Default::default()
            })
            .unwrap();

        let handle = runtime.start_at("127.0.0.1:0").await.unwrap();
        assert_eq!(started.load(Ordering::SeqCst), 1);

        let base = format!("http://{}", handle.local_addr());
        let names: Vec<String> = reqwest::get(format!("{base}/courier/plugins"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(names, vec!["probe"]);

        let status = reqwest::Client::new()
            .post(format!("{base}/probe"))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::OK);

        handle.shutdown().await.unwrap();
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_startup_hook_aborts() {
        let mut runtime = runtime();
        runtime
            .load_plugin(Probe {
                name: "broken",
                fail_startup: true,
                ..Default::default()
            })
            .unwrap();

        let err = runtime.start_at("127.0.0.1:0").await.err().unwrap();
        assert!(matches!(err, RuntimeError::Startup { plugin, .. } if plugin == "broken"));
    }

    #[test]
    fn test_duplicate_plugin_rejected() {
        let mut runtime = runtime();
        runtime.load_plugin(Probe { name: "slack", ..Default::default() }).unwrap();
        assert!(matches!(
            runtime.load_plugin(Probe { name: "slack", ..Default::default() }),
            Err(RuntimeError::PluginExists(_))
        ));
        assert_eq!(runtime.plugin_names(), vec!["slack"]);
    }

    #[derive(Debug, Deserialize)]
    struct DemoConfig {
        token: String,
        #[serde(default)]
        admins: Vec<String>,
    }

    #[test]
    fn test_plugin_config_from_section_and_env() {
        Jail::expect_with(|jail| {
            let mut config = CourierConfig::default();
            config.plugins.insert(
                "demo".to_string(),
                serde_json::json!({ "token": "from-file", "admins": ["U1"] }),
            );
            let runtime = CourierRuntime::from_config(&config);

            let parsed: DemoConfig = runtime.plugin_config("demo").unwrap();
            assert_eq!(parsed.token, "from-file");
            assert_eq!(parsed.admins, vec!["U1"]);

            jail.set_env("DEMO_TOKEN", "from-env");
            let parsed: DemoConfig = runtime.plugin_config("demo").unwrap();
            assert_eq!(parsed.token, "from-env");
            Ok(())
        });
    }

    #[test]
    fn test_plugin_config_missing_field() {
        let err = runtime().plugin_config::<DemoConfig>("absent").unwrap_err();
        assert!(matches!(err, RuntimeError::PluginConfig { plugin, .. } if plugin == "absent"));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        Jail::expect_with(|jail| {
            jail.create_file("courier.toml", "[server]\nport = 0")?;
            let result = CourierRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .build();
            assert!(result.is_err());
            Ok(())
        });
    }
}
