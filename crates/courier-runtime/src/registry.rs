//! Registry of loaded plugins.

use std::sync::Arc;

use courier_core::{BoxedPlugin, Endpoint, Plugin};
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};

/// Ordered set of uniquely named plugins.
///
/// Load order is kept: startup hooks run in it and the diagnostic endpoint lists it.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<BoxedPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin, rejecting a second plugin with the same name.
    pub fn insert<P: Plugin>(&mut self, plugin: P) -> RuntimeResult<()> {
        self.insert_boxed(Arc::new(plugin))
    }

    pub fn insert_boxed(&mut self, plugin: BoxedPlugin) -> RuntimeResult<()> {
        let name = plugin.name();
        if self.contains(name) {
            return Err(RuntimeError::PluginExists(name.to_string()));
        }
        debug!(plugin = name, "Registered plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn plugins(&self) -> &[BoxedPlugin] {
        &self.plugins
    }

    /// Endpoints of every plugin, in load order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.plugins
            .iter()
            .flat_map(|plugin| Arc::clone(plugin).endpoints())
            .collect()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use courier_core::{AppContext, WebhookRequest, WebhookResponse, async_trait};

    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Plugin for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn endpoints(self: Arc<Self>) -> Vec<Endpoint> {
            let path = format!("/{}", self.0);
            vec![Endpoint::post(path, |_req: WebhookRequest, _app: AppContext| async {
                WebhookResponse::ok()
            })]
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[test]
    fn test_insert_keeps_load_order() {
        let mut registry = PluginRegistry::new();
        registry.insert(Named("slack")).unwrap();
        registry.insert(Named("github")).unwrap();

        assert_eq!(registry.names(), vec!["slack", "github"]);
        assert_eq!(registry.len(), 2);
        let paths: Vec<_> = registry.endpoints().iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths, vec!["/slack", "/github"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = PluginRegistry::new();
        registry.insert(Named("slack")).unwrap();

        let err = registry.insert(Named("slack")).unwrap_err();
        assert!(matches!(err, RuntimeError::PluginExists(name) if name == "slack"));
        assert_eq!(registry.len(), 1);
    }
}
