//! Event handler lookup by configured identifier.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PrerenderConfig;
use crate::hooks::{InMemoryCacheHandler, NoopHandler, PrerenderEventHandler};

/// Identifier of the built-in no-op handler.
pub const NOOP_HANDLER: &str = "noop";

type Factory = Box<dyn Fn(&PrerenderConfig) -> Arc<dyn PrerenderEventHandler> + Send + Sync>;

/// Maps `preRenderEventHandler` identifiers to constructors.
///
/// Resolution happens once at startup. Unknown identifiers are logged and
/// resolve to [`NoopHandler`] instead of failing.
pub struct HandlerRegistry {
    factories: HashMap<String, Factory>,
}

impl HandlerRegistry {
    /// An empty registry. Only the no-op handler is available.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(NOOP_HANDLER, |_| NoopHandler);
        registry
    }

    /// A registry with every handler that ships with this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(InMemoryCacheHandler::NAME, InMemoryCacheHandler::from_config);
        registry
    }

    /// Register a constructor under `name`, replacing any previous entry.
    pub fn register<F, H>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&PrerenderConfig) -> H + Send + Sync + 'static,
        H: PrerenderEventHandler + 'static,
    {
        self.factories.insert(
            name.into(),
            Box::new(move |config| Arc::new(factory(config)) as Arc<dyn PrerenderEventHandler>),
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the handler named by the config's `preRenderEventHandler` key.
    pub fn resolve(&self, config: &PrerenderConfig) -> Arc<dyn PrerenderEventHandler> {
        let Some(name) = config.event_handler() else {
            return Arc::new(NoopHandler);
        };

        match self.factories.get(name.trim()) {
            Some(factory) => {
                tracing::info!(handler = %name, "Prerender event handler loaded");
                factory(config)
            }
            None => {
                tracing::error!(
                    handler = %name,
                    "Prerender event handler not found, continuing without one"
                );
                Arc::new(NoopHandler)
            }
        }
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry").field("handlers", &names).finish()
    }
}
