//! Name → handler registry, built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::automation::handler::{AutomationHandler, builtin_handlers};

/// Registry of automation handlers. Immutable once shared.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn AutomationHandler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in handlers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for handler in builtin_handlers() {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler, replacing any handler of the same name.
    pub fn register(&mut self, handler: Arc<dyn AutomationHandler>) {
        let name = handler.name().to_string();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::debug!(automation = %name, "Replaced automation handler");
        } else {
            tracing::debug!(automation = %name, "Registered automation handler");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AutomationHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
