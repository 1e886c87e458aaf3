//! Dynamic hook registry: handlers registered in memory at runtime

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::types::HookName;
use super::value::HookCallable;

/// A handler registered at runtime
#[derive(Debug, Clone)]
pub struct DynamicHook {
    /// Owner name, used by include/exclude and `group`
    pub owner: String,
    /// Namespace the handler answers; `None` answers unqualified invocations
    pub namespace: Option<String>,
    /// The handler
    pub handler: Arc<dyn HookCallable>,
}

/// Registry of dynamic handlers keyed by canonical event
#[derive(Debug, Default)]
pub struct HookRegistry {
    handlers: RwLock<HashMap<String, Vec<DynamicHook>>>,
}

impl HookRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name` under `owner`
    ///
    /// The name's namespace, if any, becomes the handler's namespace.
    pub fn register(&self, name: &HookName, owner: &str, handler: Arc<dyn HookCallable>) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers
            .entry(name.event().to_string())
            .or_default()
            .push(DynamicHook {
                owner: owner.to_string(),
                namespace: name.namespace().map(str::to_string),
                handler,
            });

        tracing::debug!(hook = %name, owner = %owner, "dynamic hook registered");
    }

    /// Remove handlers for `name`, returning how many were removed
    ///
    /// Matches on whichever identifiers are supplied: the event alone, the
    /// owner across the event, the namespace, or the owner+namespace pairing.
    pub fn remove(&self, name: &HookName, owner: Option<&str>) -> usize {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = handlers.get_mut(name.event()) else {
            return 0;
        };

        let before = entries.len();
        entries.retain(|hook| {
            let owner_matches = owner.is_none_or(|o| hook.owner == o);
            let namespace_matches = name
                .namespace()
                .is_none_or(|ns| hook.namespace.as_deref() == Some(ns));
            !(owner_matches && namespace_matches)
        });
        let removed = before - entries.len();

        if entries.is_empty() {
            handlers.remove(name.event());
        }

        tracing::debug!(hook = %name, owner = ?owner, removed, "dynamic hooks removed");
        removed
    }

    /// Handlers answering `name`: same event, identical namespace
    #[must_use]
    pub fn handlers_for(&self, name: &HookName) -> Vec<DynamicHook> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers
            .get(name.event())
            .map(|entries| {
                entries
                    .iter()
                    .filter(|hook| hook.namespace.as_deref() == name.namespace())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of handlers registered for a canonical event, any namespace
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.get(event).map_or(0, Vec::len)
    }

    /// Drop every registration
    pub fn clear(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::value::FnHandler;
    use serde_json::json;

    fn handler() -> Arc<dyn HookCallable> {
        Arc::new(FnHandler::sync(|_| Ok(json!({}))))
    }

    fn name(s: &str) -> HookName {
        HookName::parse(s).unwrap()
    }

    #[test]
    fn test_handlers_match_namespace_exactly() {
        let registry = HookRegistry::new();
        registry.register(&name("greet"), "A", handler());
        registry.register(&name("cli:greet"), "B", handler());

        let owners = |n: &str| {
            registry
                .handlers_for(&name(n))
                .into_iter()
                .map(|h| h.owner)
                .collect::<Vec<_>>()
        };
        assert_eq!(owners("greet"), vec!["A"]);
        assert_eq!(owners("cli:greet"), vec!["B"]);
        assert!(owners("web:greet").is_empty());
        assert_eq!(registry.handler_count("hook_greet"), 2);
    }

    #[test]
    fn test_remove_by_event_owner_and_pairing() {
        let registry = HookRegistry::new();
        registry.register(&name("greet"), "A", handler());
        registry.register(&name("cli:greet"), "A", handler());
        registry.register(&name("cli:greet"), "B", handler());
        registry.register(&name("web:greet"), "B", handler());

        assert_eq!(registry.remove(&name("cli:greet"), Some("B")), 1);
        assert_eq!(registry.handler_count("hook_greet"), 3);

        assert_eq!(registry.remove(&name("greet"), Some("A")), 2);
        assert_eq!(registry.handler_count("hook_greet"), 1);

        assert_eq!(registry.remove(&name("greet"), None), 1);
        assert_eq!(registry.handler_count("hook_greet"), 0);
        assert_eq!(registry.remove(&name("greet"), None), 0);
    }
}
