//! Hook values: what a module exports for an event

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::types::HookContext;
use crate::HookError;

/// Something that can answer a hook invocation
#[async_trait]
pub trait HookCallable: Send + Sync + fmt::Debug {
    /// Produce this handler's result for one invocation
    async fn call(&self, ctx: HookContext) -> Result<Value, HookError>;
}

/// Boxed future returned by [`FnHandler`] closures
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, HookError>> + Send>>;

/// A closure-based handler for quick handler creation
#[derive(Clone)]
pub struct FnHandler {
    handler: Arc<dyn Fn(HookContext) -> HandlerFuture + Send + Sync>,
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("handler", &"<closure>")
            .finish()
    }
}

impl FnHandler {
    /// Wrap an async closure
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HookError>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |ctx| Box::pin(handler(ctx))),
        }
    }

    /// Wrap a synchronous closure
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(HookContext) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(move |ctx| {
            let handler = Arc::clone(&handler);
            async move { handler(ctx) }
        })
    }
}

#[async_trait]
impl HookCallable for FnHandler {
    async fn call(&self, ctx: HookContext) -> Result<Value, HookError> {
        (self.handler)(ctx).await
    }
}

/// A module's export for one event
#[derive(Debug, Clone)]
pub enum HookValue {
    /// A constant result
    Plain(Value),
    /// Called on every invocation
    Callable(Arc<dyn HookCallable>),
    /// Picks a handler by the invocation's namespace
    Namespaced {
        /// Answers unqualified invocations
        unscoped: Option<Box<HookValue>>,
        /// Answers `<namespace>:event` invocations
        scoped: HashMap<String, HookValue>,
    },
}

/// A handler ready to run
#[derive(Debug, Clone)]
pub enum ResolvedHook {
    /// A constant result
    Value(Value),
    /// A callable
    Callable(Arc<dyn HookCallable>),
}

impl ResolvedHook {
    /// Run this handler
    ///
    /// # Errors
    ///
    /// Returns the callable's error
    pub async fn run(self, ctx: HookContext) -> Result<Value, HookError> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Callable(callable) => callable.call(ctx).await,
        }
    }
}

impl HookValue {
    /// Wrap a callable
    #[must_use]
    pub fn callable(callable: impl HookCallable + 'static) -> Self {
        Self::Callable(Arc::new(callable))
    }

    /// Resolve against the invocation's namespace
    ///
    /// Plain values and callables answer any invocation. A namespaced value
    /// is a strict filter: unqualified invocations see only `unscoped`,
    /// qualified ones only their own namespace's entry. Nested namespaced
    /// values never resolve.
    #[must_use]
    pub fn resolve(&self, namespace: Option<&str>) -> Option<ResolvedHook> {
        match self {
            Self::Plain(value) => Some(ResolvedHook::Value(value.clone())),
            Self::Callable(callable) => Some(ResolvedHook::Callable(Arc::clone(callable))),
            Self::Namespaced { unscoped, scoped } => {
                let inner = match namespace {
                    None => unscoped.as_deref()?,
                    Some(ns) => scoped.get(ns)?,
                };
                match inner {
                    Self::Namespaced { .. } => None,
                    other => other.resolve(namespace),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> HookContext {
        HookContext {
            event: "hook_greet".to_string(),
            namespace: None,
            owner: "test".to_string(),
            context: json!({ "name": "world" }),
        }
    }

    #[tokio::test]
    async fn test_fn_handler_receives_context() {
        let handler = FnHandler::new(|ctx: HookContext| async move {
            Ok(json!({ "hello": ctx.context["name"] }))
        });
        assert_eq!(handler.call(ctx()).await.unwrap(), json!({ "hello": "world" }));

        let failing = FnHandler::sync(|_| Err(HookError::new("boom")));
        assert_eq!(failing.call(ctx()).await, Err(HookError::new("boom")));
    }

    #[tokio::test]
    async fn test_plain_resolves_for_any_namespace() {
        let value = HookValue::Plain(json!(1));
        for ns in [None, Some("cli")] {
            let resolved = value.resolve(ns).unwrap();
            assert_eq!(resolved.run(ctx()).await.unwrap(), json!(1));
        }
    }

    #[test]
    fn test_namespaced_is_a_strict_filter() {
        let value = HookValue::Namespaced {
            unscoped: Some(Box::new(HookValue::Plain(json!("root")))),
            scoped: HashMap::from([("cli".to_string(), HookValue::Plain(json!("cli")))]),
        };

        assert!(matches!(value.resolve(None), Some(ResolvedHook::Value(v)) if v == "root"));
        assert!(matches!(value.resolve(Some("cli")), Some(ResolvedHook::Value(v)) if v == "cli"));
        assert!(value.resolve(Some("web")).is_none());

        let scoped_only = HookValue::Namespaced {
            unscoped: None,
            scoped: HashMap::from([("cli".to_string(), HookValue::Plain(json!(1)))]),
        };
        assert!(scoped_only.resolve(None).is_none());
    }
}
