//! Middleware capabilities and the chain that runs them.
//!
//! A chain evaluates its specs in order. Each spec is instantiated fresh from
//! the [`MiddlewareRegistry`], receives its argument, then validates the
//! context. The first middleware that refuses ends the chain: its fallback
//! becomes the blocking result, or the chain fails if it offers none.

use crate::error::MiddlewareError;
use async_trait::async_trait;
use graphpath_core::{ExecutionContext, Fallback, MiddlewareSpec};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A policy check run before a handler.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Receive the opaque argument declared next to the middleware name.
    fn set_argument(&mut self, _argument: Option<Value>) {}

    /// `true` lets resolution continue.
    async fn validate(&self, ctx: &ExecutionContext) -> bool;

    /// Response substituted for the node when `validate` refused.
    async fn fallback(&self, ctx: &ExecutionContext) -> Option<Fallback>;
}

/// Produces a fresh middleware instance per use.
pub type MiddlewareFactory = Arc<dyn Fn() -> Box<dyn Middleware> + Send + Sync>;

/// Name → middleware factory.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    factories: HashMap<String, MiddlewareFactory>,
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in middleware.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_builtins(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Middleware> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Middleware>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Result of running a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    /// Every middleware passed.
    Pass,
    /// A middleware refused and offered this fallback.
    Blocked {
        middleware: String,
        fallback: Fallback,
    },
}

/// Runs middleware specs against a context.
pub struct MiddlewareChain<'a> {
    registry: &'a MiddlewareRegistry,
}

impl<'a> MiddlewareChain<'a> {
    pub fn new(registry: &'a MiddlewareRegistry) -> Self {
        Self { registry }
    }

    /// Evaluate `specs` in order. `path` names the node in error messages.
    pub async fn run(
        &self,
        specs: &[MiddlewareSpec],
        ctx: &ExecutionContext,
        path: &str,
    ) -> Result<ChainOutcome, MiddlewareError> {
        for spec in specs {
            let Some(mut middleware) = self.registry.instantiate(&spec.name) else {
                return Err(MiddlewareError::NotRegistered {
                    name: spec.name.clone(),
                    path: path.to_string(),
                });
            };
            middleware.set_argument(spec.argument.clone());

            if middleware.validate(ctx).await {
                continue;
            }

            tracing::debug!(middleware = %spec.name, path = %path, "middleware refused node");

            return match middleware.fallback(ctx).await {
                Some(fallback) if fallback.is_usable() => Ok(ChainOutcome::Blocked {
                    middleware: spec.name.clone(),
                    fallback,
                }),
                _ => Err(MiddlewareError::InvalidFallback {
                    name: spec.name.clone(),
                    path: path.to_string(),
                }),
            };
        }

        Ok(ChainOutcome::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphpath_core::{ResponseEnvelope, Verb};
    use serde_json::{Map, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Pass {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Middleware for Pass {
        async fn validate(&self, _ctx: &ExecutionContext) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            true
        }

        async fn fallback(&self, _ctx: &ExecutionContext) -> Option<Fallback> {
            None
        }
    }

    /// Blocks and echoes its argument as the fallback payload.
    struct Block {
        argument: Option<Value>,
    }

    #[async_trait]
    impl Middleware for Block {
        fn set_argument(&mut self, argument: Option<Value>) {
            self.argument = argument;
        }

        async fn validate(&self, _ctx: &ExecutionContext) -> bool {
            false
        }

        async fn fallback(&self, _ctx: &ExecutionContext) -> Option<Fallback> {
            match &self.argument {
                Some(Value::Object(map)) => Some(Fallback::Payload(map.clone())),
                Some(Value::String(msg)) => Some(Fallback::Envelope(ResponseEnvelope::error(msg))),
                _ => None,
            }
        }
    }

    fn registry(calls: Arc<AtomicUsize>) -> MiddlewareRegistry {
        let mut registry = MiddlewareRegistry::new();
        registry.register("pass", move || {
            Box::new(Pass {
                calls: calls.clone(),
            })
        });
        registry.register("block", || Box::new(Block { argument: None }));
        registry
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Verb::Get, Map::new(), Map::new())
    }

    #[tokio::test]
    async fn test_all_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(calls.clone());
        let chain = MiddlewareChain::new(&registry);

        let specs = vec![MiddlewareSpec::new("pass"), MiddlewareSpec::new("pass")];
        let outcome = chain.run(&specs, &ctx(), "User").await.unwrap();

        assert_eq!(outcome, ChainOutcome::Pass);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_chain_passes() {
        let registry = MiddlewareRegistry::new();
        let outcome = MiddlewareChain::new(&registry)
            .run(&[], &ctx(), "User")
            .await
            .unwrap();
        assert_eq!(outcome, ChainOutcome::Pass);
    }

    #[tokio::test]
    async fn test_block_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(calls.clone());
        let chain = MiddlewareChain::new(&registry);

        let specs = vec![
            MiddlewareSpec::new("pass"),
            MiddlewareSpec::with_argument("block", json!({ "y": 1 })),
            MiddlewareSpec::new("pass"),
        ];
        let outcome = chain.run(&specs, &ctx(), "User").await.unwrap();

        let mut expected = Map::new();
        expected.insert("y".to_string(), json!(1));
        assert_eq!(
            outcome,
            ChainOutcome::Blocked {
                middleware: "block".to_string(),
                fallback: Fallback::Payload(expected),
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_envelope_fallback_is_usable() {
        let registry = registry(Arc::new(AtomicUsize::new(0)));
        let specs = vec![MiddlewareSpec::with_argument("block", json!("denied"))];
        let outcome = MiddlewareChain::new(&registry)
            .run(&specs, &ctx(), "User")
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ChainOutcome::Blocked {
                fallback: Fallback::Envelope(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_block_without_fallback_fails() {
        let registry = registry(Arc::new(AtomicUsize::new(0)));
        let chain = MiddlewareChain::new(&registry);

        let err = chain
            .run(&[MiddlewareSpec::new("block")], &ctx(), "User.posts")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MiddlewareError::InvalidFallback { ref path, .. } if path == "User.posts"
        ));

        // An empty payload is not a usable fallback either.
        let err = chain
            .run(
                &[MiddlewareSpec::with_argument("block", json!({}))],
                &ctx(),
                "User",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MiddlewareError::InvalidFallback { .. }));
    }

    #[tokio::test]
    async fn test_unregistered_middleware_fails() {
        let registry = MiddlewareRegistry::new();
        let err = MiddlewareChain::new(&registry)
            .run(&[MiddlewareSpec::new("ghost")], &ctx(), "User")
            .await
            .unwrap_err();
        assert!(matches!(err, MiddlewareError::NotRegistered { ref name, .. } if name == "ghost"));
    }

    #[test]
    fn test_registry_names_sorted() {
        let registry = registry(Arc::new(AtomicUsize::new(0)));
        assert_eq!(registry.names(), vec!["block", "pass"]);
        assert!(registry.contains("pass"));
        assert!(registry.instantiate("nope").is_none());
    }
}
