//! The service handler contract and the registry resolving service names.

use crate::model::Model;
use async_trait::async_trait;
use graphpath_core::{ExecutionContext, Reply, Schema};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A service the resolver can dispatch a node to.
///
/// A fresh instance is created for every node, so handlers may keep
/// per-node state (their [`Model`] in particular) without synchronization.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// Per-operation rules. `None` means nothing is checked.
    fn schema(&self) -> Option<&Schema> {
        None
    }

    fn supports(&self, operation: &str) -> bool;

    /// The query-builder the resolver narrows before `call`.
    fn model(&mut self) -> Option<&mut Model> {
        None
    }

    /// Run `operation`, writing a `{ data: ... }` body into `reply`.
    async fn call(
        &mut self,
        operation: &str,
        ctx: &ExecutionContext,
        reply: Reply,
    ) -> anyhow::Result<Reply>;
}

pub type ServiceFactory = Arc<dyn Fn() -> Box<dyn ServiceHandler> + Send + Sync>;

/// Service name → handler factory.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    factories: HashMap<String, ServiceFactory>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .finish()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn ServiceHandler> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn instantiate(&self, name: &str) -> Option<Box<dyn ServiceHandler>> {
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

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
