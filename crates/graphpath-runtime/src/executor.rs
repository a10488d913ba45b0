//! The recursive resolver.
//!
//! One call to [`GraphExecutor::resolve`] handles one node:
//!
//! ```text
//! Init -> Validate -> Middleware -> Identify -> Project -> Invoke -> Recurse -> Done
//! ```
//!
//! A blocking middleware ends the node early with [`NodeOutcome::Blocked`].
//! Any error aborts the whole request.

use crate::error::GraphError;
use crate::handler::ServiceRegistry;
use crate::model::{Model, numeric_id};
use crate::projector::{ColumnProjector, ColumnRequest};
use futures::future::BoxFuture;
use graphpath_core::{ExecutionContext, Fallback, GraphConfig, QueryNode, Record, Reply, Verb};
use graphpath_policy::{
    ChainOutcome, KeySanitizer, MiddlewareChain, MiddlewareRegistry, RuleValidator,
    ValidationError,
};
use serde_json::{Map, Value};

/// Filter key that identifies a row explicitly.
pub const ID_FILTER: &str = "id";

/// What a node contributes to the result tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    Resolved(Value),
    /// A middleware refused the node and offered this instead.
    Blocked(Fallback),
}

/// Per-request resolver state.
pub struct GraphExecutor<'a> {
    services: &'a ServiceRegistry,
    middleware: &'a MiddlewareRegistry,
    sanitizer: &'a KeySanitizer,
    config: &'a GraphConfig,
    verb: Verb,
    fields: Map<String, Value>,
    auto_link: bool,
}

impl<'a> GraphExecutor<'a> {
    pub fn new(
        services: &'a ServiceRegistry,
        middleware: &'a MiddlewareRegistry,
        sanitizer: &'a KeySanitizer,
        config: &'a GraphConfig,
        verb: Verb,
    ) -> Self {
        Self {
            services,
            middleware,
            sanitizer,
            config,
            verb,
            fields: Map::new(),
            auto_link: false,
        }
    }

    /// Posted fields handed to every handler.
    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_auto_link(mut self, auto_link: bool) -> Self {
        self.auto_link = auto_link;
        self
    }

    /// Resolve `node` against an optional parent row. `path` is the dotted
    /// position of the node in the tree, used in logs and errors.
    pub fn resolve<'s>(
        &'s self,
        node: &'s QueryNode,
        parent: Option<Record>,
        path: String,
    ) -> BoxFuture<'s, Result<NodeOutcome, GraphError>> {
        Box::pin(async move {
            let service = self.config.qualify(&node.service);

            // Init
            let mut handler =
                self.services
                    .instantiate(&node.service)
                    .ok_or_else(|| GraphError::ServiceNotFound {
                        service: service.clone(),
                    })?;

            let operation = self.verb.operation(node.func.as_deref()).ok_or_else(|| {
                GraphError::OperationNotFound {
                    service: service.clone(),
                    operation: String::new(),
                }
            })?;

            tracing::debug!(
                path = %path,
                service = %service,
                operation = %operation,
                "resolving node"
            );

            let mut filters = self.sanitizer.sanitize(&node.filters)?;
            let params = self.sanitizer.sanitize(&node.params)?;
            let ctx = ExecutionContext::new(self.verb.clone(), self.fields.clone(), params)
                .with_parent(parent);

            // Validate + Middleware
            if let Some(rule) = RuleValidator::lookup(handler.schema(), &operation).cloned() {
                RuleValidator::new(&rule, &operation, &service)
                    .validate(ctx.parent.as_ref(), &ctx.params)?;

                let outcome = MiddlewareChain::new(self.middleware)
                    .run(&rule.middleware, &ctx, &path)
                    .await?;
                if let ChainOutcome::Blocked {
                    middleware,
                    fallback,
                } = outcome
                {
                    tracing::debug!(
                        path = %path,
                        middleware = %middleware,
                        "node blocked by middleware"
                    );
                    return Ok(NodeOutcome::Blocked(fallback));
                }
            }

            if !handler.supports(&operation) {
                return Err(GraphError::OperationNotFound { service, operation });
            }

            {
                let Some(model) = handler.model() else {
                    return Err(GraphError::contract(
                        &service,
                        &operation,
                        "handler exposes no model",
                    ));
                };

                // Identify
                self.identify(&node.service, model, &mut filters, ctx.parent.as_ref())?;
                model.where_eq(filters);

                // Project
                ColumnRequest::new(&node.columns).apply(model);
            }

            // Invoke
            let reply = handler
                .call(&operation, &ctx, Reply::new())
                .await
                .map_err(|source| GraphError::Service {
                    service: service.clone(),
                    operation: operation.clone(),
                    source,
                })?;
            let data = reply_data(reply, &service, &operation)?;

            // Recurse
            let data = ColumnProjector::new(self, &node.columns, &path)
                .project(data)
                .await?;

            Ok(NodeOutcome::Resolved(data))
        })
    }

    /// Apply exactly one identification strategy to `model`.
    ///
    /// With auto-link on and a parent present, the key comes from the parent
    /// row under `<service>_id` and any explicit `id` filter is dropped.
    /// Otherwise an `id` filter must be numeric and moves from the filters to
    /// the model's identity.
    fn identify(
        &self,
        service: &str,
        model: &mut Model,
        filters: &mut Map<String, Value>,
        parent: Option<&Record>,
    ) -> Result<(), GraphError> {
        let explicit = filters.remove(ID_FILTER);

        if let (true, Some(parent)) = (self.auto_link, parent) {
            let key = auto_link_key(service);
            match parent.get(&key) {
                None | Some(Value::Null) => {
                    tracing::debug!(service = %service, key = %key, "parent row has no link key");
                    model.unlink();
                    return Ok(());
                }
                // A falsy link key leaves identification to the explicit filter.
                Some(value) if is_falsy(value) => {}
                Some(value) => {
                    model.identify(value.clone());
                    return Ok(());
                }
            }
        }

        match explicit {
            None | Some(Value::Null) => Ok(()),
            Some(value) => {
                let id = numeric_id(&value).ok_or_else(|| ValidationError::non_numeric_id(&value))?;
                model.identify(id);
                Ok(())
            }
        }
    }
}

/// `false`, `0`, `""` and `"0"`.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        _ => false,
    }
}

/// `lowercase(service) + "_id"`.
pub fn auto_link_key(service: &str) -> String {
    format!("{}_id", service.to_lowercase())
}

/// Pull `data` out of a handler's reply.
fn reply_data(reply: Reply, service: &str, operation: &str) -> Result<Value, GraphError> {
    match reply.into_json() {
        Some(Value::Object(mut body)) => match body.remove("data") {
            Some(data) => Ok(data),
            None => {
                let reason = match body.get("message").and_then(Value::as_str) {
                    Some(message) if !message.is_empty() => {
                        format!("reply has no data ({})", message)
                    }
                    _ => "reply has no data".to_string(),
                };
                Err(GraphError::contract(service, operation, reason))
            }
        },
        _ => Err(GraphError::contract(
            service,
            operation,
            "reply is not a JSON object",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auto_link_key() {
        assert_eq!(auto_link_key("Widget"), "widget_id");
        assert_eq!(auto_link_key("BlogPost"), "blogpost_id");
    }

    #[test]
    fn test_reply_data() {
        let reply = Reply::new().success("", json!([1, 2]));
        assert_eq!(reply_data(reply, "graph::A", "get").unwrap(), json!([1, 2]));

        let err = reply_data(Reply::new().error("boom"), "graph::A", "get").unwrap_err();
        assert!(err.to_string().contains("boom"));

        let err = reply_data(Reply::new().text("[1]"), "graph::A", "get").unwrap_err();
        assert!(matches!(err, GraphError::Contract { .. }));

        let err = reply_data(Reply::new(), "graph::A", "get").unwrap_err();
        assert!(matches!(err, GraphError::Contract { .. }));
    }

    fn executor<'a>(
        services: &'a ServiceRegistry,
        middleware: &'a MiddlewareRegistry,
        sanitizer: &'a KeySanitizer,
        config: &'a GraphConfig,
        auto_link: bool,
    ) -> GraphExecutor<'a> {
        GraphExecutor::new(services, middleware, sanitizer, config, Verb::Get)
            .with_auto_link(auto_link)
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_identify_auto_link() {
        let (services, middleware, sanitizer, config) = (
            ServiceRegistry::new(),
            MiddlewareRegistry::new(),
            KeySanitizer::new(),
            GraphConfig::default(),
        );
        let exec = executor(&services, &middleware, &sanitizer, &config, true);

        let mut model = Model::new("widgets", "id");
        let mut filters = record(json!({ "id": 99, "color": "red" }));
        let parent = record(json!({ "widget_id": 7 }));
        exec.identify("Widget", &mut model, &mut filters, Some(&parent))
            .unwrap();

        assert_eq!(model.identity(), Some(&crate::model::Identity::Key(json!(7))));
        assert_eq!(filters, record(json!({ "color": "red" })));

        let mut model = Model::new("widgets", "id");
        exec.identify("Widget", &mut model, &mut Map::new(), Some(&Map::new()))
            .unwrap();
        assert_eq!(model.identity(), Some(&crate::model::Identity::Unlinked));
    }

    #[test]
    fn test_identify_falsy_link_key_uses_explicit_id() {
        let (services, middleware, sanitizer, config) = (
            ServiceRegistry::new(),
            MiddlewareRegistry::new(),
            KeySanitizer::new(),
            GraphConfig::default(),
        );
        let exec = executor(&services, &middleware, &sanitizer, &config, true);

        for falsy in [json!(0), json!(""), json!("0"), json!(false)] {
            let mut model = Model::new("widgets", "id");
            let mut filters = record(json!({ "id": 8 }));
            let parent = record(json!({ "widget_id": falsy }));
            exec.identify("Widget", &mut model, &mut filters, Some(&parent))
                .unwrap();
            assert_eq!(model.identity(), Some(&crate::model::Identity::Key(json!(8))));
        }

        let mut model = Model::new("widgets", "id");
        let parent = record(json!({ "widget_id": 0 }));
        exec.identify("Widget", &mut model, &mut Map::new(), Some(&parent))
            .unwrap();
        assert_eq!(model.identity(), None);
    }

    #[test]
    fn test_identify_explicit() {
        let (services, middleware, sanitizer, config) = (
            ServiceRegistry::new(),
            MiddlewareRegistry::new(),
            KeySanitizer::new(),
            GraphConfig::default(),
        );
        let exec = executor(&services, &middleware, &sanitizer, &config, false);

        let mut model = Model::new("users", "id");
        let mut filters = record(json!({ "id": "12" }));
        exec.identify("User", &mut model, &mut filters, None).unwrap();
        assert_eq!(model.identity(), Some(&crate::model::Identity::Key(json!(12))));
        assert!(filters.is_empty());

        let mut filters = record(json!({ "id": "abc" }));
        let err = exec
            .identify("User", &mut Model::new("users", "id"), &mut filters, None)
            .unwrap_err();
        assert_eq!(err.to_string(), "ID must be numeric, got \"abc\"");

        // Auto-link at the root falls back to the explicit id.
        let exec = executor(&services, &middleware, &sanitizer, &config, true);
        let mut model = Model::new("users", "id");
        let mut filters = record(json!({ "id": 3 }));
        exec.identify("User", &mut model, &mut filters, None).unwrap();
        assert_eq!(model.identity(), Some(&crate::model::Identity::Key(json!(3))));
    }
}
