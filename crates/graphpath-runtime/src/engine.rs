//! Top-level entry: one [`GraphRequest`] in, one [`GraphResponse`] out.

use crate::error::GraphError;
use crate::executor::{GraphExecutor, NodeOutcome};
use crate::handler::ServiceRegistry;
use graphpath_core::{
    GraphConfig, GraphResponse, QueryParseError, QueryTree, ResponseEnvelope, Verb,
    parse_nested_query,
};
use graphpath_policy::{KeySanitizer, MiddlewareRegistry};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A decoded inbound request.
#[derive(Debug, Clone)]
pub struct GraphRequest {
    pub id: Uuid,
    pub verb: Verb,
    /// The query description: serialized text or an already-decoded object.
    pub graph: Value,
    /// Non-reserved posted fields.
    pub fields: Map<String, Value>,
    pub auto_link: bool,
}

impl GraphRequest {
    pub fn new(verb: Verb, graph: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            verb,
            graph,
            fields: Map::new(),
            auto_link: false,
        }
    }

    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_auto_link(mut self, auto_link: bool) -> Self {
        self.auto_link = auto_link;
        self
    }

    /// Build a request from posted fields. The reserved graph, method and
    /// auto-link keys are read and stripped; the rest pass through.
    pub fn from_fields(verb: Verb, mut fields: Map<String, Value>, config: &GraphConfig) -> Self {
        let reserved = &config.reserved;

        let graph = fields.remove(&reserved.graph).unwrap_or(Value::Null);
        let verb = match fields.remove(&reserved.method) {
            Some(Value::String(method)) if !method.trim().is_empty() => Verb::parse(&method),
            _ => verb,
        };
        let auto_link = fields
            .remove(&reserved.auto_link)
            .map(|flag| parse_flag(&flag))
            .unwrap_or(config.auto_link_default);

        Self {
            id: Uuid::new_v4(),
            verb,
            graph,
            fields,
            auto_link,
        }
    }

    /// Build a GET request from a raw query string. The decoded query is the
    /// description itself, minus the auto-link key. A reserved graph key, if
    /// present, takes precedence.
    pub fn from_query(query: &str, config: &GraphConfig) -> Self {
        let reserved = &config.reserved;
        let mut decoded = parse_nested_query(query);

        let auto_link = decoded
            .remove(&reserved.auto_link)
            .map(|flag| parse_flag(&flag))
            .unwrap_or(config.auto_link_default);
        let graph = match decoded.remove(&reserved.graph) {
            Some(graph) => graph,
            None => Value::Object(decoded),
        };

        Self::new(Verb::Get, graph).with_auto_link(auto_link)
    }
}

/// Truthiness of a posted flag. `""`, `"0"`, `"false"`, `"off"` and `"no"`
/// are false, as are `null`, `false` and `0`.
pub fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "off" | "no"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Owns the registries and configuration shared by every request.
#[derive(Debug)]
pub struct GraphEngine {
    services: ServiceRegistry,
    middleware: MiddlewareRegistry,
    sanitizer: KeySanitizer,
    config: GraphConfig,
}

impl GraphEngine {
    pub fn new(
        services: ServiceRegistry,
        middleware: MiddlewareRegistry,
        config: GraphConfig,
    ) -> Self {
        Self {
            services,
            middleware,
            sanitizer: KeySanitizer::new(),
            config,
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: KeySanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.middleware
    }

    /// Answer a request. Errors become an error envelope.
    pub async fn handle(&self, request: GraphRequest) -> GraphResponse {
        let request_id = request.id;
        tracing::info!(
            request_id = %request_id,
            verb = %request.verb,
            auto_link = request.auto_link,
            "graph request"
        );

        if request.verb == Verb::Options {
            return GraphResponse::Envelope(ResponseEnvelope {
                success: true,
                message: String::new(),
                data: None,
            });
        }

        match self.resolve(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    request_id = %request_id,
                    class = ?err.kind(),
                    error = %err,
                    "graph request failed"
                );
                GraphResponse::error(err.to_string())
            }
        }
    }

    /// Resolve a request, surfacing errors to the caller.
    pub async fn resolve(&self, request: GraphRequest) -> Result<GraphResponse, GraphError> {
        let tree = parse_graph(&request.graph)?;
        if !tree.ignored.is_empty() {
            tracing::warn!(
                request_id = %request.id,
                root = %tree.root.service,
                ignored = ?tree.ignored,
                "only the first top-level service is resolved"
            );
        }

        let executor = GraphExecutor::new(
            &self.services,
            &self.middleware,
            &self.sanitizer,
            &self.config,
            request.verb,
        )
        .with_fields(request.fields)
        .with_auto_link(request.auto_link);

        let path = tree.root.service.clone();
        match executor.resolve(&tree.root, None, path).await? {
            NodeOutcome::Resolved(data) => Ok(GraphResponse::success(data)),
            NodeOutcome::Blocked(fallback) => Ok(fallback.into_response()),
        }
    }
}

fn parse_graph(graph: &Value) -> Result<QueryTree, QueryParseError> {
    match graph {
        Value::String(raw) => QueryTree::parse(raw),
        other => QueryTree::from_value(other),
    }
}
