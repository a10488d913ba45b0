//! Request context handed to service handlers and middleware.

use serde_json::{Map, Value};
use std::fmt;

/// A single result row. Field lookup returns `None` for absent keys.
pub type Record = Map<String, Value>;

/// The verb a graph request runs under, after any override has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Patch,
    Put,
    Delete,
    Options,
    Other(String),
}

impl Verb {
    /// Parse a verb name, case-insensitively.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "GET" => Verb::Get,
            "POST" => Verb::Post,
            "PATCH" => Verb::Patch,
            "PUT" => Verb::Put,
            "DELETE" => Verb::Delete,
            "OPTIONS" => Verb::Options,
            other => Verb::Other(other.to_string()),
        }
    }

    /// Derive the handler operation a node runs.
    ///
    /// POST always maps to `set` and PATCH to `update`; every other verb
    /// uses the node's explicit `func`, if any.
    pub fn operation(&self, func: Option<&str>) -> Option<String> {
        match self {
            Verb::Post => Some("set".to_string()),
            Verb::Patch => Some("update".to_string()),
            _ => func.filter(|f| !f.is_empty()).map(str::to_string),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Get => write!(f, "GET"),
            Verb::Post => write!(f, "POST"),
            Verb::Patch => write!(f, "PATCH"),
            Verb::Put => write!(f, "PUT"),
            Verb::Delete => write!(f, "DELETE"),
            Verb::Options => write!(f, "OPTIONS"),
            Verb::Other(name) => write!(f, "{}", name),
        }
    }
}

/// The synthesized request a handler (or middleware) sees for one node.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Verb of the incoming request.
    pub verb: Verb,
    /// Posted fields with the reserved graph keys stripped.
    pub fields: Map<String, Value>,
    /// Sanitized params of the current node.
    pub params: Map<String, Value>,
    /// The parent row this node resolves against; `None` at the root.
    pub parent: Option<Record>,
}

impl ExecutionContext {
    pub fn new(verb: Verb, fields: Map<String, Value>, params: Map<String, Value>) -> Self {
        Self {
            verb,
            fields,
            params,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: Option<Record>) -> Self {
        self.parent = parent;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a field on the parent row.
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.parent.as_ref().and_then(|p| p.get(key))
    }
}
