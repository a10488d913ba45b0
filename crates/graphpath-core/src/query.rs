//! The query tree: nodes, columns, and parsing from a decoded description.
//!
//! A description is an object whose first key names the root service:
//!
//! ```text
//! { "User": {
//!     "func": "get", "filters": "{}", "params": "{}",
//!     "columns": {
//!       "name":  { "type": "column" },
//!       "posts": { "type": "service", "service": "Post", "func": "get",
//!                  "filters": "{}", "columns": { "title": { "type": "column" } } }
//!     } } }
//! ```
//!
//! Filter and param blobs are kept raw here; they are sanitized when the
//! node is resolved, so a bad key surfaces after the service lookup.

use crate::querystring::parse_nested_query;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while turning a description into a [`QueryTree`].
#[derive(Debug, Error, PartialEq)]
pub enum QueryParseError {
    /// The description was empty or decoded to nothing.
    #[error("Invalid graph structure")]
    Empty,

    /// The description decoded but is not shaped like a graph.
    #[error("Invalid graph structure: {0}")]
    Malformed(String),

    /// A column entry could not be understood.
    #[error("column \"{column}\" of service \"{service}\" {reason}")]
    InvalidColumn {
        service: String,
        column: String,
        reason: String,
    },
}

/// One unit of the nested query, bound to a single service invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    /// Registered service name (unqualified).
    pub service: String,
    /// Explicit operation, used when the verb does not force one.
    pub func: Option<String>,
    /// Raw filter blob (JSON text or object).
    pub filters: Value,
    /// Raw param blob (JSON text or object).
    pub params: Value,
    /// Requested output columns, in request order.
    pub columns: ColumnSet,
}

/// How one output column is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSpec {
    /// A stored field, selected under the column's output key.
    Direct { source: String },
    /// A sub-query resolved once per returned row.
    Virtual(Box<QueryNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub spec: ColumnSpec,
}

/// Ordered set of requested columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSet(Vec<Column>);

impl ColumnSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: impl Into<String>, spec: ColumnSpec) {
        let key = key.into();
        self.0.retain(|c| c.key != key);
        self.0.push(Column { key, spec });
    }

    pub fn get(&self, key: &str) -> Option<&ColumnSpec> {
        self.0.iter().find(|c| c.key == key).map(|c| &c.spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any column is a sub-query.
    pub fn has_virtual(&self) -> bool {
        self.0
            .iter()
            .any(|c| matches!(c.spec, ColumnSpec::Virtual(_)))
    }
}

impl QueryNode {
    /// A node with no filters, params or columns.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            func: None,
            filters: Value::Null,
            params: Value::Null,
            columns: ColumnSet::new(),
        }
    }

    pub fn with_func(mut self, func: impl Into<String>) -> Self {
        self.func = Some(func.into());
        self
    }

    pub fn with_filters(mut self, filters: impl Into<Value>) -> Self {
        self.filters = filters.into();
        self
    }

    pub fn with_params(mut self, params: impl Into<Value>) -> Self {
        self.params = params.into();
        self
    }

    pub fn with_column(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        let source = key.clone();
        self.columns.push(key, ColumnSpec::Direct { source });
        self
    }

    pub fn with_virtual_column(mut self, key: impl Into<String>, node: QueryNode) -> Self {
        self.columns.push(key, ColumnSpec::Virtual(Box::new(node)));
        self
    }

    /// Build a node from its structure object (`func`, `filters`, `params`, `columns`).
    pub fn from_structure(service: &str, structure: &Value) -> Result<Self, QueryParseError> {
        let Some(obj) = structure.as_object() else {
            return Err(QueryParseError::Malformed(format!(
                "service \"{}\" must be described by an object",
                service
            )));
        };

        let func = obj
            .get("func")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut columns = ColumnSet::new();
        if let Some(Value::Object(cols)) = obj.get("columns") {
            for (key, entry) in cols {
                columns.push(key.clone(), parse_column(service, key, entry)?);
            }
        }

        Ok(Self {
            service: service.to_string(),
            func,
            filters: obj.get("filters").cloned().unwrap_or(Value::Null),
            params: obj.get("params").cloned().unwrap_or(Value::Null),
            columns,
        })
    }
}

fn parse_column(service: &str, key: &str, entry: &Value) -> Result<ColumnSpec, QueryParseError> {
    let invalid = |reason: &str| QueryParseError::InvalidColumn {
        service: service.to_string(),
        column: key.to_string(),
        reason: reason.to_string(),
    };

    let Some(obj) = entry.as_object() else {
        return Err(invalid("must be an object"));
    };

    match obj.get("type").and_then(|t| t.as_str()) {
        Some("column") => {
            let source = obj
                .get("source")
                .and_then(|s| s.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(key);
            Ok(ColumnSpec::Direct {
                source: source.to_string(),
            })
        }
        Some("service") => {
            let Some(target) = obj.get("service").and_then(|s| s.as_str()) else {
                return Err(invalid("has type \"service\" but names no service"));
            };
            let node = QueryNode::from_structure(target, entry)?;
            Ok(ColumnSpec::Virtual(Box::new(node)))
        }
        Some(other) => Err(invalid(&format!("has unknown type \"{}\"", other))),
        None => Err(invalid("has no type")),
    }
}

/// A parsed description: the root node plus any extra top-level services
/// that were present but are not resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTree {
    pub root: QueryNode,
    pub ignored: Vec<String>,
}

impl QueryTree {
    /// Parse a serialized description. JSON objects are accepted as-is,
    /// anything else is decoded as a bracket-encoded query string.
    pub fn parse(raw: &str) -> Result<Self, QueryParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QueryParseError::Empty);
        }

        if trimmed.starts_with('{') {
            let value: Value = serde_json::from_str(trimmed)
                .map_err(|e| QueryParseError::Malformed(e.to_string()))?;
            return Self::from_value(&value);
        }

        Self::from_map(&parse_nested_query(trimmed))
    }

    /// Build a tree from an already-decoded description.
    pub fn from_value(value: &Value) -> Result<Self, QueryParseError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            Value::Null => Err(QueryParseError::Empty),
            _ => Err(QueryParseError::Malformed(
                "description must be an object keyed by service".to_string(),
            )),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self, QueryParseError> {
        let mut entries = map.iter();
        let Some((service, structure)) = entries.next() else {
            return Err(QueryParseError::Empty);
        };

        Ok(Self {
            root: QueryNode::from_structure(service, structure)?,
            ignored: entries.map(|(name, _)| name.clone()).collect(),
        })
    }
}
