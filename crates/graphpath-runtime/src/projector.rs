//! Column handling on both sides of a handler call.
//!
//! Before the call, [`ColumnRequest`] tells the model what to select: direct
//! columns as fields, virtual columns as a `'service:<Name>'` marker under
//! their output key. After the call, [`ColumnProjector`] replaces each marker
//! slot with the result of resolving the column's sub-query against its row.

use crate::error::GraphError;
use crate::executor::{GraphExecutor, NodeOutcome};
use crate::model::Model;
use graphpath_core::{ColumnSet, ColumnSpec, Record};
use serde_json::{Map, Value};

pub const VIRTUAL_MARKER_PREFIX: &str = "service:";

/// The literal selected in place of a virtual column.
pub fn virtual_marker(service: &str) -> String {
    format!("{}{}", VIRTUAL_MARKER_PREFIX, service)
}

pub struct ColumnRequest<'a> {
    columns: &'a ColumnSet,
}

impl<'a> ColumnRequest<'a> {
    pub fn new(columns: &'a ColumnSet) -> Self {
        Self { columns }
    }

    pub fn apply(&self, model: &mut Model) {
        for column in self.columns.iter() {
            match &column.spec {
                ColumnSpec::Direct { source } if *source == column.key => {
                    model.select(source.clone());
                }
                ColumnSpec::Direct { source } => {
                    model.select_as(source.clone(), column.key.clone());
                }
                ColumnSpec::Virtual(node) => {
                    model.select_literal(virtual_marker(&node.service), column.key.clone());
                }
            }
        }
    }
}

pub struct ColumnProjector<'a> {
    executor: &'a GraphExecutor<'a>,
    columns: &'a ColumnSet,
    path: &'a str,
}

impl<'a> ColumnProjector<'a> {
    pub fn new(executor: &'a GraphExecutor<'a>, columns: &'a ColumnSet, path: &'a str) -> Self {
        Self {
            executor,
            columns,
            path,
        }
    }

    /// Fill virtual slots in a single row or an array of rows. Other values
    /// pass through untouched.
    pub async fn project(&self, data: Value) -> Result<Value, GraphError> {
        if !self.columns.has_virtual() {
            return Ok(data);
        }

        match data {
            Value::Object(row) => Ok(Value::Object(self.project_row(row).await?)),
            Value::Array(items) => {
                let mut rows = Vec::with_capacity(items.len());
                for item in items {
                    rows.push(match item {
                        Value::Object(row) => Value::Object(self.project_row(row).await?),
                        other => other,
                    });
                }
                Ok(Value::Array(rows))
            }
            other => Ok(other),
        }
    }

    async fn project_row(&self, row: Record) -> Result<Record, GraphError> {
        let mut out = Map::new();
        for (key, value) in &row {
            let Some(ColumnSpec::Virtual(node)) = self.columns.get(key) else {
                out.insert(key.clone(), value.clone());
                continue;
            };

            let path = format!("{}.{}", self.path, key);
            let resolved = match self.executor.resolve(node, Some(row.clone()), path).await? {
                NodeOutcome::Resolved(value) => value,
                NodeOutcome::Blocked(fallback) => fallback.into_node_value(),
            };
            out.insert(key.clone(), resolved);
        }
        Ok(out)
    }
}
