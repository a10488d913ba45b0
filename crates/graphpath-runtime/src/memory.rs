//! In-memory tables and the catalog-driven handler that serves them.

use crate::handler::{ServiceHandler, ServiceRegistry};
use crate::model::Model;
use async_trait::async_trait;
use graphpath_core::{Catalog, ExecutionContext, Record, Reply, Schema, ServiceDefinition};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Table name → rows, shared by every handler instance.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<BTreeMap<String, Vec<Record>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with the catalog's tables.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            tables: Arc::new(RwLock::new(catalog.tables.clone())),
        }
    }

    /// Rows of `table` matching `model`, in insertion order.
    pub async fn select(&self, table: &str, model: &Model) -> Vec<Record> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| model.matches(row)).cloned().collect())
            .unwrap_or_default()
    }

    /// Insert a row, assigning the next integer key when it carries none.
    pub async fn insert(&self, table: &str, primary_key: &str, mut row: Record) -> Record {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        if row.get(primary_key).is_none_or(Value::is_null) {
            let next = rows
                .iter()
                .filter_map(|r| r.get(primary_key).and_then(Value::as_i64))
                .max()
                .unwrap_or(0)
                + 1;
            row.insert(primary_key.to_string(), json!(next));
        }

        rows.push(row.clone());
        row
    }

    /// Merge `patch` into every matching row and return the updated rows.
    /// The primary key is never patched.
    pub async fn update(&self, table: &str, model: &Model, patch: &Record) -> Vec<Record> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Vec::new();
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| model.matches(row)) {
            for (key, value) in patch {
                if key != model.primary_key() {
                    row.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        updated
    }

    /// Remove matching rows, returning how many were removed.
    pub async fn delete(&self, table: &str, model: &Model) -> usize {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return 0;
        };
        let before = rows.len();
        rows.retain(|row| !model.matches(row));
        before - rows.len()
    }
}

/// Serves one catalog service from a [`MemoryStore`].
pub struct TableService {
    definition: Arc<ServiceDefinition>,
    store: MemoryStore,
    model: Model,
}

impl TableService {
    pub fn new(definition: Arc<ServiceDefinition>, store: MemoryStore) -> Self {
        let model = Model::new(definition.table.clone(), definition.primary_key.clone());
        Self {
            definition,
            store,
            model,
        }
    }

    /// Restrict the model by the service's links to the parent row. A link
    /// whose parent field is missing restricts to nothing.
    fn apply_links(&mut self, ctx: &ExecutionContext) {
        if ctx.is_root() {
            return;
        }
        for (column, parent_field) in &self.definition.links {
            match ctx.arg(parent_field) {
                Some(value) if !value.is_null() => {
                    let mut predicate = serde_json::Map::new();
                    predicate.insert(column.clone(), value.clone());
                    self.model.where_eq(predicate);
                }
                _ => {
                    self.model.unlink();
                }
            }
        }
    }

    fn project_all(&self, rows: &[Record]) -> Value {
        Value::Array(
            rows.iter()
                .map(|row| Value::Object(self.model.project(row)))
                .collect(),
        )
    }
}

#[async_trait]
impl ServiceHandler for TableService {
    fn schema(&self) -> Option<&Schema> {
        Some(&self.definition.schema)
    }

    fn supports(&self, operation: &str) -> bool {
        self.definition.operations.iter().any(|op| op == operation)
    }

    fn model(&mut self) -> Option<&mut Model> {
        Some(&mut self.model)
    }

    async fn call(
        &mut self,
        operation: &str,
        ctx: &ExecutionContext,
        reply: Reply,
    ) -> anyhow::Result<Reply> {
        self.apply_links(ctx);
        let table = self.definition.table.clone();

        let data = match operation {
            "get" => {
                let rows = self.store.select(&table, &self.model).await;
                if self.model.is_identified() {
                    rows.first()
                        .map(|row| Value::Object(self.model.project(row)))
                        .unwrap_or(Value::Null)
                } else {
                    self.project_all(&rows)
                }
            }
            "list" => {
                let rows = self.store.select(&table, &self.model).await;
                self.project_all(&rows)
            }
            "set" => {
                let row = self
                    .store
                    .insert(&table, &self.definition.primary_key, ctx.fields.clone())
                    .await;
                Value::Object(self.model.project(&row))
            }
            "update" => {
                let rows = self.store.update(&table, &self.model, &ctx.fields).await;
                self.project_all(&rows)
            }
            "delete" => {
                let deleted = self.store.delete(&table, &self.model).await;
                json!({ "deleted": deleted })
            }
            other => anyhow::bail!("table service has no operation \"{}\"", other),
        };

        tracing::debug!(table = %table, operation = %operation, "table operation complete");
        Ok(reply.success("", data))
    }
}

/// Register a [`TableService`] for every catalog service.
pub fn registry_from_catalog(
    catalog: &Catalog,
    store: &MemoryStore,
) -> anyhow::Result<ServiceRegistry> {
    let mut registry = ServiceRegistry::new();
    for (name, definition) in &catalog.services {
        let definition = Arc::new(definition.clone());
        let store = store.clone();
        registry.register(name.clone(), move || {
            Box::new(TableService::new(definition.clone(), store.clone()))
        });
    }

    for (name, definition) in &catalog.services {
        if !catalog.tables.contains_key(&definition.table) {
            tracing::warn!(
                service = %name,
                table = %definition.table,
                "catalog has no rows for table"
            );
        }
    }

    if registry.is_empty() {
        anyhow::bail!("catalog declares no services");
    }
    Ok(registry)
}
