//! Catalog of table-backed services.
//!
//! ```yaml
//! services:
//!   User:
//!     table: users
//!     operations: [get, list]
//!     schema:
//!       get:
//!         middleware: [[require_param, token]]
//!   Post:
//!     table: posts
//!     links: { user_id: id }
//!     schema:
//!       get:
//!         required_args: [id]
//! tables:
//!   users:
//!     - { id: 1, name: Ann }
//! ```

use super::ConfigError;
use crate::rule::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Operations a table-backed service can expose.
pub const TABLE_OPERATIONS: &[&str] = &["get", "list", "set", "update", "delete"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Service name → definition.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceDefinition>,

    /// Table name → seed rows.
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Map<String, Value>>>,
}

/// A service exposing one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub table: String,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    #[serde(default = "default_operations")]
    pub operations: Vec<String>,

    #[serde(default)]
    pub schema: Schema,

    /// Column → parent field. Below a parent, rows are restricted to those
    /// whose column equals the parent's field.
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_operations() -> Vec<String> {
    TABLE_OPERATIONS.iter().map(|s| s.to_string()).collect()
}

impl Catalog {
    /// Load a catalog from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a catalog from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let catalog: Catalog = serde_yaml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check that every service declares known operations and that schema
    /// rules only name operations the service exposes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, service) in &self.services {
            if service.table.is_empty() {
                return Err(ConfigError::Config(format!(
                    "service '{}' does not name a table",
                    name
                )));
            }
            for op in &service.operations {
                if !TABLE_OPERATIONS.contains(&op.as_str()) {
                    return Err(ConfigError::Config(format!(
                        "service '{}' declares unknown operation '{}'",
                        name, op
                    )));
                }
            }
            for op in service.schema.keys() {
                if !service.operations.contains(op) {
                    return Err(ConfigError::Config(format!(
                        "service '{}' has a rule for '{}', which it does not expose",
                        name, op
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn get_service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.get(name)
    }
}
