//! Configuration types for GraphPath.
//!
//! - [`GraphConfig`]: engine settings (service namespace, reserved request keys,
//!   auto-link default). Usually embedded in the server's TOML config.
//! - [`Catalog`]: YAML declaration of table-backed services, their per-operation
//!   rules, and seed rows for the in-memory store.

pub mod catalog;

use serde::{Deserialize, Serialize};

pub use catalog::{Catalog, ServiceDefinition};

/// Engine-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Namespace services are qualified with in messages (`namespace::Service`).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Request keys reserved for the engine and stripped before forwarding.
    #[serde(default)]
    pub reserved: ReservedKeys,

    /// Auto-link value used when a request does not carry the flag.
    #[serde(default)]
    pub auto_link_default: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            reserved: ReservedKeys::default(),
            auto_link_default: false,
        }
    }
}

impl GraphConfig {
    /// Qualified identifier of a service, as used in error messages.
    pub fn qualify(&self, service: &str) -> String {
        if self.namespace.is_empty() {
            service.to_string()
        } else {
            format!("{}::{}", self.namespace, service)
        }
    }
}

/// Names of the three posted fields the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedKeys {
    /// Serialized query description.
    #[serde(default = "default_graph_key")]
    pub graph: String,

    /// Verb override.
    #[serde(default = "default_method_key")]
    pub method: String,

    /// Auto-link flag.
    #[serde(default = "default_auto_link_key")]
    pub auto_link: String,
}

impl Default for ReservedKeys {
    fn default() -> Self {
        Self {
            graph: default_graph_key(),
            method: default_method_key(),
            auto_link: default_auto_link_key(),
        }
    }
}

impl ReservedKeys {
    pub fn contains(&self, key: &str) -> bool {
        key == self.graph || key == self.method || key == self.auto_link
    }
}

fn default_namespace() -> String {
    "graph".to_string()
}

fn default_graph_key() -> String {
    "_____graph".to_string()
}

fn default_method_key() -> String {
    "_____method".to_string()
}

fn default_auto_link_key() -> String {
    "_____auto_link".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
