//! # graphpath-core
//!
//! Shared types for the GraphPath resolution engine:
//!
//! - [`query`]: the nested query tree ([`QueryNode`], [`ColumnSpec`]) and its parsing
//! - [`querystring`]: bracket-encoded form decoding (`User[columns][name][type]=column`)
//! - [`rule`]: per-operation [`Rule`]s and [`MiddlewareSpec`]s a service declares
//! - [`context`]: the [`ExecutionContext`] handed to handlers and middleware
//! - [`envelope`]: [`ResponseEnvelope`], the [`Reply`] carrier, [`Fallback`], [`GraphResponse`]
//! - [`config`]: [`GraphConfig`] and the YAML service [`Catalog`]

pub mod config;
pub mod context;
pub mod envelope;
pub mod query;
pub mod querystring;
pub mod rule;

pub use config::{Catalog, ConfigError, GraphConfig, ReservedKeys, ServiceDefinition};
pub use context::{ExecutionContext, Record, Verb};
pub use envelope::{Fallback, GraphResponse, Reply, ReplyBody, ResponseEnvelope};
pub use query::{Column, ColumnSet, ColumnSpec, QueryNode, QueryParseError, QueryTree};
pub use querystring::parse_nested_query;
pub use rule::{MiddlewareSpec, Rule, Schema};
