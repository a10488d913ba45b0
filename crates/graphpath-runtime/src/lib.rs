//! # graphpath-runtime
//!
//! Resolves a query tree against registered services.
//!
//! [`GraphEngine`] decodes a [`GraphRequest`] into a tree and hands the root
//! to a [`GraphExecutor`], which walks the tree depth-first: each node is
//! validated, passed through its middleware, identified, projected and
//! dispatched to a [`ServiceHandler`], and virtual columns in the returned
//! rows are resolved recursively against those rows.
//!
//! [`MemoryStore`] and [`TableService`] provide a catalog-driven data model
//! so an engine can be run without a database.

pub mod engine;
pub mod error;
pub mod executor;
pub mod handler;
pub mod memory;
pub mod model;
pub mod projector;

pub use engine::{GraphEngine, GraphRequest, parse_flag};
pub use error::{ErrorClass, GraphError};
pub use executor::{GraphExecutor, NodeOutcome, auto_link_key};
pub use handler::{ServiceFactory, ServiceHandler, ServiceRegistry};
pub use memory::{MemoryStore, TableService, registry_from_catalog};
pub use model::{Identity, Model, Selection};
pub use projector::{ColumnProjector, ColumnRequest};
