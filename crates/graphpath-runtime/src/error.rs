//! Error types for graph resolution.

use graphpath_core::QueryParseError;
use graphpath_policy::{MiddlewareError, ValidationError};
use thiserror::Error;

/// Errors that abort a graph request.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A key, rule or identifier check failed.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The query description could not be parsed.
    #[error("{0}")]
    Parse(#[from] QueryParseError),

    /// No handler is registered for the service.
    #[error("service {service} not found")]
    ServiceNotFound { service: String },

    /// The handler does not support the derived operation.
    #[error("method \"{operation}\" of {service} not found")]
    OperationNotFound { service: String, operation: String },

    /// The handler broke its contract (no model, no `data` in its reply).
    #[error("invalid response from {service}::{operation}: {reason}")]
    Contract {
        service: String,
        operation: String,
        reason: String,
    },

    /// Middleware misconfiguration or an unusable fallback.
    #[error(transparent)]
    Middleware(#[from] MiddlewareError),

    /// The handler itself failed.
    #[error("{service}::{operation} failed: {source}")]
    Service {
        service: String,
        operation: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Coarse classification of [`GraphError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Contract,
    Middleware,
    Service,
}

impl GraphError {
    pub fn kind(&self) -> ErrorClass {
        match self {
            GraphError::Validation(_) | GraphError::Parse(_) => ErrorClass::Validation,
            GraphError::ServiceNotFound { .. } | GraphError::OperationNotFound { .. } => {
                ErrorClass::NotFound
            }
            GraphError::Contract { .. } => ErrorClass::Contract,
            GraphError::Middleware(_) => ErrorClass::Middleware,
            GraphError::Service { .. } => ErrorClass::Service,
        }
    }

    pub(crate) fn contract(service: &str, operation: &str, reason: impl Into<String>) -> Self {
        GraphError::Contract {
            service: service.to_string(),
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}
