//! Error types for graph policy enforcement.
//!
//! [`ValidationError`] covers request-shape problems (bad keys, missing
//! arguments, non-numeric ids). [`MiddlewareError`] covers middleware
//! configuration problems and blocks that offer no usable fallback.

use std::fmt;
use thiserror::Error;

/// Error type for validation failures.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The kind of validation error.
    pub kind: ValidationErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    // =========================================================================
    // KEY ERRORS
    // =========================================================================

    /// Create an invalid filter/param key error.
    pub fn invalid_key(key: &str, pattern: &str) -> Self {
        Self::new(
            ValidationErrorKind::InvalidKey,
            format!("Invalid key \"{}\", keys must match {}", key, pattern),
        )
    }

    // =========================================================================
    // RULE ERRORS
    // =========================================================================

    /// Create a missing parent argument error.
    pub fn missing_argument(operation: &str, service: &str, arg: &str) -> Self {
        Self::new(
            ValidationErrorKind::MissingArgument,
            format!(
                "{} of {} requires {} argument, make sure {} is selected in your parent service",
                operation, service, arg, arg
            ),
        )
    }

    /// Create a missing parameter error.
    pub fn missing_parameter(operation: &str, service: &str, param: &str) -> Self {
        Self::new(
            ValidationErrorKind::MissingParameter,
            format!(
                "{} of {} requires {} parameter, make sure {} is added to your parameters",
                operation, service, param, param
            ),
        )
    }

    // =========================================================================
    // IDENTIFICATION ERRORS
    // =========================================================================

    /// Create a non-numeric id error.
    pub fn non_numeric_id(value: &serde_json::Value) -> Self {
        Self::new(
            ValidationErrorKind::NonNumericId,
            format!("ID must be numeric, got {}", value),
        )
    }

    // =========================================================================
    // GRAPH ERRORS
    // =========================================================================

    /// Create an invalid graph description error.
    pub fn invalid_graph(reason: impl fmt::Display) -> Self {
        Self::new(ValidationErrorKind::InvalidGraph, reason.to_string())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A filter or param key does not match the allowed pattern.
    InvalidKey,
    /// The parent row lacks a field the operation requires.
    MissingArgument,
    /// The node lacks a param the operation requires.
    MissingParameter,
    /// An explicit `id` filter is not numeric.
    NonNumericId,
    /// The query description could not be turned into a tree.
    InvalidGraph,
}

/// Errors raised while running a middleware chain.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// A rule names a middleware nobody registered.
    #[error("middleware \"{name}\" used in \"{path}\" is not registered")]
    NotRegistered { name: String, path: String },

    /// A middleware blocked without offering a usable fallback.
    #[error("invalid middleware response at {path} (from \"{name}\")")]
    InvalidFallback { name: String, path: String },
}
