//! GraphPath Policy Enforcement
//!
//! Everything that decides whether a node may reach its handler:
//!
//! 1. [`KeySanitizer`] decodes filter/param blobs and rejects non-word keys
//! 2. [`RuleValidator`] checks a service's declared required args and params
//! 3. [`MiddlewareChain`] runs the rule's middleware with fallback semantics
//!
//! Built-in middleware lives in [`builtin`].

pub mod builtin;
pub mod error;
pub mod middleware;
pub mod rules;
pub mod sanitizer;

pub use error::{MiddlewareError, ValidationError, ValidationErrorKind};
pub use middleware::{
    ChainOutcome, Middleware, MiddlewareChain, MiddlewareFactory, MiddlewareRegistry,
};
pub use rules::RuleValidator;
pub use sanitizer::{ALLOWED_KEY_PATTERN, KeySanitizer};
