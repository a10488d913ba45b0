//! Built-in middleware.
//!
//! | Name | Argument | Blocks when |
//! |---|---|---|
//! | `require_param` | name or list of names | a named param is missing |
//! | `require_field` | name or list of names | a named posted field is missing |
//! | `deny` | optional fallback payload | always |

use crate::middleware::{Middleware, MiddlewareRegistry};
use async_trait::async_trait;
use graphpath_core::{ExecutionContext, Fallback, ResponseEnvelope};
use serde_json::{Map, Value};

pub const REQUIRE_PARAM: &str = "require_param";
pub const REQUIRE_FIELD: &str = "require_field";
pub const DENY: &str = "deny";

/// Register every built-in middleware under its canonical name.
pub fn register_builtins(registry: &mut MiddlewareRegistry) {
    registry.register(REQUIRE_PARAM, || Box::new(RequirePresence::params()));
    registry.register(REQUIRE_FIELD, || Box::new(RequirePresence::fields()));
    registry.register(DENY, || Box::new(Deny::default()));
}

/// Names listed in a middleware argument: a single string or an array of strings.
fn names_from_argument(argument: Option<Value>) -> Vec<String> {
    match argument {
        Some(Value::String(name)) => vec![name],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Params,
    Fields,
}

/// Blocks unless every named key is present in the params or posted fields.
#[derive(Debug, Clone)]
pub struct RequirePresence {
    source: Source,
    names: Vec<String>,
}

impl RequirePresence {
    pub fn params() -> Self {
        Self {
            source: Source::Params,
            names: Vec::new(),
        }
    }

    pub fn fields() -> Self {
        Self {
            source: Source::Fields,
            names: Vec::new(),
        }
    }

    fn missing<'a>(&'a self, ctx: &ExecutionContext) -> Option<&'a str> {
        self.names
            .iter()
            .find(|name| {
                let present = match self.source {
                    Source::Params => ctx.param(name),
                    Source::Fields => ctx.field(name),
                };
                present.is_none()
            })
            .map(String::as_str)
    }
}

#[async_trait]
impl Middleware for RequirePresence {
    fn set_argument(&mut self, argument: Option<Value>) {
        self.names = names_from_argument(argument);
    }

    async fn validate(&self, ctx: &ExecutionContext) -> bool {
        self.missing(ctx).is_none()
    }

    async fn fallback(&self, ctx: &ExecutionContext) -> Option<Fallback> {
        let name = self.missing(ctx)?;
        let kind = match self.source {
            Source::Params => "parameter",
            Source::Fields => "field",
        };
        Some(Fallback::Envelope(ResponseEnvelope::error(format!(
            "{} {} is required",
            name, kind
        ))))
    }
}

/// Always blocks. The argument, when an object, is the fallback payload.
#[derive(Debug, Clone, Default)]
pub struct Deny {
    payload: Option<Map<String, Value>>,
}

#[async_trait]
impl Middleware for Deny {
    fn set_argument(&mut self, argument: Option<Value>) {
        self.payload = match argument {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        };
    }

    async fn validate(&self, _ctx: &ExecutionContext) -> bool {
        false
    }

    async fn fallback(&self, _ctx: &ExecutionContext) -> Option<Fallback> {
        let payload = self.payload.clone().unwrap_or_else(|| {
            let mut map = Map::new();
            map.insert("success".to_string(), Value::Bool(false));
            map.insert("message".to_string(), Value::from("denied"));
            map
        });
        Some(Fallback::Payload(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{ChainOutcome, MiddlewareChain};
    use graphpath_core::{MiddlewareSpec, Verb};
    use serde_json::json;

    fn ctx(fields: Value, params: Value) -> ExecutionContext {
        let as_map = |v: Value| match v {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ExecutionContext::new(Verb::Post, as_map(fields), as_map(params))
    }

    #[test]
    fn test_names_from_argument() {
        assert_eq!(names_from_argument(Some(json!("a"))), vec!["a"]);
        assert_eq!(
            names_from_argument(Some(json!(["a", 1, "b"]))),
            vec!["a", "b"]
        );
        assert!(names_from_argument(None).is_empty());
    }

    #[tokio::test]
    async fn test_require_param() {
        let mut mw = RequirePresence::params();
        mw.set_argument(Some(json!(["token", "scope"])));

        let ok = ctx(json!({}), json!({ "token": "t", "scope": "s" }));
        assert!(mw.validate(&ok).await);

        let missing = ctx(json!({ "scope": "s" }), json!({ "token": "t" }));
        assert!(!mw.validate(&missing).await);
        assert_eq!(
            mw.fallback(&missing).await,
            Some(Fallback::Envelope(ResponseEnvelope::error(
                "scope parameter is required"
            )))
        );
    }

    #[tokio::test]
    async fn test_require_field() {
        let mut mw = RequirePresence::fields();
        mw.set_argument(Some(json!("email")));

        assert!(mw.validate(&ctx(json!({ "email": "a@b" }), json!({}))).await);
        assert!(!mw.validate(&ctx(json!({}), json!({ "email": "a@b" }))).await);
    }

    #[tokio::test]
    async fn test_deny_default_and_custom_payload() {
        let registry = MiddlewareRegistry::with_builtins();
        let chain = MiddlewareChain::new(&registry);
        let ctx = ctx(json!({}), json!({}));

        let outcome = chain
            .run(&[MiddlewareSpec::new(DENY)], &ctx, "User")
            .await
            .unwrap();
        let ChainOutcome::Blocked { fallback, .. } = outcome else {
            panic!("deny should block");
        };
        assert_eq!(
            fallback.into_node_value(),
            json!({ "success": false, "message": "denied" })
        );

        let outcome = chain
            .run(
                &[MiddlewareSpec::with_argument(DENY, json!({ "y": 1 }))],
                &ctx,
                "User",
            )
            .await
            .unwrap();
        let ChainOutcome::Blocked { fallback, .. } = outcome else {
            panic!("deny should block");
        };
        assert_eq!(fallback.into_node_value(), json!({ "y": 1 }));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = MiddlewareRegistry::with_builtins();
        assert_eq!(registry.names(), vec![DENY, REQUIRE_FIELD, REQUIRE_PARAM]);
    }
}
