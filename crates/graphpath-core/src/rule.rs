//! Per-operation rules a service declares in its schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Operation name → rule.
pub type Schema = BTreeMap<String, Rule>;

/// Validation and middleware policy for one operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Fields the parent row must carry. Only checked below the root.
    #[serde(default)]
    pub required_args: Vec<String>,

    /// Params the node must carry.
    #[serde(default)]
    pub required_params: Vec<String>,

    /// Middleware run in order before the handler.
    #[serde(default)]
    pub middleware: Vec<MiddlewareSpec>,
}

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_arg(mut self, arg: impl Into<String>) -> Self {
        self.required_args.push(arg.into());
        self
    }

    pub fn require_param(mut self, param: impl Into<String>) -> Self {
        self.required_params.push(param.into());
        self
    }

    pub fn with_middleware(mut self, spec: MiddlewareSpec) -> Self {
        self.middleware.push(spec);
        self
    }
}

/// A registered middleware name plus the opaque argument injected into it.
///
/// Serialized either as `"name"` or as `["name", argument]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMiddlewareSpec", into = "RawMiddlewareSpec")]
pub struct MiddlewareSpec {
    pub name: String,
    pub argument: Option<Value>,
}

impl MiddlewareSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: None,
        }
    }

    pub fn with_argument(name: impl Into<String>, argument: Value) -> Self {
        Self {
            name: name.into(),
            argument: Some(argument),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawMiddlewareSpec {
    Name(String),
    WithArgument(String, Value),
    Named {
        name: String,
        #[serde(default)]
        argument: Option<Value>,
    },
}

impl From<RawMiddlewareSpec> for MiddlewareSpec {
    fn from(raw: RawMiddlewareSpec) -> Self {
        match raw {
            RawMiddlewareSpec::Name(name) => MiddlewareSpec::new(name),
            RawMiddlewareSpec::WithArgument(name, argument) => {
                MiddlewareSpec::with_argument(name, argument)
            }
            RawMiddlewareSpec::Named { name, argument } => MiddlewareSpec { name, argument },
        }
    }
}

impl From<MiddlewareSpec> for RawMiddlewareSpec {
    fn from(spec: MiddlewareSpec) -> Self {
        match spec.argument {
            None => RawMiddlewareSpec::Name(spec.name),
            Some(argument) => RawMiddlewareSpec::WithArgument(spec.name, argument),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_from_yaml() {
        let yaml = r#"
required_args: [user_id]
middleware:
  - require_param
  - [deny, { message: "nope" }]
  - { name: require_field, argument: token }
"#;
        let rule: Rule = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(rule.required_args, vec!["user_id".to_string()]);
        assert!(rule.required_params.is_empty());
        assert_eq!(
            rule.middleware,
            vec![
                MiddlewareSpec::new("require_param"),
                MiddlewareSpec::with_argument("deny", json!({ "message": "nope" })),
                MiddlewareSpec::with_argument("require_field", json!("token")),
            ]
        );
    }

    #[test]
    fn test_middleware_spec_serializes_compactly() {
        let plain = serde_json::to_value(MiddlewareSpec::new("auth")).unwrap();
        assert_eq!(plain, json!("auth"));

        let with_arg =
            serde_json::to_value(MiddlewareSpec::with_argument("deny", json!({ "y": 1 }))).unwrap();
        assert_eq!(with_arg, json!(["deny", { "y": 1 }]));
    }
}
