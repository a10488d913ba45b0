//! Rule-based validation of a node before its handler runs.

use crate::error::ValidationError;
use graphpath_core::{Record, Rule, Schema};
use serde_json::{Map, Value};

/// Checks a node against the rule its service declares for an operation.
pub struct RuleValidator<'a> {
    rule: &'a Rule,
    operation: &'a str,
    service: &'a str,
}

impl<'a> RuleValidator<'a> {
    pub fn new(rule: &'a Rule, operation: &'a str, service: &'a str) -> Self {
        Self {
            rule,
            operation,
            service,
        }
    }

    /// Look up the rule for `operation` in an optional schema.
    pub fn lookup(schema: Option<&'a Schema>, operation: &str) -> Option<&'a Rule> {
        schema.and_then(|s| s.get(operation))
    }

    /// Validate required args (only when a parent exists) and required params.
    pub fn validate(
        &self,
        parent: Option<&Record>,
        params: &Map<String, Value>,
    ) -> Result<(), ValidationError> {
        if let Some(parent) = parent {
            self.validate_args(parent)?;
        }
        self.validate_params(params)
    }

    fn validate_args(&self, parent: &Record) -> Result<(), ValidationError> {
        for arg in &self.rule.required_args {
            if !parent.contains_key(arg) {
                return Err(ValidationError::missing_argument(
                    self.operation,
                    self.service,
                    arg,
                ));
            }
        }
        Ok(())
    }

    fn validate_params(&self, params: &Map<String, Value>) -> Result<(), ValidationError> {
        for param in &self.rule.required_params {
            if !params.contains_key(param) {
                return Err(ValidationError::missing_parameter(
                    self.operation,
                    self.service,
                    param,
                ));
            }
        }
        Ok(())
    }
}
