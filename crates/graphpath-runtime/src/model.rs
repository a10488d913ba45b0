//! The query-builder binding a handler exposes to the resolver.
//!
//! The resolver narrows a [`Model`] (identity, equality predicates, selected
//! columns) before the handler runs; the handler then reads rows through it.

use graphpath_core::Record;
use serde_json::{Map, Value};

/// How a node's rows are identified.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    /// Rows whose primary key equals this value.
    Key(Value),
    /// An auto-link whose parent carried no key. Matches nothing.
    Unlinked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field { name: String, alias: Option<String> },
    Literal { value: String, alias: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    table: String,
    primary_key: String,
    identity: Option<Identity>,
    predicates: Map<String, Value>,
    selections: Vec<Selection>,
}

impl Model {
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            identity: None,
            predicates: Map::new(),
            selections: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_identified(&self) -> bool {
        self.identity.is_some()
    }

    pub fn predicates(&self) -> &Map<String, Value> {
        &self.predicates
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Restrict to the row with this primary key.
    pub fn identify(&mut self, key: Value) -> &mut Self {
        self.identity = Some(Identity::Key(key));
        self
    }

    /// Restrict to nothing.
    pub fn unlink(&mut self) -> &mut Self {
        self.identity = Some(Identity::Unlinked);
        self
    }

    /// Add equality predicates. Later values replace earlier ones.
    pub fn where_eq(&mut self, filters: Map<String, Value>) -> &mut Self {
        self.predicates.extend(filters);
        self
    }

    pub fn select(&mut self, name: impl Into<String>) -> &mut Self {
        self.selections.push(Selection::Field {
            name: name.into(),
            alias: None,
        });
        self
    }

    pub fn select_as(&mut self, name: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.selections.push(Selection::Field {
            name: name.into(),
            alias: Some(alias.into()),
        });
        self
    }

    /// Select a constant string under `alias`.
    pub fn select_literal(
        &mut self,
        value: impl Into<String>,
        alias: impl Into<String>,
    ) -> &mut Self {
        self.selections.push(Selection::Literal {
            value: value.into(),
            alias: alias.into(),
        });
        self
    }

    /// Whether `row` satisfies the identity and every predicate.
    pub fn matches(&self, row: &Record) -> bool {
        match &self.identity {
            Some(Identity::Unlinked) => return false,
            Some(Identity::Key(key)) => {
                if !row
                    .get(&self.primary_key)
                    .is_some_and(|value| loosely_equal(value, key))
                {
                    return false;
                }
            }
            None => {}
        }

        self.predicates
            .iter()
            .all(|(column, expected)| row.get(column).is_some_and(|v| loosely_equal(v, expected)))
    }

    /// Shape `row` by the selections. With no selections the row is kept whole.
    /// Selected fields the row lacks are left out.
    pub fn project(&self, row: &Record) -> Record {
        if self.selections.is_empty() {
            return row.clone();
        }

        let mut out = Map::new();
        for selection in &self.selections {
            match selection {
                Selection::Field { name, alias } => {
                    if let Some(value) = row.get(name) {
                        out.insert(alias.as_ref().unwrap_or(name).clone(), value.clone());
                    }
                }
                Selection::Literal { value, alias } => {
                    out.insert(alias.clone(), Value::String(value.clone()));
                }
            }
        }
        out
    }
}

/// Parse a numeric identifier: a JSON number or a numeric string.
pub fn numeric_id(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(n) = text.parse::<i64>() {
                return Some(Value::from(n));
            }
            text.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::from)
        }
        _ => None,
    }
}

/// Equality across the string/number divide, so `"7"` matches `7`.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            match (numeric_id(a), numeric_id(b)) {
                (Some(Value::Number(x)), Some(Value::Number(y))) => x.as_f64() == y.as_f64(),
                _ => false,
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_identify_and_predicates() {
        let mut model = Model::new("posts", "id");
        model.identify(json!(10));
        model.where_eq(row(json!({ "status": "open" })));

        assert!(model.matches(&row(json!({ "id": 10, "status": "open" }))));
        assert!(model.matches(&row(json!({ "id": "10", "status": "open" }))));
        assert!(!model.matches(&row(json!({ "id": 11, "status": "open" }))));
        assert!(!model.matches(&row(json!({ "id": 10 }))));
    }

    #[test]
    fn test_unlinked_matches_nothing() {
        let mut model = Model::new("widgets", "id");
        model.unlink();
        assert!(!model.matches(&row(json!({ "id": 1 }))));
        assert_eq!(model.identity(), Some(&Identity::Unlinked));
    }

    #[test]
    fn test_project() {
        let mut model = Model::new("users", "id");
        let source = row(json!({ "id": 1, "name": "Ann", "email": "a@x" }));
        assert_eq!(model.project(&source), source);

        model
            .select("name")
            .select_as("email", "contact")
            .select_literal("service:Post", "posts")
            .select("missing");
        assert_eq!(
            Value::Object(model.project(&source)),
            json!({ "name": "Ann", "contact": "a@x", "posts": "service:Post" })
        );
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id(&json!("12")), Some(json!(12)));
        assert_eq!(numeric_id(&json!(" 7 ")), Some(json!(7)));
        assert_eq!(numeric_id(&json!(3)), Some(json!(3)));
        assert_eq!(numeric_id(&json!("1.5")), Some(json!(1.5)));
        assert_eq!(numeric_id(&json!("abc")), None);
        assert_eq!(numeric_id(&json!("")), None);
        assert_eq!(numeric_id(&json!(true)), None);
    }
}
