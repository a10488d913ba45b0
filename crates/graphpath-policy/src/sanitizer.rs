//! Filter/param blob sanitizing.
//!
//! A blob is a serialized flat map. Blobs that do not decode to an object
//! are treated as empty. Every key of a decoded map must match the allowed
//! identifier pattern; the first offending key rejects the whole map.

use crate::error::ValidationError;
use regex::Regex;
use serde_json::{Map, Value};

/// Keys must be one or more ASCII word characters.
pub const ALLOWED_KEY_PATTERN: &str = r"^[A-Za-z0-9_]+$";

/// Validates and decodes flat key/value blobs.
#[derive(Debug, Clone)]
pub struct KeySanitizer {
    pattern: Regex,
}

impl Default for KeySanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySanitizer {
    /// Create a sanitizer using [`ALLOWED_KEY_PATTERN`].
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(ALLOWED_KEY_PATTERN).expect("key pattern should be valid"),
        }
    }

    /// Create a sanitizer with a custom key pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_valid_key(&self, key: &str) -> bool {
        self.pattern.is_match(key)
    }

    /// Decode and validate a blob.
    ///
    /// JSON text is decoded; an object value is taken as already decoded.
    /// Anything that does not yield an object sanitizes to an empty map.
    pub fn sanitize(&self, blob: &Value) -> Result<Map<String, Value>, ValidationError> {
        let decoded = match blob {
            Value::Object(map) => map.clone(),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    tracing::debug!(
                        blob = %text,
                        "filter blob did not decode to an object, using empty map"
                    );
                    return Ok(Map::new());
                }
            },
            _ => return Ok(Map::new()),
        };

        for key in decoded.keys() {
            if !self.is_valid_key(key) {
                return Err(ValidationError::invalid_key(key, self.pattern()));
            }
        }

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;
    use serde_json::json;

    #[test]
    fn test_word_keys_pass_unchanged() {
        let sanitizer = KeySanitizer::new();
        let map = sanitizer
            .sanitize(&json!(r#"{"id": "12", "user_id": 3, "Name2": "x", "_": true}"#))
            .unwrap();

        assert_eq!(
            map.keys().cloned().collect::<Vec<_>>(),
            vec!["id", "user_id", "Name2", "_"]
        );
        assert_eq!(map["id"], json!("12"));
        assert_eq!(map["user_id"], json!(3));
    }

    #[test]
    fn test_whitespace_and_symbol_keys_fail() {
        let sanitizer = KeySanitizer::new();
        for bad in ["first name", "a-b", "x;drop", "tab\t", "", "a.b", "naïve", "ключ"] {
            let blob = json!({ bad: 1 });
            let err = sanitizer.sanitize(&blob).unwrap_err();
            assert_eq!(err.kind, ValidationErrorKind::InvalidKey, "key {:?}", bad);
        }
    }

    #[test]
    fn test_first_bad_key_aborts() {
        let sanitizer = KeySanitizer::new();
        let err = sanitizer
            .sanitize(&json!(r#"{"ok": 1, "bad key": 2, "also bad!": 3}"#))
            .unwrap_err();
        assert!(err.message.contains("\"bad key\""));
    }

    #[test]
    fn test_malformed_blob_is_empty() {
        let sanitizer = KeySanitizer::new();
        assert!(sanitizer.sanitize(&json!("{not json")).unwrap().is_empty());
        assert!(sanitizer.sanitize(&json!("")).unwrap().is_empty());
        assert!(sanitizer.sanitize(&json!("[1, 2]")).unwrap().is_empty());
        assert!(sanitizer.sanitize(&json!("42")).unwrap().is_empty());
        assert!(sanitizer.sanitize(&Value::Null).unwrap().is_empty());
        assert!(sanitizer.sanitize(&json!(["a"])).unwrap().is_empty());
    }

    #[test]
    fn test_decoded_object_accepted() {
        let sanitizer = KeySanitizer::new();
        let map = sanitizer.sanitize(&json!({ "status": "open" })).unwrap();
        assert_eq!(map["status"], json!("open"));
    }

    #[test]
    fn test_custom_pattern() {
        let sanitizer = KeySanitizer::with_pattern(r"^[a-z]+$").unwrap();
        assert!(sanitizer.is_valid_key("abc"));
        assert!(!sanitizer.is_valid_key("abc_1"));
        assert!(KeySanitizer::with_pattern("(").is_err());
    }
}
