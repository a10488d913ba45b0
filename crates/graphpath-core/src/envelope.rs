//! Response shapes: the uniform envelope, the carrier handlers write into,
//! middleware fallbacks, and the final graph response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// `{ success, message, data? }`, the shape every outcome is normalized to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseEnvelope {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("success".to_string(), Value::Bool(self.success));
        obj.insert("message".to_string(), Value::String(self.message.clone()));
        if let Some(data) = &self.data {
            obj.insert("data".to_string(), data.clone());
        }
        Value::Object(obj)
    }
}

/// What a handler wrote into its response carrier.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReplyBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
}

/// Response carrier handed to a handler. A fresh one is created per call;
/// the handler returns it after writing a body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    body: ReplyBody,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a success envelope carrying `data`.
    pub fn success(self, message: impl Into<String>, data: Value) -> Self {
        self.json(json!({
            "success": true,
            "message": message.into(),
            "data": data,
        }))
    }

    /// Write an error envelope. It carries no `data` key.
    pub fn error(self, message: impl Into<String>) -> Self {
        self.json(json!({
            "success": false,
            "message": message.into(),
        }))
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = ReplyBody::Json(value);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = ReplyBody::Text(text.into());
        self
    }

    pub fn body(&self) -> &ReplyBody {
        &self.body
    }

    /// Decode the body to JSON. Text bodies are parsed; an empty carrier
    /// or unparsable text yields `None`.
    pub fn into_json(self) -> Option<Value> {
        match self.body {
            ReplyBody::Empty => None,
            ReplyBody::Json(value) => Some(value),
            ReplyBody::Text(text) => serde_json::from_str(&text).ok(),
        }
    }
}

/// A value a blocking middleware offers in place of the handler's output.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    /// A structured map, returned verbatim at the root.
    Payload(Map<String, Value>),
    /// A response-shaped value.
    Envelope(ResponseEnvelope),
}

impl Fallback {
    /// Empty payloads do not count as a response.
    pub fn is_usable(&self) -> bool {
        match self {
            Fallback::Payload(map) => !map.is_empty(),
            Fallback::Envelope(_) => true,
        }
    }

    /// The value substituted for a blocked node below the root: its `data`
    /// field when present, otherwise the whole fallback.
    pub fn into_node_value(self) -> Value {
        match self {
            Fallback::Payload(mut map) => match map.remove("data") {
                Some(data) => data,
                None => Value::Object(map),
            },
            Fallback::Envelope(envelope) => match envelope.data {
                Some(data) => data,
                None => envelope.to_value(),
            },
        }
    }

    /// The response a blocked root node produces.
    pub fn into_response(self) -> GraphResponse {
        match self {
            Fallback::Payload(map) => GraphResponse::Precomputed(Value::Object(map)),
            Fallback::Envelope(envelope) => GraphResponse::Envelope(envelope),
        }
    }
}

/// The single response produced for a graph request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphResponse {
    Envelope(ResponseEnvelope),
    /// A ready-made response (a root middleware fallback), returned as-is.
    Precomputed(Value),
}

impl GraphResponse {
    pub fn success(data: Value) -> Self {
        GraphResponse::Envelope(ResponseEnvelope::success("", data))
    }

    pub fn error(message: impl Into<String>) -> Self {
        GraphResponse::Envelope(ResponseEnvelope::error(message))
    }

    /// `false` only for error envelopes.
    pub fn is_success(&self) -> bool {
        match self {
            GraphResponse::Envelope(envelope) => envelope.success,
            GraphResponse::Precomputed(_) => true,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            GraphResponse::Envelope(envelope) => envelope.to_value(),
            GraphResponse::Precomputed(value) => value,
        }
    }
}
