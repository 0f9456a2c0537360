//! Live request types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request intercepted during replay, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiveRequest {
    /// Full URL, with or without scheme and host
    pub url: String,
    /// HTTP method (`GET` when `None`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Raw request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl LiveRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Some(method.into()),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Method with the `GET` default applied.
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }

    /// Body used for comparison: `None` when missing or empty, JSON when it
    /// parses, the raw string otherwise.
    pub fn parsed_body(&self) -> Option<Value> {
        match self.body.as_deref() {
            None | Some("") => None,
            Some(text) => Some(parse_body_text(text)),
        }
    }
}

/// Parse a raw body as JSON, keeping unparsable text as an opaque string.
pub(crate) fn parse_body_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|e| {
        tracing::trace!("body is not JSON, comparing as text: {}", e);
        Value::String(text.to_string())
    })
}
