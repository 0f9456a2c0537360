//! Recorded fixture types.
//!
//! Fixture files are written by recorders of different ages, so the
//! deserializers here accept the older shapes (query strings as raw strings,
//! response headers as pair lists or raw header blocks, `file: false`).

use crate::types::request::parse_body_text;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Which collection a fixture belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureSource {
    /// Fixture recorded for the current test
    Test,
    /// Shared fixture from the default collection
    Default,
}

/// A recorded request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    /// Unique identifier of this fixture (older files only carry it in the index)
    #[serde(default)]
    pub id: String,
    /// Path and query of the recorded request (host stripped)
    pub url: String,
    /// HTTP method, compared case-insensitively
    #[serde(default = "default_method")]
    pub method: String,
    /// Capture time as written by the recorder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub request: FixtureRequest,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: FixtureResponse,
    /// Whether this fixture already answered a request in the current session
    #[serde(default, deserialize_with = "null_as_default")]
    pub served: bool,
    /// Query parameter names excluded from URL comparison
    #[serde(default, deserialize_with = "null_as_default")]
    pub ignore_params: Vec<String>,
    /// Ids of fixtures in the same collection that must be served first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<Vec<String>>,
    /// Only serve once the previous fixture in list order has been served
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_false")]
    pub wait_for_previous: bool,
}

/// Request side of a fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureRequest {
    #[serde(default, deserialize_with = "lenient_headers")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_query_string")]
    pub query_string: Vec<QueryParam>,
    /// Either `{mimeType, text}` with the raw body or a structured body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<Value>,
}

/// Single recorded query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: String,
}

/// Response side of a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default, deserialize_with = "lenient_headers")]
    pub headers: BTreeMap<String, String>,
    /// Text body; `None` when the payload lives in `file`
    #[serde(default)]
    pub content: Option<String>,
    /// Name of the binary payload under the `_files` directory
    #[serde(default, deserialize_with = "lenient_file")]
    pub file: Option<String>,
}

impl Default for FixtureResponse {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: BTreeMap::new(),
            content: None,
            file: None,
        }
    }
}

impl Fixture {
    /// Create a fixture with an empty request and a bare `200` response.
    pub fn new(id: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            method: method.into(),
            time: None,
            request: FixtureRequest::default(),
            response: FixtureResponse::default(),
            served: false,
            ignore_params: Vec::new(),
            wait_for: None,
            wait_for_previous: false,
        }
    }

    /// Request body used for comparison.
    ///
    /// A `{mimeType, text}` wrapper with non-empty text is unwrapped and the
    /// text parsed as JSON (unparsable text stays an opaque string). Any other
    /// value is the body itself; `null` means no body.
    pub fn request_body(&self) -> Option<Value> {
        let post_data = self.request.post_data.as_ref()?;
        if let Some(text) = post_data.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(parse_body_text(text));
            }
        }
        match post_data {
            Value::Null => None,
            other => Some(other.clone()),
        }
    }
}

impl FixtureResponse {
    /// Recorded headers plus a Title-Case copy of every header name.
    pub fn served_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        for (name, value) in &self.headers {
            headers.insert(capitalize_header(name), value.clone());
        }
        headers
    }
}

/// `content-type` -> `Content-Type`.
pub fn capitalize_header(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn value_to_header_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Headers as an object, a list of `[name, value]` pairs, or a raw
/// `name: value` block separated by CRLF.
fn lenient_headers<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let headers = match value {
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| (k, value_to_header_string(v)))
            .collect(),
        Some(Value::Array(pairs)) => pairs
            .into_iter()
            .filter_map(|pair| match pair {
                Value::Array(mut kv) if kv.len() == 2 => {
                    let value = kv.pop().map(value_to_header_string)?;
                    let name = kv.pop().map(value_to_header_string)?;
                    Some((name, value))
                }
                _ => None,
            })
            .collect(),
        Some(Value::String(block)) => block
            .lines()
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect(),
        _ => BTreeMap::new(),
    };
    Ok(headers)
}

/// Query string as `[{name, value}]` or as a raw `a=1&b=2` string.
fn lenient_query_string<'de, D>(deserializer: D) -> Result<Vec<QueryParam>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let params = match value {
        Some(Value::String(raw)) => form_urlencoded::parse(raw.trim_start_matches('?').as_bytes())
            .map(|(name, value)| QueryParam {
                name: name.into_owned(),
                value: value.into_owned(),
            })
            .collect(),
        Some(list @ Value::Array(_)) => {
            serde_json::from_value(list).map_err(serde::de::Error::custom)?
        }
        _ => Vec::new(),
    };
    Ok(params)
}

/// `file` is a name, or `false`/`null` when the body was stored inline.
fn lenient_file<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(name)) if !name.is_empty() => Some(name),
        _ => None,
    })
}
