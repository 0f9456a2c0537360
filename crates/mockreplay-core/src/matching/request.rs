//! Exact request and response equality.

use crate::matching::normalize::{try_normalize_url, url_path};
use crate::matching::MatchError;
use crate::types::fixture::{Fixture, FixtureResponse};
use crate::types::request::{parse_body_text, LiveRequest};
use serde_json::{Map, Number, Value};

/// Request reduced to the parts that take part in matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparableRequest {
    /// Normalized URL (see [`try_normalize_url`])
    pub url: String,
    pub method: String,
    pub body: Option<Value>,
}

/// Drop top-level keys whose value is `null`; a `null` body becomes absent.
pub fn clear_nulls(body: Option<Value>) -> Option<Value> {
    match body {
        None | Some(Value::Null) => None,
        Some(Value::Object(mut map)) => {
            map.retain(|_, v| !v.is_null());
            Some(Value::Object(map))
        }
        other => other,
    }
}

/// Deep structural equality of two JSON values.
///
/// Objects compare by key set and values, arrays element-wise, numbers by
/// numeric value (`1 == 1.0`).
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, av)| b.get(k).is_some_and(|bv| json_equal(av, bv)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(av, bv)| json_equal(av, bv))
        }
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        _ => a == b,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    a == b || matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Compare bodies where a missing side stands for an empty object.
fn bodies_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(present), None) | (None, Some(present)) => json_equal(present, &empty_object()),
        (Some(a), Some(b)) => json_equal(a, b),
    }
}

/// Exact sameness of two requests whose URLs are already normalized.
///
/// `null` body fields count as absent, methods compare case-insensitively,
/// and a body present on one side only is compared against `{}`.
pub fn is_same_request(r1: &ComparableRequest, r2: &ComparableRequest) -> bool {
    if r1.url != r2.url || !r1.method.eq_ignore_ascii_case(&r2.method) {
        return false;
    }
    let b1 = clear_nulls(r1.body.clone());
    let b2 = clear_nulls(r2.body.clone());
    bodies_equal(b1.as_ref(), b2.as_ref())
}

/// Same path (query ignored) and same method.
pub fn is_url_and_method_same(r1: &ComparableRequest, r2: &ComparableRequest) -> bool {
    url_path(&r1.url) == url_path(&r2.url) && r1.method.eq_ignore_ascii_case(&r2.method)
}

fn response_content(response: &FixtureResponse) -> Option<Value> {
    match response.content.as_deref() {
        None | Some("") => None,
        Some(text) => match parse_body_text(text) {
            Value::Null => Some(empty_object()),
            parsed => Some(parsed),
        },
    }
}

/// Same status and structurally equal content. Used for duplicate detection only.
pub fn is_same_response(r1: &FixtureResponse, r2: &FixtureResponse) -> bool {
    if r1.status != r2.status {
        return false;
    }
    bodies_equal(response_content(r1).as_ref(), response_content(r2).as_ref())
}

/// Normalize a fixture and a live request with the fixture's ignore list.
pub fn comparable_pair(
    fixture: &Fixture,
    live: &LiveRequest,
) -> Result<(ComparableRequest, ComparableRequest), MatchError> {
    let recorded = ComparableRequest {
        url: try_normalize_url(&fixture.url, &fixture.ignore_params)?,
        method: fixture.method.clone(),
        body: fixture.request_body(),
    };
    let incoming = ComparableRequest {
        url: try_normalize_url(&live.url, &fixture.ignore_params)?,
        method: live.method().to_string(),
        body: live.parsed_body(),
    };
    Ok((recorded, incoming))
}

/// Whether `fixture` is an exact answer for `live`.
pub fn fixture_matches_request(fixture: &Fixture, live: &LiveRequest) -> Result<bool, MatchError> {
    let (recorded, incoming) = comparable_pair(fixture, live)?;
    Ok(is_url_and_method_same(&recorded, &incoming) && is_same_request(&recorded, &incoming))
}
