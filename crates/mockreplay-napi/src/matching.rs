//! NAPI bindings for the matching helpers.

use mockreplay_core::matching;
use mockreplay_core::mocks;
use mockreplay_core::types::Fixture;
use napi::bindgen_prelude::*;
use napi_derive::napi;

fn parse_fixture(value: serde_json::Value, what: &str) -> Result<Fixture> {
    serde_json::from_value(value)
        .map_err(|e| Error::from_reason(format!("Invalid {what} fixture: {e}")))
}

/// Canonical `path?sorted_query` form of a URL
///
/// @param url - Absolute or host-relative URL
/// @param ignoreParams - Query parameter names to drop
#[napi]
pub fn normalize_url(url: String, ignore_params: Option<Vec<String>>) -> String {
    matching::normalize_url(&url, &ignore_params.unwrap_or_default())
}

/// Character multiset distance between two strings
#[napi]
pub fn char_difference(a: String, b: String) -> i64 {
    i64::try_from(matching::char_difference(&a, &b)).unwrap_or(i64::MAX)
}

/// Whether two fixtures record the same exchange
///
/// @param compareResponse - Also require the same status and content (default `true`)
#[napi]
pub fn is_duplicate(
    existing: serde_json::Value,
    candidate: serde_json::Value,
    compare_response: Option<bool>,
) -> Result<bool> {
    let existing = parse_fixture(existing, "existing")?;
    let candidate = parse_fixture(candidate, "candidate")?;
    Ok(matching::is_duplicate(
        &existing,
        &candidate,
        compare_response.unwrap_or(true),
    ))
}

/// Extension (with the dot) for saving a response body as a file, if any
#[napi]
pub fn file_extension_for(path: String, content_type: Option<String>) -> Option<String> {
    mocks::file_extension_for(&path, content_type.as_deref())
}

/// `Content-Type` for serving a stored file
#[napi]
pub fn content_type_for(path: String) -> String {
    mocks::content_type_for(&path).to_string()
}
