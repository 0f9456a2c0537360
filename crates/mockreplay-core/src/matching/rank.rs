//! Closeness scoring for fuzzy fallback.

use crate::matching::distance::char_difference;
use crate::matching::normalize::url_query;
use crate::matching::request::{clear_nulls, comparable_pair, is_url_and_method_same};
use crate::matching::{ComparableRequest, MatchError};
use crate::types::fixture::Fixture;
use crate::types::request::LiveRequest;
use serde_json::{Map, Value};

/// Score a fixture against a live request; lower is closer.
///
/// Returns `None` when path or method differ, so the fixture is not a
/// candidate at all. `Some(1)` is the best possible score.
pub fn rank(fixture: &Fixture, live: &LiveRequest) -> Result<Option<u64>, MatchError> {
    let (recorded, incoming) = comparable_pair(fixture, live)?;
    if !is_url_and_method_same(&recorded, &incoming) {
        return Ok(None);
    }
    Ok(Some(score(&recorded, &incoming)))
}

/// `1 + distance(queries) + distance(serialized bodies)`.
pub fn score(r1: &ComparableRequest, r2: &ComparableRequest) -> u64 {
    let query_diff = char_difference(url_query(&r1.url), url_query(&r2.url));
    let body_diff = char_difference(&serialize_body(&r1.body), &serialize_body(&r2.body));
    1 + query_diff + body_diff
}

fn serialize_body(body: &Option<Value>) -> String {
    clear_nulls(body.clone())
        .unwrap_or_else(|| Value::Object(Map::new()))
        .to_string()
}
