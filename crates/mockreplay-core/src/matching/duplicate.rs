//! Duplicate detection for recording.

use crate::matching::normalize::try_normalize_url;
use crate::matching::request::{is_same_request, is_same_response};
use crate::matching::{ComparableRequest, MatchError};
use crate::types::fixture::Fixture;

fn comparable(fixture: &Fixture, ignore_params: &[String]) -> Result<ComparableRequest, MatchError> {
    Ok(ComparableRequest {
        url: try_normalize_url(&fixture.url, ignore_params)?,
        method: fixture.method.clone(),
        body: fixture.request_body(),
    })
}

/// Whether `candidate` would be indistinguishable from the stored `existing`.
///
/// Requests are compared like during replay (with the stored fixture's ignore
/// list); responses additionally when `compare_response` is set. A fixture
/// that cannot be compared is never a duplicate.
pub fn is_duplicate(existing: &Fixture, candidate: &Fixture, compare_response: bool) -> bool {
    let ignore = &existing.ignore_params;
    let same_request = match (comparable(existing, ignore), comparable(candidate, ignore)) {
        (Ok(r1), Ok(r2)) => is_same_request(&r1, &r2),
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!(fixture_id = %existing.id, "skipping duplicate check: {}", e);
            return false;
        }
    };
    same_request && (!compare_response || is_same_response(&existing.response, &candidate.response))
}
