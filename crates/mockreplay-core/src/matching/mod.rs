//! Request matching utilities.
//!
//! Everything here is pure: fixtures and live requests go in, a verdict or
//! a score comes out. Consumption state lives in [`crate::mocks`].

mod distance;
mod duplicate;
mod error;
mod normalize;
mod rank;
mod request;

pub use distance::char_difference;
pub use duplicate::is_duplicate;
pub use error::MatchError;
pub use rank::{rank, score};
pub use request::{
    clear_nulls, comparable_pair, fixture_matches_request, is_same_request, is_same_response,
    is_url_and_method_same, json_equal, ComparableRequest,
};
pub use normalize::{normalize_url, strip_host, try_normalize_url, url_path, url_query};
