//! Error types for request matching.

use thiserror::Error;

/// A fixture or live request that cannot be compared.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("cannot parse url '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_match_error_display() {
        let error = MatchError::MalformedUrl {
            url: "http://[::1".to_string(),
            reason: "invalid IPv6 address".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("cannot parse url"));
        assert!(display.contains("http://[::1"));
        assert!(display.contains("invalid IPv6 address"));
    }
}
