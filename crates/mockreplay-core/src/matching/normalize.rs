//! URL canonicalization for fixture comparison.

use crate::matching::MatchError;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

const SYNTHETIC_BASE: &str = "http://domain.com";

fn host_prefix() -> &'static Regex {
    static HOST_PREFIX: OnceLock<Regex> = OnceLock::new();
    HOST_PREFIX.get_or_init(|| Regex::new(r"^(https?://)?[^/]+").expect("valid regex"))
}

/// Remove a leading `scheme://host[:port]` from a URL.
pub fn strip_host(url: &str) -> &str {
    match host_prefix().find(url) {
        Some(m) => &url[m.end()..],
        None => url,
    }
}

/// Canonicalize a URL as `path?sorted_query`.
///
/// The host is stripped, parameters named in `ignore_params` are dropped, the
/// rest are stable-sorted by name and the result is percent-decoded. An empty
/// query still leaves the trailing `?`.
///
/// Absolute `http(s)` URLs must parse as a whole (valid host and port);
/// anything else is resolved against a placeholder host.
pub fn try_normalize_url(url: &str, ignore_params: &[String]) -> Result<String, MatchError> {
    let absolute = url.starts_with("http://") || url.starts_with("https://");
    let parsed = if absolute {
        Url::parse(url)
    } else {
        Url::parse(&format!("{SYNTHETIC_BASE}{}", strip_host(url)))
    }
    .map_err(|e| MatchError::MalformedUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(name, _)| !ignore_params.iter().any(|ignored| ignored == name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0));

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&params)
        .finish();
    let joined = format!("{}?{}", parsed.path(), query);

    let decoded = match urlencoding::decode(&joined) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => joined.clone(),
    };
    Ok(decoded)
}

/// Like [`try_normalize_url`], falling back to the host-stripped raw string.
pub fn normalize_url(url: &str, ignore_params: &[String]) -> String {
    try_normalize_url(url, ignore_params).unwrap_or_else(|e| {
        tracing::debug!("using raw url for comparison: {}", e);
        strip_host(url).to_string()
    })
}

/// Path part of a normalized URL.
pub fn url_path(normalized: &str) -> &str {
    normalized.split('?').next().unwrap_or("")
}

/// Query part of a normalized URL (empty when there is none).
pub fn url_query(normalized: &str) -> &str {
    normalized.split('?').nth(1).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ignored(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[rstest]
    #[case("/api/users", &[], "/api/users?")]
    #[case("/api/users?page=1", &[], "/api/users?page=1")]
    #[case("http://localhost:3000/api/users?page=1", &[], "/api/users?page=1")]
    #[case("https://example.com", &[], "/?")]
    #[case("example.com/api", &[], "/api?")]
    #[case("/a?b=1&a=2", &[], "/a?a=2&b=1")]
    #[case("/a?b=2&a=1&b=1", &[], "/a?a=1&b=2&b=1")]
    #[case("/a?token=x&id=1", &["token"], "/a?id=1")]
    #[case("/a?token=x", &["token"], "/a?")]
    #[case("/search?q=hello%20world", &[], "/search?q=hello+world")]
    #[case("/files/my%20doc.pdf", &[], "/files/my doc.pdf?")]
    #[case("/a?x=%E4%BD%A0", &[], "/a?x=你")]
    #[case("/a#section?x=1", &[], "/a?")]
    #[case("/bad/%FF", &[], "/bad/%FF?")]
    fn test_normalize_url(
        #[case] url: &str,
        #[case] ignore: &[&str],
        #[case] expected: &str,
    ) {
        assert_eq!(normalize_url(url, &ignored(ignore)), expected);
    }

    #[rstest]
    #[case("http://localhost:99999999/api")]
    #[case("http://[::1/api")]
    fn test_try_normalize_url_malformed(#[case] url: &str) {
        assert!(matches!(
            try_normalize_url(url, &[]),
            Err(MatchError::MalformedUrl { .. })
        ));
        assert_eq!(normalize_url(url, &[]), strip_host(url));
    }

    #[rstest]
    #[case("/a?b=1&a=2", "/a?a=2&b=1", &[])]
    #[case("/a?token=x&id=1", "/a?id=1", &["token"])]
    #[case("https://api.example.com/a?id=1&t=9", "/a?t=3&id=1", &["t"])]
    fn test_normalize_url_equivalent(#[case] a: &str, #[case] b: &str, #[case] ignore: &[&str]) {
        let ignore = ignored(ignore);
        assert_eq!(normalize_url(a, &ignore), normalize_url(b, &ignore));
    }

    #[rstest]
    #[case("/api/users?z=1&a=2&m=3")]
    #[case("http://localhost/search?q=hello%20world&page=2")]
    #[case("/api/items")]
    #[case("/a?token=x&id=1")]
    fn test_normalize_url_idempotent(#[case] url: &str) {
        let ignore = ignored(&["token"]);
        let once = normalize_url(url, &ignore);
        assert_eq!(normalize_url(&once, &ignore), once);
    }

    #[rstest]
    #[case("http://localhost:8080/api", "/api")]
    #[case("https://a.b.c/x/y?z", "/x/y?z")]
    #[case("/already/stripped", "/already/stripped")]
    #[case("", "")]
    fn test_strip_host(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(strip_host(url), expected);
    }

    #[rstest]
    #[case("/api/users?page=1", "/api/users", "page=1")]
    #[case("/api/users?", "/api/users", "")]
    #[case("/api/users", "/api/users", "")]
    fn test_url_parts(#[case] url: &str, #[case] path: &str, #[case] query: &str) {
        assert_eq!(url_path(url), path);
        assert_eq!(url_query(url), query);
    }
}
