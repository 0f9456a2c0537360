//! Turning captured exchanges into stored fixtures.

use crate::matching::{is_duplicate, strip_host};
use crate::store::{FixtureScope, FixtureStore, StoreError};
use crate::types::fixture::{Fixture, FixtureRequest, FixtureResponse, FixtureSource, QueryParam};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::OnceLock;

/// Request headers never written to fixtures unless configured otherwise.
pub const DEFAULT_EXCLUDED_HEADERS: [&str; 4] =
    ["cookie", "set-cookie", "authorization", "www-authenticate"];

/// A request/response pair observed while recording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedExchange {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub response_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Name of the binary payload stored under `_files`
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordOptions {
    /// Host-stripped URLs must match to be recorded; `None` records everything
    pub pattern: Option<Regex>,
    /// Request header names dropped from fixtures (case-insensitive)
    pub excluded_headers: Vec<String>,
    /// Copied into every recorded fixture
    pub ignore_params: Vec<String>,
    pub avoid_duplicates_in_test: bool,
    pub avoid_duplicates_with_defaults: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            pattern: None,
            excluded_headers: DEFAULT_EXCLUDED_HEADERS.iter().map(|h| h.to_string()).collect(),
            ignore_params: Vec::new(),
            avoid_duplicates_in_test: false,
            avoid_duplicates_with_defaults: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Stored(Fixture),
    /// An equivalent fixture already exists
    Duplicate {
        source: FixtureSource,
        existing_id: String,
    },
    /// The URL does not match the record pattern
    Skipped,
}

/// Records fixtures for one test session.
pub struct Recorder<S: FixtureStore> {
    store: S,
    session: String,
    options: RecordOptions,
}

impl<S: FixtureStore> Recorder<S> {
    pub fn new(store: S, session: impl Into<String>, options: RecordOptions) -> Self {
        Self {
            store,
            session: session.into(),
            options,
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn should_record(&self, url: &str) -> bool {
        self.options
            .pattern
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(strip_host(url)))
    }

    /// Fixture for `exchange`, with a fresh id and filtered request headers.
    pub fn build_fixture(&self, exchange: &CapturedExchange) -> Fixture {
        let url = strip_host(&exchange.url).to_string();
        let headers = exchange
            .request_headers
            .iter()
            .filter(|(name, _)| {
                !self
                    .options
                    .excluded_headers
                    .iter()
                    .any(|excluded| excluded.eq_ignore_ascii_case(name))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let post_data = exchange
            .body
            .as_deref()
            .filter(|body| !body.is_empty())
            .map(|text| json!({"mimeType": "application/json", "text": text}));

        Fixture {
            id: uuid::Uuid::new_v4().to_string(),
            time: Some(chrono::Utc::now().to_rfc3339()),
            method: exchange.method.to_ascii_uppercase(),
            request: FixtureRequest {
                headers,
                query_string: query_params(&url),
                post_data,
            },
            response: FixtureResponse {
                status: exchange.status,
                headers: exchange.response_headers.clone(),
                content: if exchange.file.is_some() {
                    None
                } else {
                    exchange.content.clone()
                },
                file: exchange.file.clone(),
            },
            served: false,
            ignore_params: self.options.ignore_params.clone(),
            wait_for: None,
            wait_for_previous: false,
            url,
        }
    }

    /// Build a fixture for `exchange` and append it to the session unless an
    /// equivalent one is already stored.
    pub async fn record(&self, exchange: &CapturedExchange) -> Result<RecordOutcome, StoreError> {
        if !self.should_record(&exchange.url) {
            tracing::trace!(url = %exchange.url, "not recording");
            return Ok(RecordOutcome::Skipped);
        }
        let fixture = self.build_fixture(exchange);

        if self.options.avoid_duplicates_in_test {
            let existing = self.store.load_session(&self.session).await.unwrap_or_else(|e| {
                tracing::debug!(session = %self.session, "no stored fixtures yet: {}", e);
                Vec::new()
            });
            if let Some(duplicate) = find_duplicate(&existing, &fixture) {
                return Ok(self.duplicate(FixtureSource::Test, duplicate, &fixture));
            }
        }

        if self.options.avoid_duplicates_with_defaults {
            let defaults = self.store.load_defaults().await.unwrap_or_else(|e| {
                tracing::debug!(session = %self.session, "no default fixtures: {}", e);
                Vec::new()
            });
            if let Some(duplicate) = find_duplicate(&defaults, &fixture) {
                return Ok(self.duplicate(FixtureSource::Default, duplicate, &fixture));
            }
        }

        self.store
            .append_fixture(&FixtureScope::Session(self.session.clone()), &fixture)
            .await?;
        tracing::info!(
            session = %self.session,
            fixture_id = %fixture.id,
            url = %fixture.url,
            "recorded fixture"
        );
        Ok(RecordOutcome::Stored(fixture))
    }

    fn duplicate(&self, source: FixtureSource, existing: &Fixture, fixture: &Fixture) -> RecordOutcome {
        tracing::info!(
            session = %self.session,
            fixture_id = %existing.id,
            url = %fixture.url,
            ?source,
            "skipping duplicate fixture"
        );
        RecordOutcome::Duplicate {
            source,
            existing_id: existing.id.clone(),
        }
    }
}

fn find_duplicate<'a>(existing: &'a [Fixture], fixture: &Fixture) -> Option<&'a Fixture> {
    existing.iter().find(|stored| is_duplicate(stored, fixture, true))
}

fn query_params(url: &str) -> Vec<QueryParam> {
    let without_fragment = url.split('#').next().unwrap_or("");
    let Some((_, query)) = without_fragment.split_once('?') else {
        return Vec::new();
    };
    form_urlencoded::parse(query.as_bytes())
        .map(|(name, value)| QueryParam {
            name: name.into_owned(),
            value: value.into_owned(),
        })
        .collect()
}

fn path_extension() -> &'static Regex {
    static PATH_EXTENSION: OnceLock<Regex> = OnceLock::new();
    PATH_EXTENSION.get_or_init(|| Regex::new(r"\.[a-zA-Z0-9]+$").expect("valid regex"))
}

/// Extension (with the dot) under which a response body is saved as a file.
///
/// Taken from the URL path when it has one, otherwise from a known binary
/// `content_type`. `None` means the body stays inline.
pub fn file_extension_for(path: &str, content_type: Option<&str>) -> Option<String> {
    let path = strip_host(path);
    let path = path.split(['?', '#']).next().unwrap_or("");
    if let Some(found) = path_extension().find(path) {
        return Some(found.as_str().to_string());
    }

    let mime = content_type?.split(';').next()?.trim().to_ascii_lowercase();
    let extension = match mime.as_str() {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "application/javascript" | "application/x-javascript" | "text/javascript" => ".js",
        "text/css" => ".css",
        "font/woff" => ".woff",
        "font/woff2" => ".woff2",
        "font/ttf" => ".ttf",
        "audio/mpeg" => ".mp3",
        "audio/wav" => ".wav",
        "video/mp4" => ".mp4",
        "application/pdf" => ".pdf",
        _ => return None,
    };
    Some(extension.to_string())
}

/// `Content-Type` for serving a stored file, by extension.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html",
        "xhtml" => "application/xhtml+xml",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "yaml" | "yml" => "text/yaml",
        "toml" => "text/toml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryFixtureStore;
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    #[fixture]
    fn exchange() -> CapturedExchange {
        CapturedExchange {
            url: "http://localhost:3000/api/users?page=2&sort=name".to_string(),
            method: "post".to_string(),
            request_headers: BTreeMap::from([
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Cookie".to_string(), "sid=1".to_string()),
                ("authorization".to_string(), "Bearer x".to_string()),
            ]),
            body: Some(r#"{"name":"ann"}"#.to_string()),
            status: 201,
            response_headers: BTreeMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            content: Some(r#"{"id":7}"#.to_string()),
            file: None,
        }
    }

    fn options(in_test: bool, with_defaults: bool) -> RecordOptions {
        RecordOptions {
            pattern: Some(Regex::new("^/api/.*").unwrap()),
            ignore_params: vec!["ts".to_string()],
            avoid_duplicates_in_test: in_test,
            avoid_duplicates_with_defaults: with_defaults,
            ..RecordOptions::default()
        }
    }

    #[rstest]
    #[case("http://localhost:3000/api/users", true)]
    #[case("/api/users?x=1", true)]
    #[case("https://cdn.example.com/static/app.js", false)]
    #[case("/apiary", false)]
    fn test_should_record(#[case] url: &str, #[case] expected: bool) {
        let recorder = Recorder::new(MemoryFixtureStore::new(), "t", options(false, false));
        assert_eq!(recorder.should_record(url), expected);
    }

    #[rstest]
    fn test_should_record_without_pattern() {
        let recorder = Recorder::new(MemoryFixtureStore::new(), "t", RecordOptions::default());
        assert!(recorder.should_record("/anything.png"));
    }

    #[rstest]
    fn test_build_fixture(exchange: CapturedExchange) {
        let recorder = Recorder::new(MemoryFixtureStore::new(), "t", options(false, false));
        let fixture = recorder.build_fixture(&exchange);

        assert_eq!(fixture.id.len(), 36);
        assert_eq!(fixture.url, "/api/users?page=2&sort=name");
        assert_eq!(fixture.method, "POST");
        assert!(fixture.time.is_some());
        assert_eq!(
            fixture.request.headers.keys().collect::<Vec<_>>(),
            vec!["Content-Type"]
        );
        assert_eq!(
            fixture.request.query_string,
            vec![
                QueryParam { name: "page".into(), value: "2".into() },
                QueryParam { name: "sort".into(), value: "name".into() },
            ]
        );
        assert_eq!(fixture.request_body(), Some(json!({"name": "ann"})));
        assert_eq!(fixture.response.status, 201);
        assert_eq!(fixture.response.content.as_deref(), Some(r#"{"id":7}"#));
        assert!(!fixture.served);
        assert_eq!(fixture.ignore_params, vec!["ts".to_string()]);
    }

    #[rstest]
    fn test_build_fixture_with_file_and_no_body(mut exchange: CapturedExchange) {
        exchange.body = None;
        exchange.file = Some("logo.png".to_string());
        let recorder = Recorder::new(MemoryFixtureStore::new(), "t", options(false, false));
        let fixture = recorder.build_fixture(&exchange);

        assert_eq!(fixture.request.post_data, None);
        assert_eq!(fixture.response.file.as_deref(), Some("logo.png"));
        assert_eq!(fixture.response.content, None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_record_appends_to_session(exchange: CapturedExchange) {
        let store = Arc::new(MemoryFixtureStore::new());
        let recorder = Recorder::new(store.clone(), "t", options(false, false));

        let outcome = recorder.record(&exchange).await.unwrap();
        assert!(matches!(outcome, RecordOutcome::Stored(_)));
        recorder.record(&exchange).await.unwrap();
        assert_eq!(store.session("t").await.unwrap().len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn test_record_skips_unmatched_urls(mut exchange: CapturedExchange) {
        exchange.url = "http://localhost:3000/assets/app.css".to_string();
        let store = Arc::new(MemoryFixtureStore::new());
        let recorder = Recorder::new(store.clone(), "t", options(true, true));

        assert_eq!(recorder.record(&exchange).await.unwrap(), RecordOutcome::Skipped);
        assert_eq!(store.session("t").await, None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_record_suppresses_duplicates_in_test(exchange: CapturedExchange) {
        let store = Arc::new(MemoryFixtureStore::new());
        let recorder = Recorder::new(store.clone(), "t", options(true, false));

        let first = match recorder.record(&exchange).await.unwrap() {
            RecordOutcome::Stored(fixture) => fixture,
            other => panic!("expected stored fixture, got {other:?}"),
        };
        let mut reordered = exchange.clone();
        reordered.url = "/api/users?sort=name&page=2".to_string();
        reordered.body = Some(r#"{ "name": "ann" }"#.to_string());

        assert_eq!(
            recorder.record(&reordered).await.unwrap(),
            RecordOutcome::Duplicate {
                source: FixtureSource::Test,
                existing_id: first.id,
            }
        );
        assert_eq!(store.session("t").await.unwrap().len(), 1);

        let mut changed = exchange.clone();
        changed.content = Some(r#"{"id":8}"#.to_string());
        assert!(matches!(
            recorder.record(&changed).await.unwrap(),
            RecordOutcome::Stored(_)
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn test_record_suppresses_duplicates_with_defaults(exchange: CapturedExchange) {
        let seed = Recorder::new(MemoryFixtureStore::new(), "t", options(false, false))
            .build_fixture(&exchange);
        let store = Arc::new(MemoryFixtureStore::new().with_defaults(vec![seed.clone()]));

        let ignoring_defaults = Recorder::new(store.clone(), "t", options(true, false));
        assert!(matches!(
            ignoring_defaults.record(&exchange).await.unwrap(),
            RecordOutcome::Stored(_)
        ));

        let recorder = Recorder::new(store.clone(), "u", options(false, true));
        assert_eq!(
            recorder.record(&exchange).await.unwrap(),
            RecordOutcome::Duplicate {
                source: FixtureSource::Default,
                existing_id: seed.id,
            }
        );
        assert_eq!(store.session("u").await, None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_record_propagates_store_failure(exchange: CapturedExchange) {
        let store = MemoryFixtureStore::new();
        store.set_fail_writes(true);
        let recorder = Recorder::new(store, "t", options(false, false));
        assert!(matches!(
            recorder.record(&exchange).await,
            Err(StoreError::WriteRejected(_))
        ));
    }

    #[rstest]
    #[case("/static/app.js", None, Some(".js"))]
    #[case("http://cdn/img/logo.PNG?v=2", None, Some(".PNG"))]
    #[case("/api/avatar", Some("image/png"), Some(".png"))]
    #[case("/api/avatar", Some("image/svg+xml; charset=utf-8"), Some(".svg"))]
    #[case("/api/users", Some("application/json"), None)]
    #[case("/api/users", None, None)]
    fn test_file_extension_for(
        #[case] path: &str,
        #[case] content_type: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(file_extension_for(path, content_type).as_deref(), expected);
    }

    #[rstest]
    #[case("index.html", "text/html")]
    #[case("/files/report.PDF", "application/pdf")]
    #[case("data.yml", "text/yaml")]
    #[case("blob", "application/octet-stream")]
    #[case("archive.unknown", "application/octet-stream")]
    #[case("/v1.0/report", "application/octet-stream")]
    #[case("/v1.0/report.csv", "text/csv")]
    #[case(".env", "application/octet-stream")]
    fn test_content_type_for(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(content_type_for(path), expected);
    }
}
