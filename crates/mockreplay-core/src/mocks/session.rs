//! Replay session: one test run answering live requests from its fixtures.

use crate::mocks::ledger::ServedLedger;
use crate::mocks::selector::{select_fixture, Choice, Selection, Strategy};
use crate::store::{FixtureScope, FixtureStore};
use crate::types::fixture::{Fixture, FixtureSource};
use crate::types::mode::MatchMode;
use crate::types::request::LiveRequest;
use regex::Regex;

/// Fixture chosen for a live request, with `served` set.
#[derive(Debug, Clone, PartialEq)]
pub struct ServedFixture {
    pub source: FixtureSource,
    pub fixture: Fixture,
    pub strategy: Strategy,
}

/// Result of [`ReplaySession::select`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Found(ServedFixture),
    /// No fixture answers the request; the caller decides the fallback
    NotFound,
    /// The live request URL cannot be parsed
    Malformed(String),
}

/// Fixtures and served state of one test session.
///
/// Fixture content is loaded once; only `served` changes afterwards. What
/// has been served is tracked in the session's own [`ServedLedger`] and
/// mirrored to the loaded fixtures and the store.
pub struct ReplaySession<S: FixtureStore> {
    store: S,
    name: String,
    mode: MatchMode,
    test: Vec<Fixture>,
    defaults: Vec<Fixture>,
    ledger: ServedLedger,
    exclude: Option<Regex>,
}

impl<S: FixtureStore> ReplaySession<S> {
    /// Load the session and default fixtures and start from a clean slate.
    ///
    /// A collection that cannot be loaded counts as empty.
    pub async fn open(store: S, name: impl Into<String>, mode: MatchMode) -> Self {
        let name = name.into();

        let test = store.load_session(&name).await.unwrap_or_else(|e| {
            tracing::warn!(session = %name, "cannot load session fixtures: {}", e);
            Vec::new()
        });
        let defaults = store.load_defaults().await.unwrap_or_else(|e| {
            tracing::warn!(session = %name, "cannot load default fixtures: {}", e);
            Vec::new()
        });

        let mut ledger = ServedLedger::new();
        ledger.seed(FixtureSource::Default, &defaults);

        let mut session = Self {
            store,
            name,
            mode,
            test,
            defaults,
            ledger,
            exclude: None,
        };
        session.reset().await;
        tracing::info!(
            session = %session.name,
            mode = %session.mode,
            test_fixtures = session.test.len(),
            default_fixtures = session.defaults.len(),
            "replay session opened"
        );
        session
    }

    /// Let requests whose URL matches `pattern` bypass replay.
    pub fn with_exclude_pattern(mut self, pattern: Regex) -> Self {
        self.exclude = Some(pattern);
        self
    }

    /// Mark every test fixture unserved, in the ledger and in the store.
    pub async fn reset(&mut self) {
        self.ledger
            .reset_test(self.test.iter().map(|f| f.id.as_str()));

        let scope = FixtureScope::Session(self.name.clone());
        for fixture in &mut self.test {
            fixture.served = false;
            if let Err(e) = self.store.write_served(&scope, &fixture.id, false).await {
                tracing::warn!(
                    session = %self.name,
                    fixture_id = %fixture.id,
                    "cannot reset served flag: {}",
                    e
                );
            }
        }
    }

    /// Choose the fixture answering `live` and record it as served.
    ///
    /// The served flag is written before returning; a failing write is logged
    /// and does not affect the outcome.
    pub async fn select(&mut self, live: &LiveRequest) -> MatchOutcome {
        let selection = select_fixture(&self.test, &self.defaults, &self.ledger, live, self.mode);
        let Choice {
            source,
            index,
            strategy,
        } = match selection {
            Selection::Found(choice) => choice,
            Selection::NotFound => {
                tracing::debug!(session = %self.name, url = %live.url, "no fixture found");
                return MatchOutcome::NotFound;
            }
            Selection::Malformed(reason) => return MatchOutcome::Malformed(reason),
        };

        let collection = match source {
            FixtureSource::Test => &mut self.test,
            FixtureSource::Default => &mut self.defaults,
        };
        collection[index].served = true;
        let fixture = collection[index].clone();
        self.ledger.mark_served(source, &fixture.id);

        let scope = FixtureScope::for_source(source, &self.name);
        if let Err(e) = self.store.write_served(&scope, &fixture.id, true).await {
            tracing::warn!(
                session = %self.name,
                fixture_id = %fixture.id,
                "cannot persist served flag: {}",
                e
            );
        }

        tracing::debug!(
            session = %self.name,
            fixture_id = %fixture.id,
            url = %live.url,
            ?strategy,
            "serving fixture"
        );
        MatchOutcome::Found(ServedFixture {
            source,
            fixture,
            strategy,
        })
    }

    /// Whether a request to `url` should bypass replay.
    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(url))
    }

    pub fn is_served(&self, source: FixtureSource, id: &str) -> bool {
        self.ledger.is_served(source, id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn test_fixtures(&self) -> &[Fixture] {
        &self.test
    }

    pub fn default_fixtures(&self) -> &[Fixture] {
        &self.defaults
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FsFixtureStore, MemoryFixtureStore};
    use rstest::{fixture, rstest};
    use serde_json::json;
    use std::sync::Arc;

    fn fixture_at(id: &str, method: &str, url: &str) -> Fixture {
        Fixture::new(id, method, url)
    }

    #[fixture]
    fn store() -> Arc<MemoryFixtureStore> {
        let mut stale = fixture_at("3", "GET", "/api/status");
        stale.served = true;
        let mut login = fixture_at("login", "POST", "/api/login");
        login.request.post_data =
            Some(json!({"mimeType": "application/json", "text": "{\"user\":\"ann\"}"}));

        Arc::new(
            MemoryFixtureStore::new()
                .with_session(
                    "status",
                    vec![
                        fixture_at("1", "GET", "/api/status"),
                        fixture_at("2", "GET", "/api/status"),
                        stale,
                        login,
                    ],
                )
                .with_defaults(vec![fixture_at("cfg", "GET", "/api/config")]),
        )
    }

    fn served_id(outcome: &MatchOutcome) -> Option<&str> {
        match outcome {
            MatchOutcome::Found(served) => Some(served.fixture.id.as_str()),
            _ => None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_open_resets_served_flags(store: Arc<MemoryFixtureStore>) {
        let session = ReplaySession::open(store.clone(), "status", MatchMode::Strict).await;

        assert_eq!(session.test_fixtures().len(), 4);
        assert!(!session.is_served(FixtureSource::Test, "3"));
        let stored = store.session("status").await.unwrap();
        assert!(stored.iter().all(|f| !f.served));
    }

    #[rstest]
    #[tokio::test]
    async fn test_select_serves_in_order_then_repeats_last(store: Arc<MemoryFixtureStore>) {
        let mut session = ReplaySession::open(store.clone(), "status", MatchMode::Strict).await;
        let live = LiveRequest::new("GET", "http://localhost:4200/api/status");

        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(served_id(&session.select(&live).await).map(str::to_string));
        }
        assert_eq!(
            ids,
            vec![
                Some("1".to_string()),
                Some("2".to_string()),
                Some("3".to_string()),
                Some("3".to_string())
            ]
        );

        let stored = store.session("status").await.unwrap();
        assert!(stored[..3].iter().all(|f| f.served));
        assert!(!stored[3].served);
    }

    #[rstest]
    #[tokio::test]
    async fn test_select_body_and_defaults(store: Arc<MemoryFixtureStore>) {
        let mut session = ReplaySession::open(store.clone(), "status", MatchMode::Strict).await;

        let login = LiveRequest::new("post", "/api/login").with_body(r#"{ "user": "ann" }"#);
        assert_eq!(served_id(&session.select(&login).await), Some("login"));

        let other = LiveRequest::new("POST", "/api/login").with_body(r#"{"user":"bob"}"#);
        assert_eq!(session.select(&other).await, MatchOutcome::NotFound);

        let outcome = session.select(&LiveRequest::new("GET", "/api/config")).await;
        match outcome {
            MatchOutcome::Found(served) => {
                assert_eq!(served.source, FixtureSource::Default);
                assert_eq!(served.strategy, Strategy::DefaultExact);
                assert!(served.fixture.served);
            }
            other => panic!("expected default fixture, got {other:?}"),
        }
        assert!(store.defaults().await[0].served);
    }

    #[rstest]
    #[tokio::test]
    async fn test_loose_session_falls_back_to_rank(store: Arc<MemoryFixtureStore>) {
        let mut session = ReplaySession::open(store, "status", MatchMode::Loose).await;
        let live = LiveRequest::new("GET", "/api/status?cache=0");

        match session.select(&live).await {
            MatchOutcome::Found(served) => {
                assert_eq!(served.fixture.id, "1");
                assert!(matches!(served.strategy, Strategy::Ranked(_)));
            }
            other => panic!("expected ranked fixture, got {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_storage_failure_is_not_fatal(store: Arc<MemoryFixtureStore>) {
        store.set_fail_writes(true);
        let mut session = ReplaySession::open(store.clone(), "status", MatchMode::Strict).await;
        let live = LiveRequest::new("GET", "/api/status");

        assert_eq!(served_id(&session.select(&live).await), Some("1"));
        assert_eq!(served_id(&session.select(&live).await), Some("2"));
        assert!(session.is_served(FixtureSource::Test, "1"));
        // the stale flag was never cleared in the store
        assert!(store.session("status").await.unwrap()[2].served);
    }

    #[rstest]
    #[tokio::test]
    async fn test_unknown_session_has_no_fixtures(store: Arc<MemoryFixtureStore>) {
        let mut session = ReplaySession::open(store, "missing", MatchMode::Loose).await;
        assert!(session.test_fixtures().is_empty());

        let outcome = session.select(&LiveRequest::new("GET", "/api/status")).await;
        assert_eq!(outcome, MatchOutcome::NotFound);
        let outcome = session.select(&LiveRequest::new("GET", "/api/config")).await;
        assert_eq!(served_id(&outcome), Some("cfg"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_sessions_do_not_share_state(store: Arc<MemoryFixtureStore>) {
        let live = LiveRequest::new("GET", "/api/status");
        let mut first = ReplaySession::open(store.clone(), "status", MatchMode::Strict).await;
        assert_eq!(served_id(&first.select(&live).await), Some("1"));

        let mut second = ReplaySession::open(store.clone(), "status", MatchMode::Strict).await;
        assert_eq!(served_id(&second.select(&live).await), Some("1"));
        assert_eq!(served_id(&first.select(&live).await), Some("2"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_reset_starts_over(store: Arc<MemoryFixtureStore>) {
        let mut session = ReplaySession::open(store.clone(), "status", MatchMode::Strict).await;
        let live = LiveRequest::new("GET", "/api/status");
        session.select(&live).await;
        session.select(&live).await;

        session.reset().await;
        assert!(session.test_fixtures().iter().all(|f| !f.served));
        assert!(store.session("status").await.unwrap().iter().all(|f| !f.served));
        assert_eq!(served_id(&session.select(&live).await), Some("1"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_loaded_fixtures_track_served(store: Arc<MemoryFixtureStore>) {
        let mut session = ReplaySession::open(store, "status", MatchMode::Strict).await;
        session.select(&LiveRequest::new("GET", "/api/status")).await;
        session.select(&LiveRequest::new("GET", "/api/config")).await;

        let served: Vec<bool> = session.test_fixtures().iter().map(|f| f.served).collect();
        assert_eq!(served, vec![true, false, false, false]);
        assert!(session.default_fixtures()[0].served);
    }

    #[tokio::test]
    async fn test_open_and_select_keep_recorded_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let session_dir = dir.path().join("test_t");
        std::fs::create_dir_all(&session_dir).unwrap();
        std::fs::write(
            session_dir.join("_mock_list.json"),
            json!([{"id": "a", "url": "/api/me", "method": "GET"}]).to_string(),
        )
        .unwrap();
        let recorded = json!({
            "id": "a",
            "url": "/api/me",
            "method": "GET",
            "delay": 250,
            "notes": "keep me",
            "request": {"postData": null},
            "response": {"status": 200, "content": "{}", "file": false},
            "served": true
        });
        let fixture_path = session_dir.join("mock_a.json");
        std::fs::write(&fixture_path, recorded.to_string()).unwrap();
        let read_back = || -> serde_json::Value {
            serde_json::from_str(&std::fs::read_to_string(&fixture_path).unwrap()).unwrap()
        };

        let mut session =
            ReplaySession::open(FsFixtureStore::new(dir.path()), "t", MatchMode::Strict).await;
        let mut expected = recorded.clone();
        expected["served"] = json!(false);
        assert_eq!(read_back(), expected);

        let outcome = session.select(&LiveRequest::new("GET", "/api/me")).await;
        assert_eq!(served_id(&outcome), Some("a"));
        expected["served"] = json!(true);
        assert_eq!(read_back(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_malformed_and_excluded(store: Arc<MemoryFixtureStore>) {
        let mut session = ReplaySession::open(store, "status", MatchMode::Loose)
            .await
            .with_exclude_pattern(Regex::new(r"/assets/|\.svg$").unwrap());

        let outcome = session
            .select(&LiveRequest::new("GET", "http://localhost:99999999/api/status"))
            .await;
        assert!(matches!(outcome, MatchOutcome::Malformed(_)));

        assert!(session.is_excluded("http://localhost/assets/app.js"));
        assert!(session.is_excluded("/img/logo.svg"));
        assert!(!session.is_excluded("/api/status"));
    }
}
