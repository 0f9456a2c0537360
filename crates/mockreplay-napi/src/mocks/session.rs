//! NAPI bindings for replay sessions.

use crate::config::{load, LiveRequest};
use crate::mocks::source_name;
use mockreplay_core::mocks::{
    MatchOutcome, ReplaySession as CoreReplaySession, ServedFixture, Strategy,
};
use mockreplay_core::store::FsFixtureStore;
use mockreplay_core::types::MatchMode;
use napi::bindgen_prelude::*;
use napi_derive::napi;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of a fixture lookup
#[napi(object)]
pub struct MatchResult {
    /// `found`, `notFound` or `malformed`
    pub status: String,
    /// `test` or `default` when found
    pub source: Option<String>,
    /// `exact`, `defaultExact` or `ranked` when found
    pub strategy: Option<String>,
    pub rank: Option<i64>,
    /// The served fixture
    pub fixture: Option<serde_json::Value>,
    /// Response headers to send, in recorded and Title-Case spelling
    pub headers: Option<HashMap<String, String>>,
    /// Absolute path of the binary payload, when the fixture has one
    pub file_path: Option<String>,
    /// Why the request could not be matched (`malformed` only)
    pub reason: Option<String>,
}

impl MatchResult {
    fn empty(status: &str) -> Self {
        Self {
            status: status.to_string(),
            source: None,
            strategy: None,
            rank: None,
            fixture: None,
            headers: None,
            file_path: None,
            reason: None,
        }
    }
}

#[napi]
pub struct ReplaySession {
    inner: Arc<Mutex<CoreReplaySession<FsFixtureStore>>>,
}

#[napi]
impl ReplaySession {
    /// Open the replay session of a test
    ///
    /// The mode stored for the test in `tests.json` takes precedence over
    /// the configured one.
    ///
    /// @param configPath - Path to the replay config file
    /// @param testName - Name of the recorded test
    #[napi]
    pub async fn open(config_path: String, test_name: String) -> Result<ReplaySession> {
        let config = load(&config_path)?;
        let exclude = config
            .exclude_regex()
            .map_err(crate::config::config_error)?;
        let store = config.store();

        let stored_mode = match store.find_test(&test_name).await {
            Ok(test) => test.and_then(|t| t.mode),
            Err(e) => {
                tracing::warn!(session = %test_name, "cannot read test registry: {}", e);
                None
            }
        };
        let mode: MatchMode = stored_mode.unwrap_or(config.mode);

        let mut session = CoreReplaySession::open(store, test_name, mode).await;
        if let Some(pattern) = exclude {
            session = session.with_exclude_pattern(pattern);
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(session)),
        })
    }

    /// Find the fixture answering a request and mark it served
    #[napi]
    pub async fn select(&self, request: LiveRequest) -> Result<MatchResult> {
        let mut session = self.inner.lock().await;
        let outcome = session.select(&request.into()).await;

        let served = match outcome {
            MatchOutcome::Found(served) => served,
            MatchOutcome::NotFound => return Ok(MatchResult::empty("notFound")),
            MatchOutcome::Malformed(reason) => {
                return Ok(MatchResult {
                    reason: Some(reason),
                    ..MatchResult::empty("malformed")
                })
            }
        };
        let ServedFixture {
            source,
            fixture,
            strategy,
        } = served;

        let file_path = match &fixture.response.file {
            Some(file) => session
                .store()
                .resolve_response_file(session.name(), file)
                .await
                .map(|path| path.display().to_string()),
            None => None,
        };
        let (strategy, rank) = match strategy {
            Strategy::Exact => ("exact", None),
            Strategy::DefaultExact => ("defaultExact", None),
            Strategy::Ranked(rank) => ("ranked", Some(i64::try_from(rank).unwrap_or(i64::MAX))),
        };

        Ok(MatchResult {
            status: "found".to_string(),
            source: Some(source_name(source)),
            strategy: Some(strategy.to_string()),
            rank,
            headers: Some(fixture.response.served_headers().into_iter().collect()),
            file_path,
            fixture: Some(
                serde_json::to_value(&fixture).map_err(|e| Error::from_reason(e.to_string()))?,
            ),
            reason: None,
        })
    }

    /// Mark every fixture of the test unserved again
    #[napi]
    pub async fn reset(&self) -> Result<()> {
        self.inner.lock().await.reset().await;
        Ok(())
    }

    /// Whether a request should bypass replay (matches `excludePattern`)
    #[napi]
    pub async fn is_excluded(&self, url: String) -> bool {
        self.inner.lock().await.is_excluded(&url)
    }

    /// Current match mode, `strict` or `loose`
    #[napi]
    pub async fn mode(&self) -> String {
        self.inner.lock().await.mode().to_string()
    }
}
