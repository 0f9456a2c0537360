//! In-process fixture store.

use crate::store::{FixtureScope, FixtureStore, StoreError};
use crate::types::fixture::Fixture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Fixture store backed by in-memory maps.
///
/// An unknown session loads as an error, like a missing folder on disk.
#[derive(Debug, Default)]
pub struct MemoryFixtureStore {
    sessions: Mutex<HashMap<String, Vec<Fixture>>>,
    defaults: Mutex<Vec<Fixture>>,
    fail_writes: AtomicBool,
}

impl MemoryFixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session: impl Into<String>, fixtures: Vec<Fixture>) -> Self {
        self.sessions.get_mut().insert(session.into(), fixtures);
        self
    }

    pub fn with_defaults(mut self, fixtures: Vec<Fixture>) -> Self {
        *self.defaults.get_mut() = fixtures;
        self
    }

    /// Make every subsequent write fail with [`StoreError::WriteRejected`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current content of a session, `None` when it was never stored.
    pub async fn session(&self, session: &str) -> Option<Vec<Fixture>> {
        self.sessions.lock().await.get(session).cloned()
    }

    pub async fn defaults(&self) -> Vec<Fixture> {
        self.defaults.lock().await.clone()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl FixtureStore for MemoryFixtureStore {
    async fn load_session(&self, session: &str) -> Result<Vec<Fixture>, StoreError> {
        self.sessions
            .lock()
            .await
            .get(session)
            .cloned()
            .ok_or_else(|| StoreError::Io {
                path: session.into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "unknown session"),
            })
    }

    async fn load_defaults(&self) -> Result<Vec<Fixture>, StoreError> {
        Ok(self.defaults.lock().await.clone())
    }

    async fn write_served(&self, scope: &FixtureScope, id: &str, served: bool) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut sessions = self.sessions.lock().await;
        let mut defaults = self.defaults.lock().await;
        let collection = match scope {
            FixtureScope::Session(session) => sessions.get_mut(session),
            FixtureScope::Defaults => Some(&mut *defaults),
        };
        let stored = collection
            .and_then(|fixtures| fixtures.iter_mut().find(|f| f.id == id))
            .ok_or_else(|| StoreError::UnknownFixture {
                scope: scope.clone(),
                id: id.to_string(),
            })?;
        stored.served = served;
        Ok(())
    }

    async fn append_fixture(&self, scope: &FixtureScope, fixture: &Fixture) -> Result<(), StoreError> {
        self.check_writable()?;
        match scope {
            FixtureScope::Session(session) => self
                .sessions
                .lock()
                .await
                .entry(session.clone())
                .or_default()
                .push(fixture.clone()),
            FixtureScope::Defaults => self.defaults.lock().await.push(fixture.clone()),
        }
        Ok(())
    }
}
