//! Fixture persistence.
//!
//! - [`FsFixtureStore`]: the on-disk layout shared with the JavaScript tooling
//! - [`MemoryFixtureStore`]: an in-process store for embedding and tests
//!
//! Stores only move fixture content around. Deciding what an unreadable
//! session means is left to [`crate::mocks::session`].

pub mod fs;
pub mod memory;

pub use fs::FsFixtureStore;
pub use memory::MemoryFixtureStore;

use crate::types::fixture::{Fixture, FixtureSource};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Collection a fixture is read from or written to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FixtureScope {
    /// Fixtures recorded for one test
    Session(String),
    /// The shared default fixtures
    Defaults,
}

impl FixtureScope {
    pub fn for_source(source: FixtureSource, session: &str) -> Self {
        match source {
            FixtureSource::Test => FixtureScope::Session(session.to_string()),
            FixtureSource::Default => FixtureScope::Defaults,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot (de)serialize '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("'{}' does not hold a fixture object", path.display())]
    NotAFixture { path: PathBuf },
    #[error("no fixture '{id}' in {scope:?}")]
    UnknownFixture { scope: FixtureScope, id: String },
    #[error("write rejected: {0}")]
    WriteRejected(String),
    #[error("cannot list sessions: {0}")]
    Glob(String),
    #[error("invalid response file name '{0}'")]
    InvalidFileName(String),
}

/// Load and save fixture collections.
///
/// Test fixtures are keyed by session name, default fixtures live in a
/// single shared namespace.
pub trait FixtureStore: Send + Sync {
    /// All fixtures recorded for `session`, in recording order.
    fn load_session(
        &self,
        session: &str,
    ) -> impl Future<Output = Result<Vec<Fixture>, StoreError>> + Send;

    /// All default fixtures, in index order.
    fn load_defaults(&self) -> impl Future<Output = Result<Vec<Fixture>, StoreError>> + Send;

    /// Set the `served` flag of a stored fixture, leaving the rest of its
    /// content untouched.
    fn write_served(
        &self,
        scope: &FixtureScope,
        id: &str,
        served: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Add a new fixture at the end of a collection.
    fn append_fixture(
        &self,
        scope: &FixtureScope,
        fixture: &Fixture,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<S: FixtureStore> FixtureStore for Arc<S> {
    fn load_session(
        &self,
        session: &str,
    ) -> impl Future<Output = Result<Vec<Fixture>, StoreError>> + Send {
        (**self).load_session(session)
    }

    fn load_defaults(&self) -> impl Future<Output = Result<Vec<Fixture>, StoreError>> + Send {
        (**self).load_defaults()
    }

    fn write_served(
        &self,
        scope: &FixtureScope,
        id: &str,
        served: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).write_served(scope, id, served)
    }

    fn append_fixture(
        &self,
        scope: &FixtureScope,
        fixture: &Fixture,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).append_fixture(scope, fixture)
    }
}
