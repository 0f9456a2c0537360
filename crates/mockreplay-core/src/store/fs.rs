//! Filesystem fixture store.
//!
//! Layout under the mock directory:
//!
//! ```text
//! tests.json                      test registry: [{id, name, mode?}]
//! test_<name>/_mock_list.json     index: [{id, url, method, time}]
//! test_<name>/mock_<id>.json      fixture content
//! test_<name>/_files/             binary response payloads
//! defaultMocks/...                same layout for the shared defaults
//! ```
//!
//! Spaces in test names become underscores in folder names.

use crate::store::{FixtureScope, FixtureStore, StoreError};
use crate::types::fixture::Fixture;
use crate::types::mode::MatchMode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};

const TESTS_FILE: &str = "tests.json";
const INDEX_FILE: &str = "_mock_list.json";
const DEFAULTS_DIR: &str = "defaultMocks";
const FILES_DIR: &str = "_files";

/// Entry of a collection index (`_mock_list.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl From<&Fixture> for IndexEntry {
    fn from(fixture: &Fixture) -> Self {
        Self {
            id: fixture.id.clone(),
            url: fixture.url.clone(),
            method: fixture.method.clone(),
            time: fixture.time.clone(),
        }
    }
}

/// Entry of the test registry (`tests.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<MatchMode>,
    /// Fields written by other tools, kept when the registry is rewritten
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `my test` -> `my_test`
pub fn session_folder_name(session: &str) -> String {
    session.replace(' ', "_")
}

fn fixture_file_name(id: &str) -> String {
    format!("mock_{id}.json")
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, content)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn create_dir(path: &Path) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// A single normal path component: no separators, no `.` or `..`.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Fixture store rooted at a mock directory.
#[derive(Debug, Clone)]
pub struct FsFixtureStore {
    root: PathBuf,
}

impl FsFixtureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, session: &str) -> PathBuf {
        self.root
            .join(format!("test_{}", session_folder_name(session)))
    }

    pub fn defaults_dir(&self) -> PathBuf {
        self.root.join(DEFAULTS_DIR)
    }

    fn scope_dir(&self, scope: &FixtureScope) -> PathBuf {
        match scope {
            FixtureScope::Session(session) => self.session_dir(session),
            FixtureScope::Defaults => self.defaults_dir(),
        }
    }

    async fn read_registry(&self) -> Result<Vec<TestEntry>, StoreError> {
        let path = self.root.join(TESTS_FILE);
        if !is_file(&path).await {
            return Ok(Vec::new());
        }
        read_json(&path).await
    }

    /// Look up a test in the registry. A missing registry means no tests.
    pub async fn find_test(&self, name: &str) -> Result<Option<TestEntry>, StoreError> {
        Ok(self
            .read_registry()
            .await?
            .into_iter()
            .find(|test| test.name == name))
    }

    /// Register a test and create its folder with an empty index.
    ///
    /// Returns the existing entry when the test is already registered.
    pub async fn create_test(&self, name: &str) -> Result<TestEntry, StoreError> {
        let mut tests = self.read_registry().await?;
        let entry = match tests.iter().find(|test| test.name == name) {
            Some(existing) => existing.clone(),
            None => {
                let entry = TestEntry {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    mode: None,
                    extra: Map::new(),
                };
                tests.push(entry.clone());
                create_dir(&self.root).await?;
                write_json(&self.root.join(TESTS_FILE), &tests).await?;
                tracing::info!(session = name, "registered test");
                entry
            }
        };

        let dir = self.session_dir(name);
        create_dir(&dir).await?;
        let index = dir.join(INDEX_FILE);
        if !is_file(&index).await {
            write_json(&index, &Vec::<IndexEntry>::new()).await?;
        }
        Ok(entry)
    }

    /// Match mode registered for a test; loose when unknown or unreadable.
    pub async fn session_mode(&self, name: &str) -> MatchMode {
        match self.find_test(name).await {
            Ok(test) => test.and_then(|t| t.mode).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(session = name, "cannot read test registry: {}", e);
                MatchMode::default()
            }
        }
    }

    /// Folder names (without the `test_` prefix) of every session with an index.
    pub fn list_sessions(&self) -> Result<Vec<String>, StoreError> {
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{root}/test_*/{INDEX_FILE}");
        let paths = glob::glob(&pattern).map_err(|e| StoreError::Glob(e.to_string()))?;

        let mut sessions = Vec::new();
        for path in paths {
            let path = path.map_err(|e| StoreError::Glob(e.to_string()))?;
            let folder = path
                .parent()
                .and_then(Path::file_name)
                .and_then(|name| name.to_str());
            if let Some(session) = folder.and_then(|name| name.strip_prefix("test_")) {
                sessions.push(session.to_string());
            }
        }
        sessions.sort();
        Ok(sessions)
    }

    /// Path of a binary response payload, looked up in the session's
    /// `_files` first and then in the defaults.
    pub async fn resolve_response_file(&self, session: &str, file: &str) -> Option<PathBuf> {
        let candidates = [
            self.session_dir(session).join(FILES_DIR).join(file),
            self.defaults_dir().join(FILES_DIR).join(file),
        ];
        for candidate in candidates {
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Store a binary response payload under the session's `_files`.
    pub async fn write_response_file(
        &self,
        session: &str,
        file: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, StoreError> {
        if !is_plain_file_name(file) {
            return Err(StoreError::InvalidFileName(file.to_string()));
        }
        let dir = self.session_dir(session).join(FILES_DIR);
        create_dir(&dir).await?;
        let path = dir.join(file);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

impl FixtureStore for FsFixtureStore {
    async fn load_session(&self, session: &str) -> Result<Vec<Fixture>, StoreError> {
        let dir = self.session_dir(session);
        let index: Vec<IndexEntry> = read_json(&dir.join(INDEX_FILE)).await?;

        let mut fixtures = Vec::with_capacity(index.len());
        for entry in index {
            let mut fixture: Fixture = read_json(&dir.join(fixture_file_name(&entry.id))).await?;
            fixture.id = entry.id;
            fixtures.push(fixture);
        }
        tracing::debug!(session, count = fixtures.len(), "loaded session fixtures");
        Ok(fixtures)
    }

    async fn load_defaults(&self) -> Result<Vec<Fixture>, StoreError> {
        let dir = self.defaults_dir();
        let index: Vec<IndexEntry> = read_json(&dir.join(INDEX_FILE)).await?;

        let mut fixtures = Vec::with_capacity(index.len());
        for entry in index {
            match read_json::<Fixture>(&dir.join(fixture_file_name(&entry.id))).await {
                Ok(mut fixture) => {
                    fixture.id = entry.id;
                    fixtures.push(fixture);
                }
                Err(e) => tracing::warn!(fixture_id = %entry.id, "skipping default fixture: {}", e),
            }
        }
        tracing::debug!(count = fixtures.len(), "loaded default fixtures");
        Ok(fixtures)
    }

    async fn write_served(&self, scope: &FixtureScope, id: &str, served: bool) -> Result<(), StoreError> {
        let path = self.scope_dir(scope).join(fixture_file_name(id));
        let mut content: Value = read_json(&path).await?;
        let Some(object) = content.as_object_mut() else {
            return Err(StoreError::NotAFixture { path });
        };
        object.insert("served".to_string(), Value::Bool(served));
        write_json(&path, &content).await
    }

    async fn append_fixture(&self, scope: &FixtureScope, fixture: &Fixture) -> Result<(), StoreError> {
        let dir = self.scope_dir(scope);
        create_dir(&dir).await?;

        let index_path = dir.join(INDEX_FILE);
        let mut index: Vec<IndexEntry> = if is_file(&index_path).await {
            read_json(&index_path).await?
        } else {
            Vec::new()
        };
        index.push(IndexEntry::from(fixture));

        write_json(&dir.join(fixture_file_name(&fixture.id)), fixture).await?;
        write_json(&index_path, &index).await
    }
}
