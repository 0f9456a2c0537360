//! Replay configuration.

use crate::config::error::ConfigError;
use crate::config::parser::read_config_file;
use crate::mocks::recorder::{RecordOptions, DEFAULT_EXCLUDED_HEADERS};
use crate::store::FsFixtureStore;
use crate::types::mode::MatchMode;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by replay and recording.
///
/// Field names follow the JavaScript tooling; the upper-case `MOCK_DIR` and
/// `EXCLUDED_HEADERS` spellings are accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayConfig {
    #[serde(alias = "MOCK_DIR", default = "default_mock_dir")]
    pub mock_dir: PathBuf,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub ignore_params: Vec<String>,
    /// Comma separated string or list of header names
    #[serde(
        alias = "EXCLUDED_HEADERS",
        default = "default_excluded_headers",
        deserialize_with = "header_list"
    )]
    pub excluded_headers: Vec<String>,
    #[serde(default = "default_record_pattern")]
    pub record_pattern: String,
    /// URLs matching this regex bypass replay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_pattern: Option<String>,
    #[serde(default)]
    pub avoid_duplicates_in_the_test: bool,
    #[serde(default)]
    pub avoid_duplicates_with_default_mocks: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            mock_dir: default_mock_dir(),
            mode: MatchMode::default(),
            ignore_params: Vec::new(),
            excluded_headers: default_excluded_headers(),
            record_pattern: default_record_pattern(),
            exclude_pattern: None,
            avoid_duplicates_in_the_test: false,
            avoid_duplicates_with_default_mocks: false,
        }
    }
}

fn default_mock_dir() -> PathBuf {
    PathBuf::from("mocks")
}

fn default_excluded_headers() -> Vec<String> {
    DEFAULT_EXCLUDED_HEADERS.iter().map(|h| h.to_string()).collect()
}

fn default_record_pattern() -> String {
    "^/api/.*".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderList {
    Joined(String),
    List(Vec<String>),
}

fn header_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = match HeaderList::deserialize(deserializer)? {
        HeaderList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        HeaderList::List(list) => list,
    };
    Ok(names
        .iter()
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect())
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        name,
        pattern: pattern.to_string(),
        source,
    })
}

impl ReplayConfig {
    /// Resolve a relative `mockDir` against `base`.
    pub fn resolve_mock_dir(mut self, base: &Path) -> Self {
        if self.mock_dir.is_relative() {
            self.mock_dir = base.join(&self.mock_dir);
        }
        self
    }

    /// Compiled `excludePattern`, if configured.
    pub fn exclude_regex(&self) -> Result<Option<Regex>, ConfigError> {
        self.exclude_pattern
            .as_deref()
            .map(|pattern| compile("excludePattern", pattern))
            .transpose()
    }

    pub fn record_options(&self) -> Result<RecordOptions, ConfigError> {
        Ok(RecordOptions {
            pattern: Some(compile("recordPattern", &self.record_pattern)?),
            excluded_headers: self.excluded_headers.clone(),
            ignore_params: self.ignore_params.clone(),
            avoid_duplicates_in_test: self.avoid_duplicates_in_the_test,
            avoid_duplicates_with_defaults: self.avoid_duplicates_with_default_mocks,
        })
    }

    pub fn store(&self) -> FsFixtureStore {
        FsFixtureStore::new(&self.mock_dir)
    }
}

/// Load a config file; a relative `mockDir` is resolved against the current
/// directory.
pub fn load_config(path: impl AsRef<Path>) -> Result<ReplayConfig, ConfigError> {
    let path = path.as_ref();
    let config: ReplayConfig = read_config_file(path)?;
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    let config = config.resolve_mock_dir(&cwd);
    tracing::debug!(
        config = %path.display(),
        mock_dir = %config.mock_dir.display(),
        mode = %config.mode,
        "loaded replay config"
    );
    Ok(config)
}
