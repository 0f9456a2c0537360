//! Config file parsing (YAML/JSON/JSONC).

use crate::config::error::ConfigError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Config file format, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Jsonc,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            "jsonc" => Some(ConfigFormat::Jsonc),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Str,
    StrEscape,
    LineComment,
    BlockComment,
}

/// Remove `//` and `/* */` comments outside of string literals.
///
/// Line breaks ending a line comment are kept so error positions still
/// point at the right line.
pub fn strip_json_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut state = Scan::Code;

    while let Some(c) = chars.next() {
        state = match (state, c) {
            (Scan::Code, '"') => {
                out.push(c);
                Scan::Str
            }
            (Scan::Code, '/') if chars.peek() == Some(&'/') => {
                chars.next();
                Scan::LineComment
            }
            (Scan::Code, '/') if chars.peek() == Some(&'*') => {
                chars.next();
                Scan::BlockComment
            }
            (Scan::Code, _) => {
                out.push(c);
                Scan::Code
            }
            (Scan::Str, '\\') => {
                out.push(c);
                Scan::StrEscape
            }
            (Scan::Str, '"') => {
                out.push(c);
                Scan::Code
            }
            (Scan::Str, _) | (Scan::StrEscape, _) => {
                out.push(c);
                Scan::Str
            }
            (Scan::LineComment, '\n' | '\r') => {
                out.push(c);
                Scan::Code
            }
            (Scan::LineComment, _) => Scan::LineComment,
            (Scan::BlockComment, '*') if chars.peek() == Some(&'/') => {
                chars.next();
                Scan::Code
            }
            (Scan::BlockComment, _) => Scan::BlockComment,
        };
    }
    out
}

/// Parse config content in the given format.
pub fn parse_content<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, ConfigError> {
    let parsed = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Jsonc => serde_json::from_str(&strip_json_comments(content))?,
    };
    Ok(parsed)
}

/// Read and parse a config file, picking the format from its extension.
pub fn read_config_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| ConfigError::UnknownFileType(path.display().to_string()))?;
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_content(&content, format)
}
