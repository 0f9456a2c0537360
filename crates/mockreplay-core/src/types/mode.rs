use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether rank-based fuzzy fallback is allowed when no exact match exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Only exact matches are served
    Strict,
    /// Exact matches first, then the closest same-path fixture
    #[default]
    Loose,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(MatchMode::Strict),
            "loose" => Ok(MatchMode::Loose),
            other => Err(format!("unknown match mode: {other}")),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Strict => write!(f, "strict"),
            MatchMode::Loose => write!(f, "loose"),
        }
    }
}
