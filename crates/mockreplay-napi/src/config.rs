//! Config and request types shared by the bindings.

use mockreplay_core::config::{self as core_config, ConfigError, ReplayConfig};
use mockreplay_core::mocks::CapturedExchange as CoreCapturedExchange;
use mockreplay_core::types::LiveRequest as CoreLiveRequest;
use napi::bindgen_prelude::*;
use napi_derive::napi;
use std::collections::HashMap;

pub(crate) fn config_error(e: ConfigError) -> Error {
    Error::from_reason(format!("Failed to load config: {e}"))
}

pub(crate) fn load(config_path: &str) -> Result<ReplayConfig> {
    core_config::load_config(config_path).map_err(config_error)
}

/// Request intercepted during replay
#[napi(object)]
#[derive(Clone, Debug)]
pub struct LiveRequest {
    pub url: String,
    /// Defaults to `GET`
    pub method: Option<String>,
    pub body: Option<String>,
}

impl From<LiveRequest> for CoreLiveRequest {
    fn from(r: LiveRequest) -> Self {
        Self {
            url: r.url,
            method: r.method,
            body: r.body,
        }
    }
}

/// Exchange observed while recording
#[napi(object)]
#[derive(Clone, Debug)]
pub struct CapturedExchange {
    pub url: String,
    pub method: String,
    pub request_headers: Option<HashMap<String, String>>,
    pub body: Option<String>,
    pub status: u32,
    pub response_headers: Option<HashMap<String, String>>,
    pub content: Option<String>,
    /// Name of the payload stored under `_files`
    pub file: Option<String>,
}

impl TryFrom<CapturedExchange> for CoreCapturedExchange {
    type Error = Error;

    fn try_from(e: CapturedExchange) -> Result<Self> {
        let status = u16::try_from(e.status)
            .map_err(|_| Error::from_reason(format!("Invalid status code: {}", e.status)))?;
        Ok(Self {
            url: e.url,
            method: e.method,
            request_headers: e.request_headers.unwrap_or_default().into_iter().collect(),
            body: e.body,
            status,
            response_headers: e.response_headers.unwrap_or_default().into_iter().collect(),
            content: e.content,
            file: e.file,
        })
    }
}

/// Load a replay config file (YAML, JSON or JSONC)
///
/// @param path - Path to the config file
/// @returns The config with defaults applied and `mockDir` resolved
#[napi]
pub fn load_config(path: String) -> Result<serde_json::Value> {
    let config = load(&path)?;
    serde_json::to_value(config).map_err(|e| Error::from_reason(e.to_string()))
}
