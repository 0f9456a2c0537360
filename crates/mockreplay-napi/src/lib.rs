//! NAPI-RS bindings for the mockreplay core library.
//!
//! Exposes replay sessions, the recorder and the matching helpers to Node.js.

use napi::bindgen_prelude::*;
use napi_derive::napi;
use tracing_subscriber::EnvFilter;

mod config;
mod matching;
mod mocks;

pub use config::*;
pub use matching::*;
pub use mocks::*;

/// Library version
#[napi]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Print engine logs to stderr
///
/// @param filter - `tracing` filter directive such as `mockreplay_core=debug` (default `info`)
#[napi]
pub fn init_logging(filter: Option<String>) -> Result<()> {
    let filter = EnvFilter::try_new(filter.as_deref().unwrap_or("info"))
        .map_err(|e| Error::from_reason(format!("Invalid log filter: {e}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::from_reason(e.to_string()))
}
