//! Configuration loading.
//!
//! - [`ReplayConfig`]: settings for replay and recording
//! - [`parser`]: YAML/JSON/JSONC parsing by file extension

pub mod error;
pub mod parser;
pub mod settings;

pub use error::ConfigError;
pub use settings::{load_config, ReplayConfig};
