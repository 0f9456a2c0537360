//! NAPI bindings for replay and recording.

mod recorder;
mod session;

pub use recorder::*;
pub use session::*;

use mockreplay_core::types::FixtureSource;

/// `test` or `default`, as reported to JavaScript
pub(crate) fn source_name(source: FixtureSource) -> String {
    match source {
        FixtureSource::Test => "test".to_string(),
        FixtureSource::Default => "default".to_string(),
    }
}
