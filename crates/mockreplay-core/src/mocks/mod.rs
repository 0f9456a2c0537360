//! Fixture selection, replay and recording.
//!
//! - [`ServedLedger`]: which fixtures already answered a request
//! - [`select_fixture`]: picks the fixture for a live request
//! - [`ReplaySession`]: one test run, persisting served flags through a store
//! - [`Recorder`]: turns captured exchanges into stored fixtures

pub mod ledger;
pub mod recorder;
pub mod selector;
pub mod session;

pub use ledger::ServedLedger;
pub use recorder::{
    content_type_for, file_extension_for, CapturedExchange, RecordOptions, RecordOutcome,
    Recorder,
};
pub use selector::{select_fixture, Choice, Selection, Strategy};
pub use session::{MatchOutcome, ReplaySession, ServedFixture};
