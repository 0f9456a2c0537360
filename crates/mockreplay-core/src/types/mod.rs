//! Core domain types for fixtures, live requests and matching modes.

pub mod fixture;
pub mod mode;
pub mod request;

pub use fixture::{Fixture, FixtureRequest, FixtureResponse, FixtureSource, QueryParam};
pub use mode::MatchMode;
pub use request::LiveRequest;
