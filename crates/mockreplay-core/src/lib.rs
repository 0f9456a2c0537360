//! Core library for the mockreplay record-and-replay tool.
//!
//! - [`types`]: fixtures, live requests and the match mode
//! - [`matching`]: URL normalization, request equality, ranking and duplicate detection
//! - [`mocks`]: fixture selection, replay sessions and the recorder
//! - [`store`]: fixture persistence (filesystem and in-memory)
//! - [`config`]: configuration file loading

pub mod config;
pub mod matching;
pub mod mocks;
pub mod store;
pub mod types;
