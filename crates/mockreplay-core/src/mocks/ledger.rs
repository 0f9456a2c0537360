//! Served state of fixtures within one replay session.

use crate::types::fixture::{Fixture, FixtureSource};
use std::collections::HashSet;

/// Records which fixtures already answered a request.
///
/// Kept apart from fixture content so the content can be shared read-only
/// while each session tracks its own consumption.
#[derive(Debug, Clone, Default)]
pub struct ServedLedger {
    served: HashSet<(FixtureSource, String)>,
}

impl ServedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_served(&self, source: FixtureSource, id: &str) -> bool {
        self.served.contains(&(source, id.to_string()))
    }

    pub fn mark_served(&mut self, source: FixtureSource, id: &str) {
        self.served.insert((source, id.to_string()));
    }

    /// Forget the served state of the given test fixtures.
    pub fn reset_test<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.served.remove(&(FixtureSource::Test, id.to_string()));
        }
    }

    /// Take over the `served` flags stored in fixture content.
    pub fn seed(&mut self, source: FixtureSource, fixtures: &[Fixture]) {
        for fixture in fixtures.iter().filter(|f| f.served) {
            self.mark_served(source, &fixture.id);
        }
    }

    pub fn served_count(&self, source: FixtureSource) -> usize {
        self.served.iter().filter(|(s, _)| *s == source).count()
    }
}
