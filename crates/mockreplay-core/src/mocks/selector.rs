//! Fixture selection for a live request.
//!
//! Selection is a pure function of the fixture lists, the served ledger and
//! the request. Marking the chosen fixture as served is up to the caller.

use crate::matching::{fixture_matches_request, rank, try_normalize_url, MatchError};
use crate::mocks::ledger::ServedLedger;
use crate::types::fixture::{Fixture, FixtureSource};
use crate::types::mode::MatchMode;
use crate::types::request::LiveRequest;

/// How a fixture was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Exact match among the test fixtures
    Exact,
    /// Exact match among the default fixtures
    DefaultExact,
    /// Closest fixture by rank (loose mode only)
    Ranked(u64),
}

/// A chosen fixture, addressed by collection and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub source: FixtureSource,
    pub index: usize,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Found(Choice),
    NotFound,
    /// The live request URL cannot be parsed
    Malformed(String),
}

/// Pick the fixture answering `live`.
///
/// 1. Exact matches among test fixtures whose dependencies are satisfied;
///    the first unserved one wins, otherwise the last one is served again.
/// 2. The first exact match among default fixtures.
/// 3. In loose mode, the lowest rank over test then default fixtures.
pub fn select_fixture(
    test: &[Fixture],
    defaults: &[Fixture],
    ledger: &ServedLedger,
    live: &LiveRequest,
    mode: MatchMode,
) -> Selection {
    if let Err(e) = try_normalize_url(&live.url, &[]) {
        tracing::debug!(url = %live.url, "cannot select a fixture: {}", e);
        return Selection::Malformed(e.to_string());
    }

    if let Some(index) = select_test_exact(test, ledger, live) {
        return Selection::Found(Choice {
            source: FixtureSource::Test,
            index,
            strategy: Strategy::Exact,
        });
    }

    if let Some(index) = defaults.iter().position(|f| matches(f, live)) {
        return Selection::Found(Choice {
            source: FixtureSource::Default,
            index,
            strategy: Strategy::DefaultExact,
        });
    }

    if mode == MatchMode::Loose {
        if let Some(choice) = select_ranked(test, defaults, live) {
            return Selection::Found(choice);
        }
    }

    Selection::NotFound
}

fn matches(fixture: &Fixture, live: &LiveRequest) -> bool {
    fixture_matches_request(fixture, live).unwrap_or_else(|e| {
        skip_fixture(fixture, &e);
        false
    })
}

fn skip_fixture(fixture: &Fixture, error: &MatchError) {
    tracing::debug!(fixture_id = %fixture.id, "fixture not comparable: {}", error);
}

/// `waitFor` ids that are not in the collection do not block.
fn dependencies_served(fixture: &Fixture, test: &[Fixture], ledger: &ServedLedger) -> bool {
    let Some(wait_for) = &fixture.wait_for else {
        return true;
    };
    wait_for.iter().all(|id| {
        !test.iter().any(|f| &f.id == id) || ledger.is_served(FixtureSource::Test, id)
    })
}

fn select_test_exact(test: &[Fixture], ledger: &ServedLedger, live: &LiveRequest) -> Option<usize> {
    let mut last_served = false;
    let mut candidates = Vec::new();

    for (index, fixture) in test.iter().enumerate() {
        if fixture.wait_for_previous && !last_served {
            continue;
        }
        if !dependencies_served(fixture, test, ledger) {
            continue;
        }
        last_served = ledger.is_served(FixtureSource::Test, &fixture.id);
        if matches(fixture, live) {
            candidates.push(index);
        }
    }

    candidates
        .iter()
        .copied()
        .find(|&index| !ledger.is_served(FixtureSource::Test, &test[index].id))
        .or_else(|| candidates.last().copied())
}

fn select_ranked(test: &[Fixture], defaults: &[Fixture], live: &LiveRequest) -> Option<Choice> {
    let collections = [(FixtureSource::Test, test), (FixtureSource::Default, defaults)];
    let mut ranked: Vec<Choice> = Vec::new();

    for (source, fixtures) in collections {
        for (index, fixture) in fixtures.iter().enumerate() {
            match rank(fixture, live) {
                Ok(Some(score)) => ranked.push(Choice {
                    source,
                    index,
                    strategy: Strategy::Ranked(score),
                }),
                Ok(None) => {}
                Err(e) => skip_fixture(fixture, &e),
            }
        }
    }

    // stable: equal ranks keep scan order
    ranked.sort_by_key(|choice| match choice.strategy {
        Strategy::Ranked(score) => score,
        _ => u64::MAX,
    });
    ranked.into_iter().next()
}
