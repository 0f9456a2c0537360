//! Character-frequency distance used to rank near-miss fixtures.

use std::collections::HashMap;

/// Sum over all characters of the difference in occurrence counts.
///
/// Order-insensitive and symmetric; not an edit distance.
pub fn char_difference(a: &str, b: &str) -> u64 {
    let mut counts: HashMap<char, i64> = HashMap::new();
    for c in a.chars() {
        *counts.entry(c).or_default() += 1;
    }
    for c in b.chars() {
        *counts.entry(c).or_default() -= 1;
    }
    counts.values().map(|n| n.unsigned_abs()).sum()
}
