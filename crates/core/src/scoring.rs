//! Scoring primitives shared by the scoring service.
//!
//! A question is correct only when the selected options are exactly the
//! correct options. There is no partial credit.

use std::collections::HashSet;
use std::hash::Hash;

use crate::model::OptionId;

/// Exact-match rule: the selected set equals the correct set.
///
/// Both sides are treated as sets, so duplicated selections do not matter.
#[must_use]
pub fn is_exact_match(selected: &[OptionId], correct: &[OptionId]) -> bool {
    normalize(selected) == normalize(correct)
}

fn normalize(ids: &[OptionId]) -> Vec<OptionId> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Percentage of correct questions, formatted with two decimals.
///
/// Returns `"0.00"` when there are no questions.
#[must_use]
pub fn format_score_percent(correct: u32, total: u32) -> String {
    if total == 0 {
        return "0.00".to_owned();
    }
    let pct = f64::from(correct) / f64::from(total) * 100.0;
    format!("{pct:.2}")
}

/// Removes duplicates while keeping the first occurrence of each item in place.
#[must_use]
pub fn dedup_first_seen<T: Copy + Eq + Hash>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(*item)).collect()
}
