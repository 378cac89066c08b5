//! Filtered views over the effective dataset.
//!
//! All three constraints are conjunctive: exact level, exact parent,
//! substring query over name or id, each case-insensitive. Functions
//! never mutate their input.

use unit_map_unit_models::{FilterState, UnitRecord};

/// Applies the current filter state, returning a new sequence in the
/// input order.
#[must_use]
pub fn filtered_view(records: &[UnitRecord], filter: &FilterState) -> Vec<UnitRecord> {
    let level = filter.level.trim().to_lowercase();
    let parent = filter.parent.trim().to_lowercase();
    let query = filter.query.trim().to_lowercase();

    records
        .iter()
        .filter(|r| level.is_empty() || r.level.to_lowercase() == level)
        .filter(|r| parent.is_empty() || r.parent.to_lowercase() == parent)
        .filter(|r| {
            query.is_empty()
                || r.name.to_lowercase().contains(&query)
                || r.id.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// The record's counter for the selected period — "the metric" used for
/// coloring, sizing, and ranking.
#[must_use]
pub const fn current_metric(record: &UnitRecord, filter: &FilterState) -> i64 {
    record.counter(filter.period)
}

/// Distinct non-empty parent names, optionally restricted to records of
/// one level, in ascending lexical order.
#[must_use]
pub fn unique_parents(records: &[UnitRecord], level_filter: &str) -> Vec<String> {
    let level = level_filter.trim().to_lowercase();
    let mut parents: Vec<String> = records
        .iter()
        .filter(|r| level.is_empty() || r.level.to_lowercase() == level)
        .map(|r| r.parent.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    parents.sort();
    parents.dedup();
    parents
}
