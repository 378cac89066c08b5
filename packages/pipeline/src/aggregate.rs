//! Summary statistics over the effective dataset.
//!
//! The KPI box and the top-N chart recompute on every pass — nothing
//! here caches across reconciliations.

use std::collections::BTreeMap;

use unit_map_unit_models::UnitRecord;

/// How many leading units the ranking reports by default.
pub const TOP_N: usize = 5;

/// Fixed summary computed once per render pass over the full effective
/// dataset (not the filtered view).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiSummary {
    /// Total number of records.
    pub total: usize,
    /// Record count per non-empty level label.
    pub by_level: BTreeMap<String, usize>,
}

impl KpiSummary {
    /// Renders the level breakdown as "5 РУП, 4 РВП, 13 ВП".
    #[must_use]
    pub fn breakdown(&self) -> String {
        self.by_level
            .iter()
            .map(|(level, count)| format!("{count} {level}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Computes the KPI summary: total record count and a breakdown by level.
/// Records with an empty level count toward the total but not the
/// breakdown.
#[must_use]
pub fn kpi_summary(records: &[UnitRecord]) -> KpiSummary {
    let mut by_level: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        if !record.level.is_empty() {
            *by_level.entry(record.level.clone()).or_insert(0) += 1;
        }
    }
    KpiSummary {
        total: records.len(),
        by_level,
    }
}

/// The leading `n` units by year-to-date count, descending.
///
/// Uses a stable sort with no secondary key, so ties keep their dataset
/// order.
#[must_use]
pub fn top_by_ytd(records: &[UnitRecord], n: usize) -> Vec<UnitRecord> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| b.ytd.cmp(&a.ytd));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, level: &str, ytd: i64) -> UnitRecord {
        let mut rec = UnitRecord::with_id(id);
        rec.level = level.to_string();
        rec.ytd = ytd;
        rec
    }

    #[test]
    fn kpi_counts_total_and_per_level() {
        let data = vec![
            record("1", "РУП", 10),
            record("2", "ВП", 50),
            record("3", "ВП", 0),
            record("4", "", 7),
        ];
        let kpi = kpi_summary(&data);
        assert_eq!(kpi.total, 4);
        assert_eq!(kpi.by_level.get("ВП"), Some(&2));
        assert_eq!(kpi.by_level.get("РУП"), Some(&1));
        assert!(!kpi.by_level.contains_key(""));
        assert_eq!(kpi.breakdown(), "2 ВП, 1 РУП");
    }

    #[test]
    fn top_ranking_is_descending() {
        let data = vec![
            record("1", "РУП", 10),
            record("2", "ВП", 50),
            record("3", "ВП", 30),
        ];
        let top = top_by_ytd(&data, 2);
        let ids: Vec<&str> = top.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["2", "3"]);
    }

    #[test]
    fn ties_keep_dataset_order() {
        let data = vec![
            record("a", "ВП", 5),
            record("b", "ВП", 5),
            record("c", "ВП", 5),
            record("d", "ВП", 9),
        ];
        let top = top_by_ytd(&data, 4);
        let ids: Vec<&str> = top.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["d", "a", "b", "c"]);
    }

    #[test]
    fn short_datasets_rank_fully() {
        let data = vec![record("1", "РУП", 10)];
        assert_eq!(top_by_ytd(&data, TOP_N).len(), 1);
        assert!(top_by_ytd(&[], TOP_N).is_empty());
    }
}
