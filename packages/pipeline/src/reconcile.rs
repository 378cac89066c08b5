//! Deterministic merge of raw records with the accumulated edit set.
//!
//! The reconciler is the single writer of the effective dataset: every
//! view (map, KPI, chart, settings table) renders its output and nothing
//! else. It is pure, stable, and idempotent.

use std::collections::BTreeMap;

use serde_json::Value;
use unit_map_unit_models::coerce;
use unit_map_unit_models::{UnitPatch, UnitRecord};

/// Merges raw records with edits into the effective dataset.
///
/// Output order matches input order. Records without a patch pass through
/// unchanged. Patch values that are null or empty-string never clobber
/// the base value, and blank patch coordinates never erase a valid base
/// coordinate. Applying `reconcile` a second time with no edits returns
/// the same dataset.
#[must_use]
pub fn reconcile(
    raw: &[UnitRecord],
    edits: &BTreeMap<String, UnitPatch>,
) -> Vec<UnitRecord> {
    raw.iter()
        .map(|record| {
            edits
                .get(&record.id)
                .map_or_else(|| record.clone(), |patch| apply_patch(record, patch))
        })
        .collect()
}

/// Applies one patch to one record, producing a new record.
#[must_use]
pub fn apply_patch(base: &UnitRecord, patch: &UnitPatch) -> UnitRecord {
    let mut out = base.clone();
    for (key, value) in patch {
        match key.as_str() {
            // Coordinates only override when the patch value is present,
            // non-empty, and parses; a blank edit keeps the base value.
            "lat" => {
                if let Some(v) = coerce::coordinate_field(Some(value)) {
                    out.lat = Some(v);
                }
            }
            "lon" => {
                if let Some(v) = coerce::coordinate_field(Some(value)) {
                    out.lon = Some(v);
                }
            }
            "name" if coerce::is_override(value) => {
                out.name = coerce::string_field(Some(value));
            }
            "level" if coerce::is_override(value) => {
                out.level = coerce::string_field(Some(value));
            }
            "parent" if coerce::is_override(value) => {
                out.parent = coerce::string_field(Some(value));
            }
            "color" if coerce::is_override(value) => {
                out.color = coerce::optional_string_field(Some(value));
            }
            "today" if coerce::is_override(value) => {
                out.today = coerce::counter_field(Some(value));
            }
            "m30" if coerce::is_override(value) => {
                out.m30 = coerce::counter_field(Some(value));
            }
            "ytd" if coerce::is_override(value) => {
                out.ytd = coerce::counter_field(Some(value));
            }
            "inspectors" if coerce::is_override(value) => {
                out.inspectors = coerce::string_field(Some(value));
            }
            "last_check" if coerce::is_override(value) => {
                out.last_check = coerce::string_field(Some(value));
            }
            _ => {}
        }
    }
    out
}

/// The patch fields for one record the settings view still has pending,
/// with no-override values already filtered out.
#[must_use]
pub fn effective_overrides(patch: &UnitPatch) -> UnitPatch {
    patch
        .iter()
        .filter(|(_, v)| coerce::is_override(v))
        .map(|(k, v): (&String, &Value)| (k.clone(), v.clone()))
        .collect()
}
