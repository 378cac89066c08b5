//! Total normalization of heterogeneous raw records.
//!
//! CSV cells, parsed JSON, and API rows all funnel through
//! [`normalize_record`], which coerces every field to its canonical type.
//! The function never fails: malformed input degrades to the field's
//! default, not to an error.

use serde_json::{Map, Value};
use unit_map_unit_models::UnitRecord;
use unit_map_unit_models::coerce;

/// Normalizes one raw record into a canonical [`UnitRecord`].
///
/// Total over any string-keyed map: string fields are trimmed (absent →
/// empty), coordinates become `None` when absent/empty/unparsable, and
/// counters default to 0. The color override stays `None` when absent so
/// "no override" is distinguishable from an explicit empty value.
#[must_use]
pub fn normalize_record(raw: &Map<String, Value>) -> UnitRecord {
    UnitRecord {
        id: coerce::string_field(raw.get("id")),
        name: coerce::string_field(raw.get("name")),
        level: coerce::string_field(raw.get("level")),
        parent: coerce::string_field(raw.get("parent")),
        lat: coerce::coordinate_field(raw.get("lat")),
        lon: coerce::coordinate_field(raw.get("lon")),
        today: coerce::counter_field(raw.get("today")),
        m30: coerce::counter_field(raw.get("m30")),
        ytd: coerce::counter_field(raw.get("ytd")),
        color: coerce::optional_string_field(raw.get("color")),
        inspectors: coerce::string_field(raw.get("inspectors")),
        last_check: coerce::string_field(raw.get("last_check")),
    }
}

/// Normalizes a sequence of raw rows, skipping non-object entries.
///
/// Records arriving without an id get a positional one (1-based row
/// index), so every normalized record has a non-empty identity.
#[must_use]
pub fn normalize_rows(rows: &[Value]) -> Vec<UnitRecord> {
    rows.iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(idx, obj)| {
            let mut record = normalize_record(obj);
            if record.id.is_empty() {
                record.id = (idx + 1).to_string();
            }
            record
        })
        .collect()
}

/// Converts a canonical record back to a raw JSON map, the inverse input
/// shape accepted by [`normalize_record`].
#[must_use]
pub fn record_to_map(record: &UnitRecord) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
