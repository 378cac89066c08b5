#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Canonical data model for the unit map.
//!
//! This crate defines the shared shape of a territorial unit record, the
//! partial edit patches users accumulate against it, and the filter/settings
//! state that drives the dashboard pipeline. Every other crate in the
//! workspace normalizes into or consumes these types.

pub mod coerce;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One territorial subdivision with identity, location, and period counters.
///
/// Field names match the wire format produced by the API and accepted in
/// CSV/JSON dataset uploads. After normalization every field holds its
/// canonical type: strings are trimmed, counters are non-negative, and
/// missing or unparsable coordinates are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Stable identity, unique within a dataset. Non-empty after
    /// normalization.
    pub id: String,
    /// Human-readable unit name.
    #[serde(default)]
    pub name: String,
    /// Administrative tier label (e.g. "РУП", "ВП").
    #[serde(default)]
    pub level: String,
    /// Name of the containing unit, empty for top-level units.
    #[serde(default)]
    pub parent: String,
    /// Latitude (WGS84). `None` when the source has no usable coordinate.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude (WGS84). `None` when the source has no usable coordinate.
    #[serde(default)]
    pub lon: Option<f64>,
    /// Inspections today.
    #[serde(default)]
    pub today: i64,
    /// Inspections in the last 30 days.
    #[serde(default)]
    pub m30: i64,
    /// Inspections year-to-date.
    #[serde(default)]
    pub ytd: i64,
    /// Explicit marker color override. `None` means "derive from the
    /// current metric" — distinct from an empty string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Free-text inspector names.
    #[serde(default)]
    pub inspectors: String,
    /// Date of the last inspection as entered, possibly unparsable.
    #[serde(default)]
    pub last_check: String,
}

impl UnitRecord {
    /// Creates an empty record with the given id. All other fields take
    /// their normalized defaults.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            level: String::new(),
            parent: String::new(),
            lat: None,
            lon: None,
            today: 0,
            m30: 0,
            ytd: 0,
            color: None,
            inspectors: String::new(),
            last_check: String::new(),
        }
    }

    /// Returns the counter value for the given period.
    #[must_use]
    pub const fn counter(&self, period: Period) -> i64 {
        match period {
            Period::Today => self.today,
            Period::M30 => self.m30,
            Period::Ytd => self.ytd,
        }
    }

    /// Returns `Some((lat, lon))` when both coordinates are present and
    /// finite.
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        let lat = self.lat.filter(|v| v.is_finite())?;
        let lon = self.lon.filter(|v| v.is_finite())?;
        Some((lat, lon))
    }
}

/// A user-authored partial override for one [`UnitRecord`], keyed by field
/// name. Null or empty-string values mean "no override" and never clobber
/// the base value.
pub type UnitPatch = BTreeMap<String, serde_json::Value>;

/// The mutable fields a patch may override, in canonical column order.
pub const PATCH_FIELDS: &[&str] = &[
    "name",
    "level",
    "parent",
    "lat",
    "lon",
    "color",
    "today",
    "m30",
    "ytd",
    "inspectors",
    "last_check",
];

/// The period counter selected as "the metric" for coloring, sizing, and
/// ranking.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Period {
    /// Inspections today.
    #[default]
    Today,
    /// Inspections in the last 30 days.
    M30,
    /// Inspections year-to-date.
    Ytd,
}

/// Provenance of the currently active raw dataset.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceType {
    /// Bundled demo CSV.
    #[default]
    Demo,
    /// Remote URL (CSV or JSON). The only type eligible for auto-refresh.
    Url,
    /// Locally uploaded file.
    File,
    /// The unit-map REST API.
    Api,
}

/// Provenance tag plus URL for the active raw dataset. Persisted across
/// sessions as part of [`Settings`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// What kind of source produced the dataset.
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Source URL. Empty for demo/file/api sources.
    #[serde(default)]
    pub url: String,
}

impl DataSource {
    /// A demo-dataset descriptor.
    #[must_use]
    pub fn demo() -> Self {
        Self::default()
    }

    /// A URL-dataset descriptor.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::Url,
            url: url.into(),
        }
    }
}

/// Session filter state. Empty strings mean "no constraint".
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Selected period counter; defaults to [`Period::Today`].
    #[serde(default)]
    pub period: Period,
    /// Exact (case-insensitive) level filter.
    #[serde(default)]
    pub level: String,
    /// Exact (case-insensitive) parent filter.
    #[serde(default)]
    pub parent: String,
    /// Substring (case-insensitive) search over name or id.
    #[serde(default)]
    pub query: String,
}

/// The durable settings blob: accumulated edits, UI theme, active data
/// source, and the auto-refresh interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Partial overrides keyed by record id.
    #[serde(default)]
    pub edits: BTreeMap<String, UnitPatch>,
    /// UI theme, "dark" or "light".
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Active dataset descriptor.
    #[serde(default)]
    pub data_source: DataSource,
    /// Auto-refresh interval in minutes; 0 disables refresh.
    #[serde(default)]
    pub refresh_minutes: u64,
}

fn default_theme() -> String {
    "dark".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            edits: BTreeMap::new(),
            theme: default_theme(),
            data_source: DataSource::default(),
            refresh_minutes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_round_trips_through_strings() {
        for (period, s) in [
            (Period::Today, "today"),
            (Period::M30, "m30"),
            (Period::Ytd, "ytd"),
        ] {
            assert_eq!(period.to_string(), s);
            assert_eq!(s.parse::<Period>().unwrap(), period);
        }
    }

    #[test]
    fn data_source_serializes_type_key() {
        let ds = DataSource::url("https://example.com/units.csv");
        let json = serde_json::to_value(&ds).unwrap();
        assert_eq!(json["type"], "url");
        assert_eq!(json["url"], "https://example.com/units.csv");
    }

    #[test]
    fn settings_default_matches_boot_state() {
        let s = Settings::default();
        assert!(s.edits.is_empty());
        assert_eq!(s.theme, "dark");
        assert_eq!(s.data_source.source_type, SourceType::Demo);
        assert_eq!(s.refresh_minutes, 0);
    }

    #[test]
    fn settings_blob_round_trips() {
        let mut s = Settings::default();
        let mut patch = UnitPatch::new();
        patch.insert("today".to_string(), serde_json::json!(7));
        s.edits.insert("1".to_string(), patch);
        s.refresh_minutes = 5;
        s.data_source = DataSource::url("https://example.com/u.json");

        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("refreshMinutes"));
        assert!(json.contains("dataSource"));
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn missing_record_fields_deserialize_to_defaults() {
        let rec: UnitRecord = serde_json::from_str(r#"{"id":"5"}"#).unwrap();
        assert_eq!(rec.id, "5");
        assert_eq!(rec.today, 0);
        assert!(rec.lat.is_none());
        assert!(rec.color.is_none());
    }

    #[test]
    fn position_requires_both_finite_coordinates() {
        let mut rec = UnitRecord::with_id("1");
        assert!(rec.position().is_none());
        rec.lat = Some(49.99);
        assert!(rec.position().is_none());
        rec.lon = Some(36.23);
        assert_eq!(rec.position(), Some((49.99, 36.23)));
        rec.lon = Some(f64::NAN);
        assert!(rec.position().is_none());
    }
}
