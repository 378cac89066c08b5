#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dataset sources, normalization, and CSV/JSON codecs.
//!
//! Raw unit records arrive from four kinds of sources — the bundled demo
//! CSV, a local file, a remote URL, or the unit-map REST API. Each source
//! implements the [`DatasetSource`] trait and produces canonical
//! [`UnitRecord`]s via the total normalization in [`normalize`].

pub mod codec;
pub mod fetch;
pub mod normalize;

use async_trait::async_trait;
use unit_map_unit_models::{DataSource, UnitRecord};

/// Errors that can occur while fetching or decoding a dataset.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (the source is unavailable).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload is not in an accepted dataset format.
    #[error("{message}; accepted formats are CSV (comma-separated, header row) and JSON (array of objects)")]
    ParseFailure {
        /// Description of what went wrong.
        message: String,
    },
}

impl SourceError {
    /// Whether this error means the source itself was unreachable, as
    /// opposed to reachable but malformed. Unreachable sources are
    /// recovered by falling back to the demo dataset.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Io(_))
    }
}

/// A provider of raw unit records.
///
/// Each source knows its own provenance descriptor and how to fetch and
/// normalize its payload into canonical records.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Returns the provenance descriptor for this source.
    fn describe(&self) -> DataSource;

    /// Fetches and normalizes the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch or decode fails. No partial
    /// dataset is ever returned.
    async fn fetch(&self) -> Result<Vec<UnitRecord>, SourceError>;
}
