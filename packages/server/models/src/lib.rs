#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the unit map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types to allow independent evolution of the API
//! contract.

use serde::{Deserialize, Serialize};
use unit_map_database::UnitRow;

/// A territorial unit as returned by the API.
///
/// Field names match the stored column names so that API payloads feed
/// straight into the dataset normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUnit {
    /// Unique unit ID.
    pub id: i64,
    /// Unit name.
    pub name: String,
    /// Administrative tier label.
    pub level: String,
    /// Containing unit name, empty for top-level units.
    pub parent: String,
    /// Latitude, absent when unknown.
    pub lat: Option<f64>,
    /// Longitude, absent when unknown.
    pub lon: Option<f64>,
    /// Explicit marker color override.
    pub color: Option<String>,
    /// Inspections today.
    pub today: i64,
    /// Inspections in the last 30 days.
    pub m30: i64,
    /// Inspections year-to-date.
    pub ytd: i64,
    /// Free-text inspector names.
    pub inspectors: String,
    /// Date of the last inspection.
    pub last_check: Option<String>,
}

impl From<UnitRow> for ApiUnit {
    fn from(row: UnitRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            level: row.level,
            parent: row.parent,
            lat: row.lat,
            lon: row.lon,
            color: row.color,
            today: row.today,
            m30: row.m30,
            ytd: row.ytd,
            inspectors: row.inspectors,
            last_check: row.last_check,
        }
    }
}

/// Response for a successful create.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateResponse {
    /// ID of the created row.
    pub id: i64,
}

/// Response for an update.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// Number of rows updated (0 or 1).
    pub updated: u64,
}

/// Response for a delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Number of rows deleted (0 or 1).
    pub deleted: u64,
}

/// Request body for the bulk upsert endpoint.
#[derive(Debug, Deserialize)]
pub struct BulkUpsertRequest {
    /// One object per unit; each must carry a usable `id`.
    #[serde(default)]
    pub edits: Vec<serde_json::Value>,
}

/// Response for the bulk upsert endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkUpsertResponse {
    /// Whether the batch was accepted.
    pub ok: bool,
    /// Number of rows inserted or updated.
    pub updated: u64,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Server version string.
    pub version: String,
}
