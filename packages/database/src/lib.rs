#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `SQLite` storage for the units table.
//!
//! Uses `switchy_database` for all database operations. The schema is
//! bootstrapped with `CREATE TABLE IF NOT EXISTS` on open, matching the
//! single-table layout the API serves.

pub mod queries;

use std::path::Path;

use serde::Serialize;
use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;

/// Default path for the units database.
pub const DEFAULT_DB_PATH: &str = "data/units.db";

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// One row of the units table as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitRow {
    /// Primary key.
    pub id: i64,
    /// Unit name.
    pub name: String,
    /// Administrative tier label.
    pub level: String,
    /// Containing unit name, empty for top-level units.
    pub parent: String,
    /// Latitude, nullable.
    pub lat: Option<f64>,
    /// Longitude, nullable.
    pub lon: Option<f64>,
    /// Explicit marker color override, nullable.
    pub color: Option<String>,
    /// Inspections today.
    pub today: i64,
    /// Inspections in the last 30 days.
    pub m30: i64,
    /// Inspections year-to-date.
    pub ytd: i64,
    /// Free-text inspector names.
    pub inspectors: String,
    /// Date of the last inspection, nullable.
    pub last_check: Option<String>,
    /// Row creation timestamp.
    pub created_at: String,
    /// Last modification timestamp.
    pub updated_at: String,
}

/// Opens (or creates) the units `SQLite` database and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened or schema
/// creation fails.
pub async fn open_db(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Database(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    Ok(db)
}

/// Creates the units table if it doesn't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS units (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL DEFAULT '',
            level       TEXT NOT NULL DEFAULT '',
            parent      TEXT NOT NULL DEFAULT '',
            lat         REAL,
            lon         REAL,
            color       TEXT,
            today       INTEGER NOT NULL DEFAULT 0,
            m30         INTEGER NOT NULL DEFAULT 0,
            ytd         INTEGER NOT NULL DEFAULT 0,
            inspectors  TEXT NOT NULL DEFAULT '',
            last_check  TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )",
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    log::debug!("Units schema ensured");
    Ok(())
}
