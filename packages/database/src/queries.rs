//! Query functions for the units table.
//!
//! All statements go through `query_raw_params()` with `$n` positional
//! parameters; writes use `RETURNING id` so the affected-row count is the
//! number of returned rows.

use std::fmt::Write as _;

use moosicbox_json_utils::database::ToValue as _;
use serde_json::{Map, Value};
use switchy_database::{Database, DatabaseValue};
use unit_map_unit_models::{PATCH_FIELDS, coerce};

use crate::{DbError, UnitRow};

/// Lists all units ascending by id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_units(db: &dyn Database) -> Result<Vec<UnitRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, level, parent, lat, lon, color,
                    today, m30, ytd, inspectors, last_check,
                    created_at, updated_at
             FROM units ORDER BY id ASC",
            &[],
        )
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    Ok(rows
        .iter()
        .map(|row| UnitRow {
            id: row.to_value("id").unwrap_or(0),
            name: row.to_value("name").unwrap_or_default(),
            level: row.to_value("level").unwrap_or_default(),
            parent: row.to_value("parent").unwrap_or_default(),
            lat: row.to_value("lat").unwrap_or(None),
            lon: row.to_value("lon").unwrap_or(None),
            color: row.to_value("color").unwrap_or(None),
            today: row.to_value("today").unwrap_or(0),
            m30: row.to_value("m30").unwrap_or(0),
            ytd: row.to_value("ytd").unwrap_or(0),
            inspectors: row.to_value("inspectors").unwrap_or_default(),
            last_check: row.to_value("last_check").unwrap_or(None),
            created_at: row.to_value("created_at").unwrap_or_default(),
            updated_at: row.to_value("updated_at").unwrap_or_default(),
        })
        .collect())
}

/// Inserts one unit from a raw field map and returns its new id. Absent
/// fields take the table defaults.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or no id comes
/// back.
pub async fn insert_unit(db: &dyn Database, fields: &Map<String, Value>) -> Result<i64, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO units (name, level, parent, lat, lon, color,
                                today, m30, ytd, inspectors, last_check,
                                created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                     datetime('now'), datetime('now'))
             RETURNING id",
            &[
                field_value("name", fields.get("name")),
                field_value("level", fields.get("level")),
                field_value("parent", fields.get("parent")),
                field_value("lat", fields.get("lat")),
                field_value("lon", fields.get("lon")),
                field_value("color", fields.get("color")),
                field_value("today", fields.get("today")),
                field_value("m30", fields.get("m30")),
                field_value("ytd", fields.get("ytd")),
                field_value("inspectors", fields.get("inspectors")),
                field_value("last_check", fields.get("last_check")),
            ],
        )
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Insert returned no id".to_string(),
    })?;
    row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse inserted id: {e}"),
    })
}

/// Applies a partial patch to one unit's mutable fields.
///
/// Returns the number of rows updated (0 or 1). An empty patch returns 0
/// without touching the database.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn update_unit(
    db: &dyn Database,
    id: i64,
    patch: &Map<String, Value>,
) -> Result<u64, DbError> {
    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<DatabaseValue> = Vec::new();

    for field in PATCH_FIELDS.iter().copied() {
        if let Some(value) = patch.get(field) {
            sets.push(format!("{field} = ${}", values.len() + 1));
            values.push(field_value(field, Some(value)));
        }
    }

    if sets.is_empty() {
        return Ok(0);
    }

    let mut sql = String::from("UPDATE units SET ");
    sql.push_str(&sets.join(", "));
    let _ = write!(
        sql,
        ", updated_at = datetime('now') WHERE id = ${} RETURNING id",
        values.len() + 1
    );
    values.push(DatabaseValue::Int64(id));

    let rows = db
        .query_raw_params(&sql, &values)
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    Ok(rows.len() as u64)
}

/// Deletes one unit. Returns the number of rows deleted (0 or 1).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_unit(db: &dyn Database, id: i64) -> Result<u64, DbError> {
    let rows = db
        .query_raw_params(
            "DELETE FROM units WHERE id = $1 RETURNING id",
            &[DatabaseValue::Int64(id)],
        )
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    Ok(rows.len() as u64)
}

/// Upserts a batch of edits keyed by id: insert-if-absent, else patch
/// only the supplied fields. Returns the number of entries applied.
///
/// Entries without a usable numeric id are skipped with a warning rather
/// than failing the whole batch.
///
/// # Errors
///
/// Returns [`DbError`] if any database operation fails.
pub async fn bulk_upsert(db: &dyn Database, edits: &[Value]) -> Result<u64, DbError> {
    let mut applied: u64 = 0;

    for entry in edits {
        let Some(fields) = entry.as_object() else {
            log::warn!("Skipping non-object bulk entry: {entry}");
            continue;
        };
        let id_text = coerce::string_field(fields.get("id"));
        let Ok(id) = id_text.parse::<i64>() else {
            log::warn!("Skipping bulk entry with unusable id {id_text:?}");
            continue;
        };

        let mut columns: Vec<&str> = vec!["id"];
        let mut values: Vec<DatabaseValue> = vec![DatabaseValue::Int64(id)];
        let mut updates: Vec<String> = Vec::new();

        for field in PATCH_FIELDS.iter().copied() {
            if let Some(value) = fields.get(field) {
                columns.push(field);
                values.push(field_value(field, Some(value)));
                updates.push(format!("{field} = excluded.{field}"));
            }
        }

        let placeholders: Vec<String> =
            (1..=values.len()).map(|i| format!("${i}")).collect();
        let mut sql = String::from("INSERT INTO units (");
        sql.push_str(&columns.join(", "));
        sql.push_str(", created_at, updated_at) VALUES (");
        sql.push_str(&placeholders.join(", "));
        sql.push_str(", datetime('now'), datetime('now')) ON CONFLICT (id) DO UPDATE SET ");
        if updates.is_empty() {
            sql.push_str("updated_at = datetime('now')");
        } else {
            sql.push_str(&updates.join(", "));
            sql.push_str(", updated_at = datetime('now')");
        }
        sql.push_str(" RETURNING id");

        let rows = db
            .query_raw_params(&sql, &values)
            .await
            .map_err(|e| DbError::Database(e.to_string()))?;
        applied += rows.len() as u64;
    }

    log::info!("Bulk upsert applied {applied} of {} entries", edits.len());
    Ok(applied)
}

/// Converts a raw JSON field value to its column's [`DatabaseValue`],
/// using the same coercion rules as dataset normalization.
fn field_value(field: &str, value: Option<&Value>) -> DatabaseValue {
    match field {
        "lat" | "lon" => coerce::coordinate_field(value)
            .map_or(DatabaseValue::Null, DatabaseValue::Real64),
        "today" | "m30" | "ytd" => DatabaseValue::Int64(coerce::counter_field(value)),
        "color" | "last_check" => coerce::optional_string_field(value)
            .map_or(DatabaseValue::Null, DatabaseValue::String),
        _ => DatabaseValue::String(coerce::string_field(value)),
    }
}
