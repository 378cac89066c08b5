//! CSV and JSON dataset codecs.
//!
//! Parsing is tolerant: trimmed headers and cells, ragged rows padded
//! with empty strings. Export uses the canonical column order with RFC
//! quoting (values containing comma/quote/newline are quote-wrapped with
//! doubled internal quotes).

use serde_json::{Map, Value};
use unit_map_unit_models::UnitRecord;

use crate::SourceError;
use crate::normalize::normalize_rows;

/// Dataset input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// JSON array of objects.
    Json,
    /// Comma-separated values with a header row.
    Csv,
}

/// Canonical export column order.
const EXPORT_COLUMNS: &[&str] = &[
    "id",
    "name",
    "level",
    "parent",
    "lat",
    "lon",
    "today",
    "m30",
    "ytd",
    "color",
    "inspectors",
    "last_check",
];

/// Parses CSV text into raw string maps, one per data row.
///
/// The first line is the header; headers and cells are trimmed. Rows with
/// fewer cells than headers are padded with empty strings. Empty input
/// yields an empty vec.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] if a row is malformed beyond what the
/// flexible reader tolerates (e.g. an unterminated quote).
pub fn parse_csv(text: &str) -> Result<Vec<Value>, SourceError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut rows: Vec<Value> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut map = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let cell = record.get(i).unwrap_or("").trim().to_owned();
            map.insert(header.clone(), Value::String(cell));
        }
        rows.push(Value::Object(map));
    }

    log::debug!("Parsed {} rows from CSV input", rows.len());
    Ok(rows)
}

/// Parses dataset text in the given format and normalizes it into
/// canonical records.
///
/// # Errors
///
/// Returns [`SourceError::ParseFailure`] when JSON input is not an array
/// of objects, or the underlying codec error for malformed payloads. No
/// partial dataset is returned on failure.
pub fn parse_dataset(text: &str, format: DatasetFormat) -> Result<Vec<UnitRecord>, SourceError> {
    let rows = match format {
        DatasetFormat::Json => {
            let value: Value =
                serde_json::from_str(text).map_err(|e| SourceError::ParseFailure {
                    message: format!("invalid JSON dataset: {e}"),
                })?;
            match value {
                Value::Array(rows) => rows,
                other => {
                    return Err(SourceError::ParseFailure {
                        message: format!(
                            "expected a JSON array of objects, got {}",
                            json_type_name(&other)
                        ),
                    });
                }
            }
        }
        DatasetFormat::Csv => parse_csv(text)?,
    };
    Ok(normalize_rows(&rows))
}

/// Serializes records as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`SourceError::Json`] if serialization fails.
pub fn to_json_pretty(records: &[UnitRecord]) -> Result<String, SourceError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Serializes records as CSV with the canonical header row.
///
/// Absent coordinates and color overrides export as empty cells, so a
/// round-trip through [`parse_dataset`] reproduces the same records.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] if writing fails.
pub fn to_csv(records: &[UnitRecord]) -> Result<String, SourceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_COLUMNS)?;

    for rec in records {
        writer.write_record(&[
            rec.id.clone(),
            rec.name.clone(),
            rec.level.clone(),
            rec.parent.clone(),
            rec.lat.map(|v| v.to_string()).unwrap_or_default(),
            rec.lon.map(|v| v.to_string()).unwrap_or_default(),
            rec.today.to_string(),
            rec.m30.to_string(),
            rec.ytd.to_string(),
            rec.color.clone().unwrap_or_default(),
            rec.inspectors.clone(),
            rec.last_check.clone(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SourceError::ParseFailure {
            message: format!("CSV writer flush failed: {e}"),
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_cells_with_embedded_commas() {
        let rows = parse_csv("id,name\n1,\"Відділ, головний\"\n2,\"Він сказав \"\"так\"\"\"\n")
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Відділ, головний");
        assert_eq!(rows[1]["name"], "Він сказав \"так\"");
    }

    #[test]
    fn pads_ragged_rows() {
        let rows = parse_csv("id,name,level\n1,A\n").unwrap();
        assert_eq!(rows[0]["name"], "A");
        assert_eq!(rows[0]["level"], "");
    }

    #[test]
    fn empty_input_is_empty_dataset() {
        assert!(parse_csv("").unwrap().is_empty());
        assert!(parse_csv("  \n").unwrap().is_empty());
    }

    #[test]
    fn parse_dataset_rejects_non_array_json() {
        let err = parse_dataset(r#"{"id": 1}"#, DatasetFormat::Json).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("accepted formats"), "{msg}");
        assert!(msg.contains("an object"), "{msg}");
    }

    #[test]
    fn parse_dataset_normalizes_csv_rows() {
        let recs = parse_dataset(
            "id,name,level,today,ytd\n1,A,РУП,5,10\n2,B,ВП,0,50\n",
            DatasetFormat::Csv,
        )
        .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].today, 5);
        assert_eq!(recs[1].ytd, 50);
    }

    #[test]
    fn csv_export_round_trips() {
        let mut rec = UnitRecord::with_id("1");
        rec.name = "Відділ, \"головний\"".to_string();
        rec.level = "ВП".to_string();
        rec.lat = Some(49.5);
        rec.ytd = 12;

        let csv_text = to_csv(std::slice::from_ref(&rec)).unwrap();
        let back = parse_dataset(&csv_text, DatasetFormat::Csv).unwrap();
        assert_eq!(back, vec![rec]);
    }

    #[test]
    fn json_export_is_pretty_array() {
        let recs = vec![UnitRecord::with_id("7")];
        let json = to_json_pretty(&recs).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\n  "));
        let back: Vec<UnitRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recs);
    }
}
