//! Field coercion rules shared by the normalizer and the reconciler.
//!
//! Raw dataset cells and edit-patch values arrive as arbitrary JSON values
//! (CSV cells are strings, API rows mix numbers and nulls). These helpers
//! are total: any input maps to a well-typed field value, never an error.

use serde_json::Value;

/// Coerces a raw value to a trimmed string. Absent, null, and non-scalar
/// values become the empty string; numbers keep their decimal form.
#[must_use]
pub fn string_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Coerces a raw value to an optional trimmed string, preserving the
/// distinction between "absent/empty" (`None`) and a real value. Used for
/// the color override field.
#[must_use]
pub fn optional_string_field(value: Option<&Value>) -> Option<String> {
    let s = string_field(value);
    if s.is_empty() { None } else { Some(s) }
}

/// Coerces a raw value to a coordinate. Absent, null, empty, and
/// unparsable input yields `None` — never a silent 0. Decimal commas are
/// accepted since regional exports use them.
#[must_use]
pub fn coordinate_field(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.replace(',', ".").parse::<f64>().ok()
        }
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Coerces a raw value to a period counter. Absent, null, and unparsable
/// input yields 0; floats truncate; negatives clamp to 0.
#[must_use]
pub fn counter_field(value: Option<&Value>) -> i64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        #[allow(clippy::cast_possible_truncation)]
        Some(v) if v.is_finite() && v > 0.0 => v as i64,
        _ => 0,
    }
}

/// Whether a patch value actually overrides the base field. Null and
/// empty-string patch entries are "no override".
#[must_use]
pub fn is_override(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_field_trims_and_defaults() {
        assert_eq!(string_field(Some(&json!("  Харків  "))), "Харків");
        assert_eq!(string_field(Some(&json!(null))), "");
        assert_eq!(string_field(None), "");
        assert_eq!(string_field(Some(&json!(42))), "42");
    }

    #[test]
    fn optional_string_distinguishes_absent_from_value() {
        assert_eq!(optional_string_field(None), None);
        assert_eq!(optional_string_field(Some(&json!(""))), None);
        assert_eq!(
            optional_string_field(Some(&json!("#e31a1c"))),
            Some("#e31a1c".to_string())
        );
    }

    #[test]
    fn coordinate_rejects_empty_and_garbage() {
        assert_eq!(coordinate_field(None), None);
        assert_eq!(coordinate_field(Some(&json!(""))), None);
        assert_eq!(coordinate_field(Some(&json!("abc"))), None);
        assert_eq!(coordinate_field(Some(&json!(null))), None);
        assert_eq!(coordinate_field(Some(&json!("49.9935"))), Some(49.9935));
        assert_eq!(coordinate_field(Some(&json!(36.2304))), Some(36.2304));
    }

    #[test]
    fn coordinate_accepts_decimal_comma() {
        assert_eq!(coordinate_field(Some(&json!("49,9935"))), Some(49.9935));
    }

    #[test]
    fn counter_defaults_and_clamps() {
        assert_eq!(counter_field(None), 0);
        assert_eq!(counter_field(Some(&json!(null))), 0);
        assert_eq!(counter_field(Some(&json!("not a number"))), 0);
        assert_eq!(counter_field(Some(&json!(-5))), 0);
        assert_eq!(counter_field(Some(&json!(7))), 7);
        assert_eq!(counter_field(Some(&json!("12"))), 12);
        assert_eq!(counter_field(Some(&json!(3.9))), 3);
    }

    #[test]
    fn override_detection() {
        assert!(!is_override(&json!(null)));
        assert!(!is_override(&json!("")));
        assert!(is_override(&json!("x")));
        assert!(is_override(&json!(0)));
    }
}
