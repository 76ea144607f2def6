//! Extraction of numeric samples from raw rocm-smi field values.
//!
//! Depending on the tool version a field arrives as a JSON number or as
//! text with units baked in ("45.0C", "900 (mV)"), and readings the
//! hardware does not expose come through as the string "N/A".

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("number pattern is valid"));

/// Whether a raw field value is the "not available" sentinel.
///
/// JSON null and the string "N/A" (any case, surrounding whitespace
/// ignored) both count. Numbers are never N/A.
pub fn is_na(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().eq_ignore_ascii_case("n/a"),
        _ => false,
    }
}

/// Extract a numeric sample from a raw field value and apply a unit scale.
///
/// Numbers pass through scaled; text yields the first embedded signed
/// decimal, which tolerates trailing units or annotations. Absent values,
/// the N/A sentinel and text without a number all yield `None`; missing
/// data is never an error and never a zero.
pub fn normalize(value: Option<&Value>, scale: f64) -> Option<f64> {
    let value = value?;
    if is_na(value) {
        return None;
    }
    match value {
        Value::Number(n) => n.as_f64().map(|v| v * scale),
        Value::String(s) => NUMBER_RE
            .find(s)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(|v| v * scale),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_na_sentinel_any_case() {
        assert!(is_na(&json!("N/A")));
        assert!(is_na(&json!("n/a")));
        assert!(is_na(&json!("  N/a\t")));
        assert!(is_na(&Value::Null));
        assert!(!is_na(&json!("available")));
        assert!(!is_na(&json!(0)));
    }

    #[test]
    fn test_na_yields_no_value() {
        assert_eq!(normalize(Some(&json!("N/A")), 1.0), None);
        assert_eq!(normalize(Some(&json!(" n/a ")), 0.1), None);
        assert_eq!(normalize(Some(&Value::Null), 1.0), None);
        assert_eq!(normalize(None, 1.0), None);
    }

    #[test]
    fn test_numeric_passthrough_with_scale() {
        assert_eq!(normalize(Some(&json!(160)), 0.1), Some(16.0));
        assert_eq!(normalize(Some(&json!(37.5)), 1.0), Some(37.5));
        assert_eq!(normalize(Some(&json!(-3)), 2.0), Some(-6.0));
        assert_eq!(normalize(Some(&json!(0)), 1.0), Some(0.0));
    }

    #[test]
    fn test_number_embedded_in_units() {
        assert_eq!(normalize(Some(&json!("45.0C")), 1.0), Some(45.0));
        assert_eq!(normalize(Some(&json!("1411 (MHz)")), 1.0), Some(1411.0));
        assert_eq!(normalize(Some(&json!("-12.5 W")), 1.0), Some(-12.5));
        assert_eq!(normalize(Some(&json!("+8.0")), 1.0), Some(8.0));
        assert_eq!(normalize(Some(&json!("37.5%")), 1.0), Some(37.5));
    }

    #[test]
    fn test_unparsable_text_yields_no_value() {
        assert_eq!(normalize(Some(&json!("no reading")), 1.0), None);
        assert_eq!(normalize(Some(&json!("")), 1.0), None);
    }

    #[test]
    fn test_non_scalar_shapes_yield_no_value() {
        assert_eq!(normalize(Some(&json!(true)), 1.0), None);
        assert_eq!(normalize(Some(&json!(["1"])), 1.0), None);
        assert_eq!(normalize(Some(&json!({"v": 1})), 1.0), None);
    }
}
