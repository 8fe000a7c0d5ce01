//! Field extraction helpers shared by the normalizers.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Flattens nested objects into dotted keys, e.g. `{"station": {"nom": ..}}`
/// becomes `station.nom`. Arrays and scalars are kept as leaf values.
pub fn flatten_record(record: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    if let Value::Object(obj) = record {
        flatten_into(&mut out, None, obj);
    }
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, obj: &Map<String, Value>) {
    for (key, value) in obj {
        let name = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(out, Some(&name), inner),
            _ => {
                out.insert(name, value.clone());
            }
        }
    }
}

/// Numeric coercion: numbers and numeric strings pass, anything else is missing.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Text rendering of a scalar field. Null becomes an empty string.
pub fn text_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a timestamp into its local calendar date.
///
/// Offset-bearing timestamps keep their own local date; the offset is not
/// converted to UTC first.
pub fn parse_local_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    leading_date(raw)
}

/// The `YYYY-MM-DD` prefix of a timestamp whose time part is in a shape the
/// formats above do not cover (`+0200`, `+02`, hour only, ...).
fn leading_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.get(..10)?;
    match raw[10..].chars().next() {
        None | Some('T') | Some(' ') => NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_flatten_nested_objects() {
        let flat = flatten_record(&json!({
            "valeur": 12.5,
            "station": { "nom": "Bouteillerie", "geo": { "lat": 47.2 } },
            "tags": ["a", "b"],
            "empty": {}
        }));

        assert_eq!(flat["valeur"], json!(12.5));
        assert_eq!(flat["station.nom"], json!("Bouteillerie"));
        assert_eq!(flat["station.geo.lat"], json!(47.2));
        assert_eq!(flat["tags"], json!(["a", "b"]));
        assert_eq!(flat["empty"], json!({}));
    }

    #[test]
    fn test_flatten_non_object_is_empty() {
        assert!(flatten_record(&json!([1, 2])).is_empty());
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(42)), Some(42.0));
        assert_eq!(coerce_number(&json!(" 17.5 ")), Some(17.5));
        assert_eq!(coerce_number(&json!("n/a")), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_text_value() {
        assert_eq!(text_value(&json!("Nantes")), "Nantes");
        assert_eq!(text_value(&json!(null)), "");
        assert_eq!(text_value(&json!(3)), "3");
    }

    #[test]
    fn test_parse_local_date_formats() {
        assert_eq!(parse_local_date("2024-05-01T23:00:00+02:00"), Some(date(2024, 5, 1)));
        assert_eq!(parse_local_date("2024-05-01T00:00:00Z"), Some(date(2024, 5, 1)));
        assert_eq!(parse_local_date("2024-05-01 08:00:00"), Some(date(2024, 5, 1)));
        assert_eq!(parse_local_date("2024-05-01T08:00:00.000"), Some(date(2024, 5, 1)));
        assert_eq!(parse_local_date("2024-05-01"), Some(date(2024, 5, 1)));
    }

    #[test]
    fn test_parse_local_date_keeps_leading_date_of_other_shapes() {
        assert_eq!(parse_local_date("2024-05-01T01:00:00+0200"), Some(date(2024, 5, 1)));
        assert_eq!(parse_local_date("2024-05-01 01:00:00+02"), Some(date(2024, 5, 1)));
        assert_eq!(parse_local_date("2024-05-01T01"), Some(date(2024, 5, 1)));
        assert_eq!(parse_local_date("2024-05-01 01:00:00+02:00"), Some(date(2024, 5, 1)));
    }

    #[test]
    fn test_parse_local_date_rejects_garbage() {
        assert_eq!(parse_local_date("yesterday"), None);
        assert_eq!(parse_local_date(""), None);
        assert_eq!(parse_local_date("2024-13-01"), None);
        assert_eq!(parse_local_date("2024-05-01x"), None);
        assert_eq!(parse_local_date("2024-13-01T00:00:00+0200"), None);
    }
}
