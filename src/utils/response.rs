// src/utils/response.rs

//! JSON API response helpers.
//!
//! Exchange APIs disagree on envelopes, field types and timestamp formats; these
//! helpers read them leniently so one odd field only costs that field.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::error::Result;

/// Space-separated timestamp used by Bithumb.
const SPACED_DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a response body into a JSON tree.
pub fn read_tree(body: &str) -> Result<Value> {
    Ok(serde_json::from_str(body)?)
}

/// Candidate items of a response that is either a bare array or wraps one in `data`.
pub fn extract_array_items(root: &Value) -> &[Value] {
    match root {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    }
}

/// Scalar field rendered as text; `None` when missing, null or structured.
pub fn text_of(item: &Value, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integral field; `None` unless the JSON value is an integer.
pub fn int_of(item: &Value, field: &str) -> Option<i64> {
    item.get(field)?.as_i64()
}

/// String elements of an array field, trimmed, blanks dropped.
pub fn strings_of(item: &Value, field: &str) -> Vec<String> {
    match item.get(field) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse an exchange timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, RFC 3339 with offset (kept as local wall time),
/// and ISO local date-time. Anything else yields `None`.
pub fn parse_exchange_datetime(value: Option<&str>) -> Option<NaiveDateTime> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, SPACED_DATE_TIME) {
        return Some(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    if let Ok(parsed) = value.parse::<NaiveDateTime>() {
        return Some(parsed);
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").ok()
}

/// Parse a `YYYY-MM-DD` date as midnight.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDateTime> {
    let value = value?.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_extract_bare_array() {
        let root = json!([{"id": 1}, {"id": 2}]);
        assert_eq!(extract_array_items(&root).len(), 2);
    }

    #[test]
    fn test_extract_data_envelope() {
        let root = json!({"status": "0000", "data": [{"id": 1}]});
        assert_eq!(extract_array_items(&root).len(), 1);
    }

    #[test]
    fn test_extract_unexpected_shapes() {
        assert!(extract_array_items(&json!({"data": {"id": 1}})).is_empty());
        assert!(extract_array_items(&json!("nope")).is_empty());
        assert!(extract_array_items(&Value::Null).is_empty());
    }

    #[test]
    fn test_text_of_scalars() {
        let item = json!({"id": 42, "title": "점검", "gone": null, "obj": {}});
        assert_eq!(text_of(&item, "id").as_deref(), Some("42"));
        assert_eq!(text_of(&item, "title").as_deref(), Some("점검"));
        assert_eq!(text_of(&item, "gone"), None);
        assert_eq!(text_of(&item, "obj"), None);
        assert_eq!(text_of(&item, "missing"), None);
    }

    #[test]
    fn test_int_of_rejects_strings() {
        let item = json!({"type": 2, "text": "2"});
        assert_eq!(int_of(&item, "type"), Some(2));
        assert_eq!(int_of(&item, "text"), None);
    }

    #[test]
    fn test_strings_of() {
        let item = json!({"categories": [" 안내 ", "", null, "점검"]});
        assert_eq!(strings_of(&item, "categories"), vec!["안내", "점검"]);
        assert!(strings_of(&item, "missing").is_empty());
    }

    #[test]
    fn test_parse_spaced_format() {
        assert_eq!(
            parse_exchange_datetime(Some("2025-02-03 14:05:09")),
            Some(at(2025, 2, 3, 14, 5, 9))
        );
    }

    #[test]
    fn test_parse_offset_keeps_wall_time() {
        assert_eq!(
            parse_exchange_datetime(Some("2025-02-03T14:05:09+09:00")),
            Some(at(2025, 2, 3, 14, 5, 9))
        );
        assert_eq!(
            parse_exchange_datetime(Some("2025-02-03T05:05:09.123Z")).map(|t| t.date()),
            NaiveDate::from_ymd_opt(2025, 2, 3)
        );
    }

    #[test]
    fn test_parse_iso_local() {
        assert_eq!(
            parse_exchange_datetime(Some("2025-02-03T14:05:09")),
            Some(at(2025, 2, 3, 14, 5, 9))
        );
        assert_eq!(
            parse_exchange_datetime(Some("2025-02-03T14:05")),
            Some(at(2025, 2, 3, 14, 5, 0))
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_exchange_datetime(Some("yesterday")), None);
        assert_eq!(parse_exchange_datetime(Some("")), None);
        assert_eq!(parse_exchange_datetime(None), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(Some(" 2025-01-31 ")), Some(at(2025, 1, 31, 0, 0, 0)));
        assert_eq!(parse_date(Some("2025.01.31")), None);
    }
}
