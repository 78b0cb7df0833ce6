use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeSet;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Offset-less layouts the harness has written; read as UTC.
const NAIVE_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses the run timestamps written into benchmark metadata headers.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Parse a metadata `timestamp` value. Only JSON strings are accepted.
    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        value.as_str().and_then(Self::parse_str)
    }

    /// ISO-8601 with `Z` or a numeric offset, converted to UTC.
    ///
    /// Strings without an offset, and bare dates, are taken as UTC.
    pub fn parse_str(raw: &str) -> Option<DateTime<Utc>> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                NAIVE_LAYOUTS
                    .iter()
                    .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
                    .map(|naive| Utc.from_utc_datetime(&naive))
            })
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| Utc.from_utc_datetime(&naive))
            })
    }
}

// ── FieldExtractor ────────────────────────────────────────────────────────────

/// Lenient typed access to fields of a raw JSON object.
///
/// The benchmark harness is not consistent about types across runtimes: sizes
/// show up as numbers or numeric strings, model codes as either. Every
/// accessor accepts both and maps anything else to `None`.
pub struct FieldExtractor;

impl FieldExtractor {
    /// Number or numeric string → `f64`.
    pub fn f64(data: &Value, key: &str) -> Option<f64> {
        match data.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Non-negative integer, or a number/string that is integral.
    pub fn u64(data: &Value, key: &str) -> Option<u64> {
        match data.get(key)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed.parse::<u64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                        .map(|f| f as u64)
                })
            }
            _ => None,
        }
    }

    /// [`FieldExtractor::u64`] narrowed to `u32`.
    pub fn u32(data: &Value, key: &str) -> Option<u32> {
        Self::u64(data, key).and_then(|v| u32::try_from(v).ok())
    }

    /// String value, or the textual form of a number/bool.
    pub fn string(data: &Value, key: &str) -> Option<String> {
        match data.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// [`FieldExtractor::string`] with a fallback.
    pub fn string_or(data: &Value, key: &str, default: &str) -> String {
        Self::string(data, key).unwrap_or_else(|| default.to_string())
    }

    /// JSON bool, or the strings `"true"`/`"false"` (case-insensitive).
    pub fn bool(data: &Value, key: &str) -> Option<bool> {
        match data.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Array of strings as a set; non-string members are skipped.
    pub fn string_set(data: &Value, key: &str) -> BTreeSet<String> {
        data.get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
