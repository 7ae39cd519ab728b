//! Conversion of typed-in answers to JSON values, driven by a column's
//! declared type.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use jsondb_core::types::ColumnType;
use serde_json::{Number, Value};

/// Largest integer a double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Convert raw console input to the value stored for a column of `column_type`.
pub fn coerce(column_type: &ColumnType, input: &str) -> Value {
    match column_type {
        ColumnType::Number => number_value(parse_float_prefix(input)),
        ColumnType::Boolean => Value::Bool(input.to_lowercase() == "true"),
        ColumnType::Array => match serde_json::from_str::<Value>(input) {
            Ok(array @ Value::Array(_)) => array,
            _ => Value::Array(
                input
                    .split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .collect(),
            ),
        },
        ColumnType::Date => match parse_date(input) {
            Some(dt) => Value::String(format_timestamp(&dt)),
            None => Value::String(input.to_string()),
        },
        ColumnType::Null if input == "null" => Value::Null,
        _ => Value::String(input.to_string()),
    }
}

/// Parse the longest numeric prefix of `input`, skipping leading whitespace.
///
/// `"42px"` is 42, `"3.5e2kg"` is 350, and input with no numeric prefix is NaN.
pub fn parse_float_prefix(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    end = skip_digits(bytes, end);
    let mut mantissa_digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = skip_digits(bytes, end + 1);
        mantissa_digits += frac_end - (end + 1);
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = skip_digits(bytes, exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

fn skip_digits(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).is_some_and(|b| b.is_ascii_digit()) {
        pos += 1;
    }
    pos
}

/// NaN and zero store as `0`; infinities have no JSON form and store as null.
fn number_value(f: f64) -> Value {
    if f.is_nan() || f == 0.0 {
        return Value::from(0);
    }
    if !f.is_finite() {
        return Value::Null;
    }
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
        return Value::from(f as i64);
    }
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Accepts RFC 3339, a bare `YYYY-MM-DD` (midnight UTC), or a local
/// `YYYY-MM-DDTHH:MM[:SS]` / `YYYY-MM-DD HH:MM[:SS]`.
fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Local
                .from_local_datetime(&ndt)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    None
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
