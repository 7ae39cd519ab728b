//! Filter predicates for listing records.
//!
//! A filter set is an ordered list of [`Predicate`]s combined with logical
//! AND. Evaluation is a pure function of the records and the predicates.
//! Values are compared the way a loosely typed client would compare them:
//! string operators work on the stringified value, ignoring case, and
//! ordering operators coerce both sides to numbers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::FilterError;
use crate::types::Record;

/// A predicate operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
    StartsWith,
    EndsWith,
    /// Anything else. Matches every record in permissive mode.
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::Unknown(op) => op,
        }
    }
}

impl From<String> for Operator {
    fn from(op: String) -> Self {
        match op.as_str() {
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Ge,
            "<=" => Operator::Le,
            "contains" => Operator::Contains,
            "startsWith" => Operator::StartsWith,
            "endsWith" => Operator::EndsWith,
            _ => Operator::Unknown(op),
        }
    }
}

impl From<&str> for Operator {
    fn from(op: &str) -> Self {
        Operator::from(op.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unknown(op) => op,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{field, operator, value}` filter condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

impl Predicate {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Evaluate this predicate against one record.
    ///
    /// A record without `field` never matches, whatever the operator.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(record_value) = record.get(&self.field) else {
            return false;
        };

        match &self.operator {
            Operator::Eq => lowercase(record_value) == self.value.to_lowercase(),
            Operator::Ne => lowercase(record_value) != self.value.to_lowercase(),
            Operator::Gt => to_number(record_value) > parse_number(&self.value),
            Operator::Lt => to_number(record_value) < parse_number(&self.value),
            Operator::Ge => to_number(record_value) >= parse_number(&self.value),
            Operator::Le => to_number(record_value) <= parse_number(&self.value),
            Operator::Contains => lowercase(record_value).contains(&self.value.to_lowercase()),
            Operator::StartsWith => {
                lowercase(record_value).starts_with(&self.value.to_lowercase())
            }
            Operator::EndsWith => lowercase(record_value).ends_with(&self.value.to_lowercase()),
            Operator::Unknown(_) => true,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
                write!(f, "{}:{}:{}", self.field, self.operator, self.value)
            }
            _ => write!(f, "{}{}{}", self.field, self.operator, self.value),
        }
    }
}

/// Whether a record matches every predicate. An empty set matches everything.
pub fn matches_all(record: &Record, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| p.matches(record))
}

/// Keep the records that match every predicate, in their original order.
pub fn filter_records(records: Vec<Record>, predicates: &[Predicate]) -> Vec<Record> {
    if predicates.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| matches_all(r, predicates))
        .collect()
}

// ---------------------------------------------------------------------------
// Filter strings
// ---------------------------------------------------------------------------

/// How malformed client filters are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Malformed tokens are dropped and unknown operators match everything.
    #[default]
    Permissive,
    /// Malformed tokens and unknown operators are errors.
    Strict,
}

/// Operator spellings inside a filter string, longest first at each position.
const FILTER_OPERATORS: [&str; 9] = [
    "==",
    "!=",
    ">=",
    "<=",
    ">",
    "<",
    ":contains",
    ":startsWith",
    ":endsWith",
];

/// Parse a filter string such as `name==yunus,age>25,email:contains:gmail`.
///
/// Tokens are separated by `,`. Each token is split at the first operator it
/// contains; the field and value are trimmed, and the word operators accept
/// an optional `:` before the value. Blank tokens are ignored.
pub fn parse_filter(input: &str, mode: FilterMode) -> Result<Vec<Predicate>, FilterError> {
    let mut predicates = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match split_token(token) {
            Some(p) if !p.field.is_empty() || mode == FilterMode::Permissive => predicates.push(p),
            _ if mode == FilterMode::Strict => {
                return Err(FilterError::MalformedToken(token.to_string()));
            }
            _ => {}
        }
    }
    Ok(predicates)
}

/// Reject unknown operators under [`FilterMode::Strict`].
pub fn check_predicates(predicates: &[Predicate], mode: FilterMode) -> Result<(), FilterError> {
    if mode == FilterMode::Permissive {
        return Ok(());
    }
    match predicates.iter().find_map(|p| match &p.operator {
        Operator::Unknown(op) => Some(op.clone()),
        _ => None,
    }) {
        Some(op) => Err(FilterError::UnknownOperator(op)),
        None => Ok(()),
    }
}

fn split_token(token: &str) -> Option<Predicate> {
    for (i, _) in token.char_indices() {
        let rest = &token[i..];
        let Some(symbol) = FILTER_OPERATORS.iter().find(|s| rest.starts_with(**s)) else {
            continue;
        };
        let field = token[..i].trim();
        let mut value = rest[symbol.len()..].trim();
        let operator = match symbol.strip_prefix(':') {
            Some(word) => {
                value = value.strip_prefix(':').unwrap_or(value).trim();
                Operator::from(word)
            }
            None => Operator::from(*symbol),
        };
        return Some(Predicate::new(field, operator, value));
    }
    None
}

// ---------------------------------------------------------------------------
// Loose value semantics
// ---------------------------------------------------------------------------

fn lowercase(value: &Value) -> String {
    to_display_string(value).to_lowercase()
}

/// Stringify a value the way a dynamically typed client prints it.
///
/// Strings are unquoted, integral numbers drop the fraction, arrays join
/// their elements with `,` (null elements print empty), and objects print
/// as `[object Object]`. Numbers at or above `1e21` or below `1e-6` in
/// magnitude use exponent notation with a signed exponent (`1e+21`,
/// `1.5e-7`).
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                other => to_display_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.abs() >= 1e21 || f.abs() < 1e-6 => exponent_string(f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// `{:e}` already picks the shortest mantissa; only the `+` on a
/// non-negative exponent is missing.
fn exponent_string(f: f64) -> String {
    let formatted = format!("{f:e}");
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => formatted,
    }
}

/// Coerce a value to a number. Non-numeric input yields NaN, which fails
/// every ordering comparison.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        Value::Array(_) => parse_number(&to_display_string(value)),
        Value::Object(_) => f64::NAN,
    }
}

/// Parse a whole string as a number. Blank strings are zero.
pub fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = t.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|v| v as f64)
                .unwrap_or(f64::NAN);
        }
    }
    // Rust's float parser also accepts "inf"/"nan"; only plain decimal
    // notation is a number here.
    if t
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        t.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}
