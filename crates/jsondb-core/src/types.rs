//! Core types: column definitions, records, and the persisted table document.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the store-assigned identity field present on every record.
pub const ID_FIELD: &str = "id";

/// File extension of a persisted table.
pub const TABLE_FILE_EXTENSION: &str = "json";

/// A single document within a table: field name to value, plus [`ID_FIELD`].
pub type Record = Map<String, Value>;

/// The declared type of a column.
///
/// Column types are advisory. The store never validates record values
/// against them; front-ends use them to coerce user input before writing.
/// Tokens outside the known set are kept verbatim in [`ColumnType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Array,
    Date,
    Null,
    Other(String),
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Array => "array",
            ColumnType::Date => "date",
            ColumnType::Null => "null",
            ColumnType::Other(token) => token,
        }
    }
}

impl From<String> for ColumnType {
    fn from(token: String) -> Self {
        match token.as_str() {
            "string" => ColumnType::String,
            "number" => ColumnType::Number,
            "boolean" => ColumnType::Boolean,
            "array" => ColumnType::Array,
            "date" => ColumnType::Date,
            "null" => ColumnType::Null,
            _ => ColumnType::Other(token),
        }
    }
}

impl From<&str> for ColumnType {
    fn from(token: &str) -> Self {
        ColumnType::from(token.to_string())
    }
}

impl From<ColumnType> for String {
    fn from(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Other(token) => token,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared column: name plus advisory type. Fixed at table creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: impl Into<ColumnType>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// The persisted representation of one table: `{columns: [...], data: [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub data: Vec<Record>,
}

impl TableData {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            data: Vec::new(),
        }
    }

    /// Position of the record whose `id` equals `id`.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.data.iter().position(|r| record_id(r) == Some(id))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.position_of(id).is_some()
    }
}

/// The string id of a record, if it has one.
pub fn record_id(record: &Record) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}
