//! Catalog operations: column spec parsing, table naming, and table discovery.
//!
//! A table is a `<name>.json` file directly under the data directory. The
//! catalog is that directory listing; there is no separate metadata file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, SchemaError, StorageError};
use crate::types::{Column, TABLE_FILE_EXTENSION};

/// Parse a column specification such as `"name:string, age:number"`.
///
/// Entries are separated by `,`; each entry is `name:type` with whitespace
/// around both halves ignored. Type tokens are not checked against the known
/// set (see [`crate::types::ColumnType::Other`]).
pub fn parse_column_spec(spec: &str) -> Result<Vec<Column>, Error> {
    let mut columns = Vec::new();
    for entry in spec.split(',') {
        let (name, column_type) = entry.split_once(':').ok_or_else(|| {
            SchemaError::InvalidSchema(format!("column {:?} is missing ':'", entry.trim()))
        })?;
        columns.push(Column::new(name.trim(), column_type.trim()));
    }
    validate_columns(&columns)?;
    Ok(columns)
}

/// Check a column list for empty names/types and duplicate names.
pub fn validate_columns(columns: &[Column]) -> Result<(), Error> {
    if columns.is_empty() {
        return Err(SchemaError::InvalidSchema("no columns declared".to_string()).into());
    }
    let mut seen = HashSet::new();
    for column in columns {
        let column_type = column.column_type.as_str();
        if column.name.is_empty() {
            return Err(SchemaError::InvalidSchema("empty column name".to_string()).into());
        }
        if column_type.is_empty() {
            return Err(SchemaError::InvalidSchema(format!(
                "column '{}' has an empty type",
                column.name
            ))
            .into());
        }
        if column_type.contains(':') {
            return Err(SchemaError::InvalidSchema(format!(
                "column '{}' has malformed type {column_type:?}",
                column.name
            ))
            .into());
        }
        if !seen.insert(column.name.as_str()) {
            return Err(SchemaError::InvalidSchema(format!(
                "duplicate column '{}'",
                column.name
            ))
            .into());
        }
    }
    Ok(())
}

/// Reject names that cannot safely become a file name in the data directory.
///
/// Leading dots are reserved for the store's lock and temp files.
pub fn validate_table_name(name: &str) -> Result<(), Error> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.trim() != name;
    if bad {
        return Err(SchemaError::InvalidTableName(name.to_string()).into());
    }
    Ok(())
}

/// Path of the file backing table `name`.
pub fn table_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.{TABLE_FILE_EXTENSION}"))
}

/// List all table names under `root`, sorted.
pub fn list_tables(root: &Path) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root).map_err(StorageError::from)? {
        let entry = entry.map_err(StorageError::from)?;
        if !entry.file_type().map_err(StorageError::from)?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(TABLE_FILE_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if validate_table_name(stem).is_ok() {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
