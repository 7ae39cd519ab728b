//! Error types for all jsondb operations.

use std::io;
use thiserror::Error;

/// Top-level error type for jsondb operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupted table file {path}: {reason}")]
    Corrupted { path: String, reason: String },

    #[error("data directory is locked by another process: {0}")]
    DirectoryLocked(String),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("invalid column specification: {0}")]
    InvalidSchema(String),

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record '{id}' not found in table '{table}'")]
    NotFound { table: String, id: String },

    #[error("record must be a JSON object")]
    NotAnObject,
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("malformed filter token: {0:?}")]
    MalformedToken(String),

    #[error("unknown filter operator: {0:?}")]
    UnknownOperator(String),
}

pub type Result<T> = std::result::Result<T, Error>;
