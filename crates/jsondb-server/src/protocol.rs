//! Wire protocol: JSON-over-newlines request/response types.
//!
//! Each request is a single JSON line tagged by `op`; each response is a
//! single JSON line carrying either `ok: true` or an `error` code.

use jsondb_core::api::Predicate;
use jsondb_core::types::{Column, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request from a client.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    ListTables,
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        table: String,
    },
    DescribeTable {
        table: String,
    },
    ListRecords {
        table: String,
        /// Filter string, e.g. `"age>25,name:contains:al"`.
        #[serde(default)]
        filter: Option<String>,
        /// Structured predicates, ANDed with the parsed `filter`.
        #[serde(default)]
        predicates: Option<Vec<Predicate>>,
        /// Overrides the server's filter mode for this request.
        #[serde(default)]
        strict: Option<bool>,
    },
    InsertRecord {
        table: String,
        record: Value,
    },
    GetRecord {
        table: String,
        id: String,
    },
    UpdateRecord {
        table: String,
        id: String,
        patch: Value,
    },
    DeleteRecord {
        table: String,
        id: String,
    },
}

/// Column definition in wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

impl From<&Column> for ColumnDef {
    fn from(c: &Column) -> Self {
        ColumnDef::new(c.name.clone(), c.column_type.as_str())
    }
}

impl From<ColumnDef> for Column {
    fn from(c: ColumnDef) -> Self {
        Column::new(c.name, c.column_type)
    }
}

/// A response sent back to the client.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok(OkResponse),
    Error(ErrorResponse),
}

/// Successful response variants.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OkResponse {
    Tables {
        ok: bool,
        tables: Vec<String>,
    },
    Table {
        ok: bool,
        table: String,
        columns: Vec<ColumnDef>,
        data: Vec<Record>,
    },
    Records {
        ok: bool,
        records: Vec<Record>,
    },
    Record {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        record: Option<Record>,
    },
    Inserted {
        ok: bool,
        id: String,
    },
    Empty {
        ok: bool,
    },
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl Response {
    pub fn ok_empty() -> Self {
        Response::Ok(OkResponse::Empty { ok: true })
    }

    pub fn ok_tables(tables: Vec<String>) -> Self {
        Response::Ok(OkResponse::Tables { ok: true, tables })
    }

    pub fn ok_table(table: String, columns: Vec<ColumnDef>, data: Vec<Record>) -> Self {
        Response::Ok(OkResponse::Table {
            ok: true,
            table,
            columns,
            data,
        })
    }

    pub fn ok_records(records: Vec<Record>) -> Self {
        Response::Ok(OkResponse::Records { ok: true, records })
    }

    pub fn ok_record(record: Option<Record>) -> Self {
        Response::Ok(OkResponse::Record { ok: true, record })
    }

    pub fn ok_inserted(id: String) -> Self {
        Response::Ok(OkResponse::Inserted { ok: true, id })
    }

    pub fn error(error: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            error: error.into(),
            message: message.into(),
        })
    }
}
