//! Client library for connecting to a `jsondb-server` via Unix socket.
//!
//! Each method serializes a JSON-line request, sends it, reads a JSON-line
//! response, and returns the parsed result.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use jsondb_core::api::Predicate;
use jsondb_core::types::Record;

use crate::error::ClientError;
use crate::protocol::{ColumnDef, ErrorResponse};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// A table returned from `describe_table`: its columns and every record.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub data: Vec<Record>,
}

/// Client for a jsondb server.
pub struct JsonDbClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    line_buf: String,
}

impl JsonDbClient {
    /// Connect to a jsondb server at the given Unix socket path.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = UnixStream::connect(path.as_ref()).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            line_buf: String::new(),
        })
    }

    /// List all table names, sorted.
    pub async fn list_tables(&mut self) -> Result<Vec<String>> {
        let req = serde_json::json!({"op": "list_tables"});
        let resp = self.send_request(&req).await?;
        field_from_response(&resp, "tables")
    }

    /// Create a table with the given columns.
    pub async fn create_table(&mut self, table: &str, columns: &[ColumnDef]) -> Result<()> {
        let req = serde_json::json!({
            "op": "create_table",
            "table": table,
            "columns": columns,
        });
        let resp = self.send_request(&req).await?;
        check_error(&resp)
    }

    /// Delete a table and all of its records.
    pub async fn drop_table(&mut self, table: &str) -> Result<()> {
        let req = serde_json::json!({"op": "drop_table", "table": table});
        let resp = self.send_request(&req).await?;
        check_error(&resp)
    }

    /// A table's columns and records.
    pub async fn describe_table(&mut self, table: &str) -> Result<TableInfo> {
        let req = serde_json::json!({"op": "describe_table", "table": table});
        let resp = self.send_request(&req).await?;
        Ok(TableInfo {
            name: field_from_response(&resp, "table")?,
            columns: field_from_response(&resp, "columns")?,
            data: field_from_response(&resp, "data")?,
        })
    }

    /// Records matching a filter string such as `"age>25,name:contains:al"`.
    ///
    /// `strict` overrides the server's filter mode for this call.
    pub async fn list_records(
        &mut self,
        table: &str,
        filter: Option<&str>,
        strict: Option<bool>,
    ) -> Result<Vec<Record>> {
        let mut req = serde_json::json!({"op": "list_records", "table": table});
        if let Some(f) = filter {
            req["filter"] = Value::String(f.to_string());
        }
        if let Some(s) = strict {
            req["strict"] = Value::Bool(s);
        }
        let resp = self.send_request(&req).await?;
        field_from_response(&resp, "records")
    }

    /// Records matching every structured predicate.
    pub async fn list_records_where(
        &mut self,
        table: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Record>> {
        let req = serde_json::json!({
            "op": "list_records",
            "table": table,
            "predicates": predicates,
        });
        let resp = self.send_request(&req).await?;
        field_from_response(&resp, "records")
    }

    /// Insert a record and return its assigned id.
    pub async fn insert_record(&mut self, table: &str, record: Value) -> Result<String> {
        let req = serde_json::json!({
            "op": "insert_record",
            "table": table,
            "record": record,
        });
        let resp = self.send_request(&req).await?;
        field_from_response(&resp, "id")
    }

    /// One record by id, or `None` if the table has no such record.
    pub async fn get_record(&mut self, table: &str, id: &str) -> Result<Option<Record>> {
        let req = serde_json::json!({"op": "get_record", "table": table, "id": id});
        let resp = self.send_request(&req).await?;
        check_error(&resp)?;
        match resp.get("record") {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v.clone())
                .map(Some)
                .map_err(ClientError::Serialization),
        }
    }

    /// Merge `patch` over the record with `id`.
    pub async fn update_record(&mut self, table: &str, id: &str, patch: Value) -> Result<()> {
        let req = serde_json::json!({
            "op": "update_record",
            "table": table,
            "id": id,
            "patch": patch,
        });
        let resp = self.send_request(&req).await?;
        check_error(&resp)
    }

    /// Remove the record with `id`.
    pub async fn delete_record(&mut self, table: &str, id: &str) -> Result<()> {
        let req = serde_json::json!({"op": "delete_record", "table": table, "id": id});
        let resp = self.send_request(&req).await?;
        check_error(&resp)
    }

    /// Send a raw JSON request and return the raw response.
    pub async fn send_raw(&mut self, req: &Value) -> Result<Value> {
        self.send_request(req).await
    }

    async fn send_request(&mut self, req: &Value) -> Result<Value> {
        let mut data = serde_json::to_vec(req).map_err(ClientError::Serialization)?;
        data.push(b'\n');
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;

        self.line_buf.clear();
        let n = self.reader.read_line(&mut self.line_buf).await?;
        if n == 0 {
            return Err(ClientError::Disconnected);
        }

        let resp: Value =
            serde_json::from_str(self.line_buf.trim()).map_err(ClientError::Serialization)?;
        Ok(resp)
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn check_error(resp: &Value) -> Result<()> {
    if let Some(err) = resp.get("error") {
        let error = err.as_str().unwrap_or("Unknown").to_string();
        let message = resp
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .to_string();
        return Err(ClientError::Server(ErrorResponse { error, message }));
    }
    Ok(())
}

fn field_from_response<T: DeserializeOwned>(resp: &Value, field: &str) -> Result<T> {
    check_error(resp)?;
    let value = resp
        .get(field)
        .ok_or_else(|| ClientError::Protocol(format!("missing '{field}' in response")))?;
    serde_json::from_value(value.clone()).map_err(ClientError::Serialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_error_maps_server_error() {
        let err = check_error(&json!({"error": "TableNotFound", "message": "table not found: x"}))
            .unwrap_err();
        assert_eq!(err.code(), Some("TableNotFound"));
        assert!(check_error(&json!({"ok": true})).is_ok());
    }

    #[test]
    fn test_field_missing_is_protocol_error() {
        let err = field_from_response::<Vec<String>>(&json!({"ok": true}), "tables").unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
