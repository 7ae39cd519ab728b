//! Unix domain socket server that wraps a `JsonDb` store handle.
//!
//! Each connected client sends JSON-line requests and receives JSON-line
//! responses. Store calls run on the blocking pool; the per-table locks
//! inside `JsonDb` serialize writers to the same table.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use jsondb_core::api::JsonDb;
use jsondb_core::api::filter::{self, FilterMode, Predicate};
use jsondb_core::error::{Error as DbError, FilterError, RecordError, SchemaError};
use jsondb_core::types::Column;

use crate::protocol::{ColumnDef, Request, Response};

/// A jsondb server listening on a Unix socket.
pub struct JsonDbServer {
    db: JsonDb,
    socket_path: PathBuf,
}

impl JsonDbServer {
    pub fn new(db: JsonDb, socket_path: PathBuf) -> Self {
        Self { db, socket_path }
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Run the server, accepting connections until a shutdown signal is received.
    ///
    /// On startup, removes any stale socket file and binds a new one.
    /// On shutdown (SIGINT or SIGTERM), removes the socket file before exiting.
    pub async fn run(&self) -> std::io::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Like [`run`](Self::run), but stops when `shutdown` completes.
    pub async fn run_until(
        &self,
        shutdown: impl std::future::Future<Output = ()>,
    ) -> std::io::Result<()> {
        let listener = self.bind()?;
        self.serve(listener, shutdown).await
    }

    /// Replace any stale socket file and bind the listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(&self) -> std::io::Result<UnixListener> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = %self.socket_path.display(), "server listening");
        Ok(listener)
    }

    /// Accept connections on a listener from [`bind`](Self::bind) until
    /// `shutdown` completes, then remove the socket file.
    pub async fn serve(
        &self,
        listener: UnixListener,
        shutdown: impl std::future::Future<Output = ()>,
    ) -> std::io::Result<()> {
        let accept_loop = async {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let db = self.db.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(db, stream).await {
                                warn!(error = %e, "connection handler error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept error");
                    }
                }
            }
        };

        tokio::select! {
            _ = accept_loop => {}
            _ = shutdown => {
                info!("shutdown signal received");
            }
        }

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(error = %e, "failed to remove socket file on shutdown");
            } else {
                info!(path = %self.socket_path.display(), "socket file removed");
            }
        }

        Ok(())
    }
}

async fn handle_connection(db: JsonDb, stream: tokio::net::UnixStream) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(trimmed) {
            Ok(req) => {
                let db = db.clone();
                tokio::task::spawn_blocking(move || dispatch(&db, req))
                    .await
                    .unwrap_or_else(|e| Response::error("InternalError", e.to_string()))
            }
            Err(e) => Response::error("ParseError", e.to_string()),
        };

        let mut resp_bytes = match serde_json::to_vec(&response) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "failed to serialize response");
                format!(
                    r#"{{"error":"InternalError","message":{}}}"#,
                    serde_json::Value::String(e.to_string())
                )
                .into_bytes()
            }
        };
        resp_bytes.push(b'\n');

        writer.write_all(&resp_bytes).await?;
        writer.flush().await?;
    }

    Ok(())
}

fn dispatch(db: &JsonDb, req: Request) -> Response {
    match req {
        Request::ListTables => match db.list_tables() {
            Ok(tables) => Response::ok_tables(tables),
            Err(e) => db_error_to_response(e),
        },

        Request::CreateTable { table, columns } => handle_create_table(db, &table, columns),

        Request::DropTable { table } => match db.drop_table(&table) {
            Ok(()) => Response::ok_empty(),
            Err(e) => db_error_to_response(e),
        },

        Request::DescribeTable { table } => handle_describe_table(db, &table),

        Request::ListRecords {
            table,
            filter,
            predicates,
            strict,
        } => handle_list_records(db, &table, filter, predicates, strict),

        Request::InsertRecord { table, record } => match db.insert_record(&table, record) {
            Ok(id) => Response::ok_inserted(id),
            Err(e) => db_error_to_response(e),
        },

        Request::GetRecord { table, id } => match db.get_record(&table, &id) {
            Ok(record) => Response::ok_record(record),
            Err(e) => db_error_to_response(e),
        },

        Request::UpdateRecord { table, id, patch } => {
            match db.update_record(&table, &id, patch) {
                Ok(()) => Response::ok_empty(),
                Err(e) => db_error_to_response(e),
            }
        }

        Request::DeleteRecord { table, id } => match db.delete_record(&table, &id) {
            Ok(()) => Response::ok_empty(),
            Err(e) => db_error_to_response(e),
        },
    }
}

fn handle_create_table(db: &JsonDb, table: &str, columns: Vec<ColumnDef>) -> Response {
    let columns: Vec<Column> = columns.into_iter().map(Column::from).collect();
    match db.create_table_with_columns(table, columns) {
        Ok(()) => Response::ok_empty(),
        Err(e) => db_error_to_response(e),
    }
}

fn handle_describe_table(db: &JsonDb, table: &str) -> Response {
    match db.describe_table(table) {
        Ok(data) => {
            let columns = data.columns.iter().map(ColumnDef::from).collect();
            Response::ok_table(table.to_string(), columns, data.data)
        }
        Err(e) => db_error_to_response(e),
    }
}

fn handle_list_records(
    db: &JsonDb,
    table: &str,
    filter_str: Option<String>,
    predicates: Option<Vec<Predicate>>,
    strict: Option<bool>,
) -> Response {
    let mode = match strict {
        Some(true) => FilterMode::Strict,
        Some(false) => FilterMode::Permissive,
        None => db.options().filter_mode,
    };

    let records = match db.list_all(table) {
        Ok(records) => records,
        Err(e) => return db_error_to_response(e),
    };

    let mut all = match filter_str.as_deref().map(|f| filter::parse_filter(f, mode)) {
        Some(Ok(parsed)) => parsed,
        Some(Err(e)) => return filter_error_to_response(e),
        None => Vec::new(),
    };
    all.extend(predicates.unwrap_or_default());

    if let Err(e) = filter::check_predicates(&all, mode) {
        return filter_error_to_response(e);
    }

    let matched = filter::filter_records(records, &all);
    debug!(table, predicates = all.len(), matched = matched.len(), "list_records");
    Response::ok_records(matched)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}

fn filter_error_to_response(err: FilterError) -> Response {
    Response::error("InvalidFilter", err.to_string())
}

fn db_error_to_response(err: DbError) -> Response {
    let code = match &err {
        DbError::Schema(SchemaError::TableNotFound(_)) => "TableNotFound",
        DbError::Schema(SchemaError::TableAlreadyExists(_)) => "TableAlreadyExists",
        DbError::Schema(SchemaError::InvalidSchema(_)) => "InvalidSchema",
        DbError::Schema(SchemaError::InvalidTableName(_)) => "InvalidTableName",
        DbError::Record(RecordError::NotFound { .. }) => "RecordNotFound",
        DbError::Record(RecordError::NotAnObject) => "InvalidRecord",
        DbError::Filter(_) => "InvalidFilter",
        DbError::Storage(_) => {
            error!(error = %err, "storage failure");
            "InternalError"
        }
    };
    Response::error(code, err.to_string())
}
