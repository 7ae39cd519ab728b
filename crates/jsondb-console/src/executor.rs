use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use jsondb_core::api::JsonDb;
use jsondb_core::error::SchemaError;
use jsondb_core::types::{Column, Record};
use jsondb_server::JsonDbServer;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::commands::{Command, ServerAction};
use crate::display;
use crate::error::ConsoleError;
use crate::prompt::Prompter;

/// Structured result from executing a command.
#[derive(Debug)]
pub enum CommandResult {
    /// Mutation succeeded (CREATE/DELETE TABLE, DELETE/UPDATE RECORD, server stop).
    Ok(String),
    /// Record inserted under a new id.
    Inserted { table: String, id: String },
    /// Matching records, with the table's columns for layout.
    Records {
        table: String,
        columns: Vec<Column>,
        records: Vec<Record>,
    },
    /// Exit signal.
    Exit,
}

/// Execute a command against the store.
///
/// `StartServer` serves in the background on `rt` and asks `prompter` for
/// server actions until the user stops it.
pub fn execute(
    db: &JsonDb,
    rt: &Runtime,
    prompter: &mut dyn Prompter,
    cmd: Command,
) -> Result<CommandResult, ConsoleError> {
    match cmd {
        Command::CreateTable { name, columns } => {
            db.create_table(&name, &columns)?;
            Ok(CommandResult::Ok(format!("Table '{name}' created.")))
        }
        Command::DeleteTable { name } => {
            db.drop_table(&name)?;
            Ok(CommandResult::Ok(format!("Table '{name}' deleted.")))
        }
        Command::InsertRecord { table, record } => {
            let id = db.insert_record(&table, record)?;
            Ok(CommandResult::Inserted { table, id })
        }
        Command::DeleteRecord { table, id } => {
            db.delete_record(&table, &id)?;
            Ok(CommandResult::Ok(format!("Record '{id}' deleted from '{table}'.")))
        }
        Command::UpdateRecord { table, id, patch } => {
            db.update_record(&table, &id, patch)?;
            Ok(CommandResult::Ok(format!("Record '{id}' updated in '{table}'.")))
        }
        Command::ListRecords { table, filter } => exec_list_records(db, table, filter),
        Command::StartServer { socket } => run_server_session(db, rt, prompter, socket),
        Command::Exit => Ok(CommandResult::Exit),
    }
}

/// Serve until Ctrl-C or SIGTERM, without a menu.
pub fn serve_until_signal(
    db: &JsonDb,
    rt: &Runtime,
    socket: PathBuf,
) -> Result<CommandResult, ConsoleError> {
    let server = JsonDbServer::new(db.clone(), socket);
    display::print_ok(&format!(
        "Server listening on {}. Press Ctrl-C to stop.",
        server.socket_path().display()
    ));
    rt.block_on(server.run())?;
    info!("server stopped by signal");
    Ok(CommandResult::Ok("Server stopped.".to_string()))
}

fn run_server_session(
    db: &JsonDb,
    rt: &Runtime,
    prompter: &mut dyn Prompter,
    socket: PathBuf,
) -> Result<CommandResult, ConsoleError> {
    let server = JsonDbServer::new(db.clone(), socket.clone());
    let listener = {
        let _enter = rt.enter();
        server.bind()?
    };
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = rt.spawn(async move {
        server
            .serve(listener, async move {
                stop_rx.await.ok();
            })
            .await
    });
    let started = Instant::now();
    display::print_ok(&format!("Server listening on {}.", socket.display()));

    // Stop the server whatever the menu loop returned.
    let outcome = server_menu(db, prompter, &socket, started, &task);
    let _ = stop_tx.send(());
    let served = rt.block_on(task).map_err(io::Error::other)?;
    outcome?;
    served?;

    info!(uptime_secs = started.elapsed().as_secs(), "server stopped from console");
    Ok(CommandResult::Ok("Server stopped.".to_string()))
}

fn server_menu(
    db: &JsonDb,
    prompter: &mut dyn Prompter,
    socket: &Path,
    started: Instant,
    task: &JoinHandle<io::Result<()>>,
) -> Result<(), ConsoleError> {
    loop {
        display::print_server_menu();
        let Some(answer) = prompter.ask("server>")? else {
            return Ok(());
        };
        if answer.trim().is_empty() {
            continue;
        }
        match ServerAction::parse(&answer) {
            Ok(ServerAction::ShowStatus) => {
                let status = server_status(db, socket, started, !task.is_finished())?;
                display::print_ok(&status);
            }
            Ok(ServerAction::StopServer) => return Ok(()),
            Err(e) => display::print_error(&e),
        }
    }
}

fn server_status(
    db: &JsonDb,
    socket: &Path,
    started: Instant,
    running: bool,
) -> Result<String, ConsoleError> {
    let state = if running { "running" } else { "stopped" };
    Ok(format!(
        "Server {state} on {} for {}s, serving {} table(s) from {}.",
        socket.display(),
        started.elapsed().as_secs(),
        db.list_tables()?.len(),
        db.root().display(),
    ))
}

fn exec_list_records(
    db: &JsonDb,
    table: String,
    filter: Option<String>,
) -> Result<CommandResult, ConsoleError> {
    let Some(columns) = db.get_columns(&table)? else {
        return Err(ConsoleError::Db(SchemaError::TableNotFound(table).into()));
    };
    let records = match filter.as_deref() {
        Some(f) => db.list_records_filtered(&table, f)?,
        None => db.list_all(&table)?,
    };
    Ok(CommandResult::Records {
        table,
        columns,
        records,
    })
}
