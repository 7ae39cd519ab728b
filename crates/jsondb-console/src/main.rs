use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use jsondb_core::api::{DbOptions, FilterMode, JsonDb};
use jsondb_server::config::{self, DATA_DIR_ENV, SOCKET_ENV};
use tokio::runtime::Runtime;

mod coerce;
mod commands;
mod display;
mod error;
mod executor;
mod prompt;

use commands::MenuItem;
use display::OutputMode;
use error::ConsoleError;
use prompt::{LinePrompter, Prompter};

/// jsondb console: menu-driven table and record management for a jsondb
/// data directory.
#[derive(Parser, Debug)]
#[command(name = "jsondb", version)]
struct Cli {
    /// Directory holding the table files (default: ~/.local/share/jsondb).
    #[arg(short, long, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Output results as machine-parseable JSON.
    #[arg(short, long)]
    json: bool,

    /// Reject malformed filters and unknown operators.
    #[arg(long)]
    strict_filters: bool,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Mode {
    /// Run the interactive menu (the default).
    #[command(alias = "interactive")]
    Cli,
    /// Serve the data directory over a Unix socket until Ctrl-C.
    #[command(alias = "server")]
    Start {
        /// Socket path (default: <data-dir>/server.sock).
        #[arg(long, env = SOCKET_ENV)]
        socket: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Pretty
    };

    if let Err(e) = run(cli, &mode) {
        display::render_error(&e, &mode);
        process::exit(1);
    }
}

fn run(cli: Cli, mode: &OutputMode) -> Result<(), ConsoleError> {
    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    let options = DbOptions {
        filter_mode: if cli.strict_filters {
            FilterMode::Strict
        } else {
            FilterMode::Permissive
        },
        ..DbOptions::default()
    };
    let db = JsonDb::open_with(&data_dir, options)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.mode.unwrap_or(Mode::Cli) {
        Mode::Cli => {
            let mut prompter = LinePrompter::new()?;
            if let OutputMode::Pretty = mode {
                println!("jsondb console v{}", env!("CARGO_PKG_VERSION"));
                println!("Data directory: {}", data_dir.display());
            }
            run_menu(&db, &runtime, &mut prompter, mode);
        }
        Mode::Start { socket } => {
            let socket = socket.unwrap_or_else(|| config::default_socket_path(&data_dir));
            let result = executor::serve_until_signal(&db, &runtime, socket)?;
            display::render(&result, mode);
        }
    }
    Ok(())
}

/// The interactive loop: menu, questions, execution, result, and back to
/// the menu until Exit or end of input.
fn run_menu(db: &JsonDb, rt: &Runtime, prompter: &mut dyn Prompter, mode: &OutputMode) {
    loop {
        if let OutputMode::Pretty = mode {
            display::print_menu();
        }
        let answer = match prompter.ask(">") {
            Ok(Some(answer)) => answer,
            Ok(None) => {
                println!("Bye!");
                break;
            }
            Err(e) => {
                display::render_error(&e, mode);
                break;
            }
        };
        if answer.trim().is_empty() {
            continue;
        }

        let item = match MenuItem::parse(&answer) {
            Ok(item) => item,
            Err(e) => {
                display::render_error(&e, mode);
                continue;
            }
        };

        let cmd = match prompt::read_command(item, prompter, db) {
            Ok(cmd) => cmd,
            Err(ConsoleError::Cancelled) => {
                println!("Cancelled.");
                continue;
            }
            Err(e) => {
                display::render_error(&e, mode);
                continue;
            }
        };

        match executor::execute(db, rt, prompter, cmd) {
            Ok(result) => {
                if !display::render(&result, mode) {
                    break;
                }
            }
            Err(e) => display::render_error(&e, mode),
        }
    }
}
