//! jsondb server binary.
//!
//! Opens (creating if needed) a data directory and serves it over a Unix
//! domain socket.

use std::path::PathBuf;

use clap::Parser;
use jsondb_core::api::{DbOptions, FilterMode, JsonDb};
use jsondb_core::storage::SyncMode;
use jsondb_server::JsonDbServer;
use jsondb_server::config::{self, DATA_DIR_ENV, SOCKET_ENV};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "jsondb-server", about = "Serve a jsondb data directory over a Unix socket")]
struct Args {
    /// Directory holding the table files
    #[arg(long, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Socket path (defaults to <data-dir>/server.sock)
    #[arg(long, env = SOCKET_ENV)]
    socket: Option<PathBuf>,

    /// Reject malformed filters and unknown operators instead of ignoring them
    #[arg(long)]
    strict_filters: bool,

    /// Skip fsync after writes
    #[arg(long)]
    no_sync: bool,
}

impl Args {
    fn db_options(&self) -> DbOptions {
        DbOptions {
            filter_mode: if self.strict_filters {
                FilterMode::Strict
            } else {
                FilterMode::Permissive
            },
            sync_mode: if self.no_sync {
                SyncMode::None
            } else {
                SyncMode::Full
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data_dir = args.data_dir.clone().unwrap_or_else(config::default_data_dir);
    let socket_path = args
        .socket
        .clone()
        .unwrap_or_else(|| config::default_socket_path(&data_dir));

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!(data_dir = %data_dir.display(), socket = %socket_path.display(), "starting");

    let db = JsonDb::open_with(&data_dir, args.db_options())?;
    let server = JsonDbServer::new(db, socket_path);
    server.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["jsondb-server"]).unwrap();
        assert!(!args.strict_filters);
        assert_eq!(args.db_options(), DbOptions::default());
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "jsondb-server",
            "--data-dir",
            "/tmp/store",
            "--socket",
            "/tmp/store.sock",
            "--strict-filters",
            "--no-sync",
        ])
        .unwrap();
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/store")));
        assert_eq!(args.socket, Some(PathBuf::from("/tmp/store.sock")));
        assert_eq!(args.db_options().filter_mode, FilterMode::Strict);
        assert_eq!(args.db_options().sync_mode, SyncMode::None);
    }
}
