//! Default locations shared by the server binary and the console.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "JSONDB_DATA_DIR";

/// Environment variable overriding the server socket path.
pub const SOCKET_ENV: &str = "JSONDB_SOCKET";

/// Socket file name used when no explicit path is given.
pub const SOCKET_FILE_NAME: &str = "server.sock";

/// `<local data dir>/jsondb`, or `./jsondb` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jsondb")
}

/// The socket path used for a data directory when none is configured.
pub fn default_socket_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SOCKET_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir_ends_with_jsondb() {
        assert!(default_data_dir().ends_with("jsondb"));
    }

    #[test]
    fn test_default_socket_inside_data_dir() {
        let sock = default_socket_path(Path::new("/tmp/store"));
        assert_eq!(sock, PathBuf::from("/tmp/store/server.sock"));
    }
}
