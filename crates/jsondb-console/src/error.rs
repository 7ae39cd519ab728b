//! Errors surfaced by the console.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Db(#[from] jsondb_core::error::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    #[error("unknown menu choice: {0:?}")]
    UnknownChoice(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<jsondb_core::error::FilterError> for ConsoleError {
    fn from(err: jsondb_core::error::FilterError) -> Self {
        ConsoleError::Db(err.into())
    }
}
