//! Storage engine: one pretty-printed JSON file per table, atomic replace, directory locking.

pub mod file;
pub mod lock;

pub use file::SyncMode;
