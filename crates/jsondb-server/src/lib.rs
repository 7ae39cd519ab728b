//! jsondb server and client library.
//!
//! Serves a jsondb store over a local Unix socket so that several
//! processes can share one data directory without contending for its lock.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::JsonDbClient;
pub use server::JsonDbServer;
