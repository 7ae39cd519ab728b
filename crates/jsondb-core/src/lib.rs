//! # jsondb
//!
//! A minimal schema-typed document store. Each table is a named collection of
//! records with a fixed list of typed columns, persisted as a single
//! pretty-printed JSON file and rewritten atomically on every change.
//!
//! ## Quick Start
//!
//! ```no_run
//! use jsondb_core::api::{JsonDb, Predicate};
//! use serde_json::json;
//!
//! let db = JsonDb::open("data").unwrap();
//! db.create_table("users", "name:string,age:number").unwrap();
//!
//! let id = db
//!     .insert_record("users", json!({"name": "Yunus", "age": 30}))
//!     .unwrap();
//! db.update_record("users", &id, json!({"age": 31})).unwrap();
//!
//! let adults = db
//!     .list_records("users", &[Predicate::new("age", ">", "18")])
//!     .unwrap();
//! assert_eq!(adults[0]["name"], "Yunus");
//! ```

pub mod api;
pub mod catalog;
pub mod error;
pub mod storage;
pub mod types;
