//! Public API: the table store handle, filter predicates, and record ids.

pub mod database;
pub mod filter;
pub mod id;

pub use database::{DbOptions, JsonDb};
pub use filter::{FilterMode, Operator, Predicate, filter_records, parse_filter};
pub use id::IdGenerator;
