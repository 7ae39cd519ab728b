//! Table catalog: column specs, table names, and the on-disk table listing.

pub mod ops;

pub use ops::{parse_column_spec, validate_columns, validate_table_name};
