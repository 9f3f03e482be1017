//! Database access layer for the SQLite inventory store.

pub mod connection;

pub use connection::{Database, RowSet};
