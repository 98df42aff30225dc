//! Persistence adapters for the message log.

pub mod sqlite;

pub use sqlite::{DEFAULT_QUERY_LIMIT, SqliteStore};
