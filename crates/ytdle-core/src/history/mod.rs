//! Durable download history, backed by a single SQLite database.
//!
//! Per the design notes this is the only runtime history backend — JSON is
//! accepted exclusively as a one-time [`migrate::migrate_from_json`] input,
//! never written to at runtime.

pub mod migrate;
pub mod models;
pub mod schema;
pub mod store;

pub use models::{HistoryRecord, NewHistoryRecord, Setting};
pub use store::{HistoryStats, HistoryStore};
