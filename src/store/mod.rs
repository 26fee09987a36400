//! SQLite snapshot storage.
//!
//! Persists every scrape to a local SQLite database with one table:
//! - snapshot_rows: title, link, votes, captured_at (ISO date)
//!
//! Supports:
//! - Append after every refresh, never rewriting earlier rows
//! - Latest row per link for diffing
//! - Listing capture dates

pub mod diff;
pub mod snapshot;

pub use snapshot::{CaptureSummary, Store};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine data directory")]
    NoDataDir,

    #[error("history schema version {found} is newer than supported version {supported}")]
    NewerSchema { found: i64, supported: i64 },

    #[error("history table is missing columns: {0}")]
    MissingColumns(String),
}
