//! Row types shared by the scraper, the snapshot store and the diff engine.
//!
//! - ProjectRecord: one project as seen in a single scrape
//! - SnapshotRow: a ProjectRecord stamped with its capture date, as persisted
//! - DiffRow: a ProjectRecord with its vote delta against history

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Title used when a project page has no usable title element.
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub title: String,
    /// Absolute URL of the project page, unique within one scrape.
    pub link: String,
    pub votes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    #[serde(flatten)]
    pub record: ProjectRecord,
    pub captured_at: NaiveDate,
}

impl SnapshotRow {
    pub fn new(record: ProjectRecord, captured_at: NaiveDate) -> Self {
        SnapshotRow { record, captured_at }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffType {
    New,
    Grew,
    Shrank,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRow {
    #[serde(flatten)]
    pub record: ProjectRecord,
    /// Votes from the most recent stored snapshot of this link, if any.
    pub previous_votes: Option<u64>,
    pub vote_delta: i64,
    pub diff_type: DiffType,
    pub updated_at: DateTime<Utc>,
}
