//! Vote delta engine.
//!
//! Joins today's scrape against the most recent stored row per link:
//! - Matches by exact link
//! - A link with no history counts from zero (delta = today's votes)
//! - Output sorted by delta descending, ties keep scrape order

use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;

use crate::record::{DiffRow, DiffType, ProjectRecord, SnapshotRow};

/// Compute per-project deltas. Pure: the same inputs always give the same
/// rows, `updated_at` is stamped on every one of them.
pub fn compute_diff(
    today: &[ProjectRecord],
    previous: &HashMap<String, SnapshotRow>,
    updated_at: DateTime<Utc>,
) -> Vec<DiffRow> {
    let mut rows: Vec<DiffRow> = today
        .iter()
        .map(|record| {
            let previous_votes = previous.get(&record.link).map(|row| row.record.votes);
            let now = i64::try_from(record.votes).unwrap_or(i64::MAX);
            let before = i64::try_from(previous_votes.unwrap_or(0)).unwrap_or(i64::MAX);
            let vote_delta = now.saturating_sub(before);

            let diff_type = match previous_votes {
                None => DiffType::New,
                Some(_) if vote_delta > 0 => DiffType::Grew,
                Some(_) if vote_delta < 0 => DiffType::Shrank,
                Some(_) => DiffType::Unchanged,
            };

            DiffRow {
                record: record.clone(),
                previous_votes,
                vote_delta,
                diff_type,
                updated_at,
            }
        })
        .collect();

    // stable, so equal deltas stay in scrape order
    rows.sort_by_key(|row| Reverse(row.vote_delta));
    rows
}
