//! JSON output for refresh results and history.
//!
//! Serializes rows for scripting and piping.

use serde::Serialize;

use crate::record::{DiffRow, SnapshotRow};
use crate::store::CaptureSummary;

#[derive(Serialize)]
struct CaptureJson {
    captured_at: String,
    projects: usize,
    total_votes: u64,
}

pub fn render(rows: &[&DiffRow]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| String::from("[]"))
}

pub fn render_snapshot(rows: &[SnapshotRow]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| String::from("[]"))
}

pub fn render_captures(captures: &[CaptureSummary]) -> String {
    let captures: Vec<CaptureJson> = captures
        .iter()
        .map(|c| CaptureJson {
            captured_at: c.captured_at.format("%Y-%m-%d").to_string(),
            projects: c.projects,
            total_votes: c.total_votes,
        })
        .collect();

    serde_json::to_string_pretty(&captures).unwrap_or_else(|_| String::from("[]"))
}
