//! Terminal table rendering for refresh results.
//!
//! One line per project: rank, title, votes, signed delta and the link to
//! the project page.

use crate::record::{DiffRow, DiffType, SnapshotRow};
use crate::store::CaptureSummary;

const TITLE_WIDTH: usize = 48;

pub fn render(rows: &[&DiffRow]) -> String {
    if rows.is_empty() {
        return String::from("No projects to show.\n");
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:>4}  {:<width$} {:>8} {:>8}  {}\n",
        "#",
        "Project",
        "Votes",
        "Delta",
        "Link",
        width = TITLE_WIDTH
    ));
    output.push_str(&"-".repeat(TITLE_WIDTH + 40));
    output.push('\n');

    for (i, row) in rows.iter().enumerate() {
        output.push_str(&format!(
            "{:>4}  {:<width$} {:>8} {:>8}  {}\n",
            i + 1,
            truncate(&row.record.title, TITLE_WIDTH),
            row.record.votes,
            format_delta(row),
            row.record.link,
            width = TITLE_WIDTH
        ));
    }

    output
}

pub fn render_captures(captures: &[CaptureSummary]) -> String {
    if captures.is_empty() {
        return String::from("No snapshots found. Run 'votewatch refresh' to create one.\n");
    }

    let mut output = String::new();
    output.push_str(&format!("{:<12} {:>10} {:>12}\n", "Date", "Projects", "Total votes"));
    output.push_str(&"-".repeat(36));
    output.push('\n');

    for capture in captures {
        output.push_str(&format!(
            "{:<12} {:>10} {:>12}\n",
            capture.captured_at.format("%Y-%m-%d").to_string(),
            capture.projects,
            capture.total_votes
        ));
    }

    output
}

/// Rows stored for one capture date, most votes first
pub fn render_snapshot(rows: &[SnapshotRow]) -> String {
    if rows.is_empty() {
        return String::from("No rows stored for that date.\n");
    }

    let mut sorted: Vec<_> = rows.iter().collect();
    sorted.sort_by_key(|row| std::cmp::Reverse(row.record.votes));

    let mut output = String::new();
    output.push_str(&format!("{:<width$} {:>8}  {}\n", "Project", "Votes", "Link", width = TITLE_WIDTH));
    output.push_str(&"-".repeat(TITLE_WIDTH + 30));
    output.push('\n');

    for row in sorted {
        output.push_str(&format!(
            "{:<width$} {:>8}  {}\n",
            truncate(&row.record.title, TITLE_WIDTH),
            row.record.votes,
            row.record.link,
            width = TITLE_WIDTH
        ));
    }

    output
}

fn format_delta(row: &DiffRow) -> String {
    match row.diff_type {
        DiffType::New => format!("new +{}", row.vote_delta),
        _ if row.vote_delta > 0 => format!("+{}", row.vote_delta),
        _ => row.vote_delta.to_string(),
    }
}

// pads by chars, so cyrillic titles line up like ascii ones
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}
