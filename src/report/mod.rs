pub mod json;
pub mod table;

use std::cmp::Reverse;

use clap::ValueEnum;

use crate::record::DiffRow;
use crate::refresh::RefreshOutcome;

pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Largest vote gain first
    Delta,
    /// Most votes first
    Votes,
}

/// Rows whose title contains `query`, ignoring case. An empty or blank
/// query keeps every row.
pub fn filter_by_title<'a>(rows: &'a [DiffRow], query: &str) -> Vec<&'a DiffRow> {
    let needle = query.trim().to_lowercase();
    rows.iter()
        .filter(|row| needle.is_empty() || row.record.title.to_lowercase().contains(&needle))
        .collect()
}

/// Reorder rows in place; both keys are descending and stable.
pub fn sort_rows(rows: &mut [&DiffRow], key: SortKey) {
    match key {
        SortKey::Delta => rows.sort_by_key(|row| Reverse(row.vote_delta)),
        SortKey::Votes => rows.sort_by_key(|row| Reverse(row.record.votes)),
    }
}

/// The `n` rows with the most votes.
pub fn top_by_votes<'a>(rows: &[&'a DiffRow], n: usize) -> Vec<&'a DiffRow> {
    let mut top = rows.to_vec();
    sort_rows(&mut top, SortKey::Votes);
    top.truncate(n);
    top
}

/// Stderr notes for a refresh that just ran: skipped project pages when
/// verbose, and the diagnostics always.
pub fn render_notices(outcome: &RefreshOutcome, verbose: bool) -> String {
    let mut output = String::new();

    if verbose && !outcome.skipped.is_empty() {
        output.push_str("\nskipped projects:\n");
        for skipped in &outcome.skipped {
            output.push_str(&format!("  {} ({})\n", skipped.link, skipped.reason));
        }
    }

    if outcome.diagnostics.is_empty() {
        return output;
    }

    output.push('\n');
    if verbose {
        output.push_str("Diagnostics:\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');
        for diagnostic in &outcome.diagnostics {
            output.push_str(&format!("  {diagnostic}\n"));
        }
    } else {
        for diagnostic in &outcome.diagnostics {
            output.push_str(&format!("[diagnostic] {diagnostic}\n"));
        }
    }

    output
}

pub fn print_notices(outcome: &RefreshOutcome, verbose: bool) {
    eprint!("{}", render_notices(outcome, verbose));
}
