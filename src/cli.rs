use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::report::SortKey;

#[derive(Parser)]
#[command(name = "votewatch")]
#[command(about = "Tracks project vote counts on a voting site and reports daily deltas")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// History database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Show debug logging and detailed diagnostics
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scrape the site now, save a snapshot and show the result
    Refresh(RefreshArgs),

    /// Show the last result, refreshing first if it is stale
    Show(ShowArgs),

    /// List stored snapshots
    History(HistoryArgs),
}

#[derive(Args)]
pub struct RefreshArgs {
    /// Output as JSON instead of tables
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Only projects whose title contains this text (case-insensitive)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Only the N projects with the most votes
    #[arg(long)]
    pub top: Option<usize>,

    /// Ordering of the full table
    #[arg(long, value_enum, default_value_t = SortKey::Delta)]
    pub sort: SortKey,

    /// Output as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Show the rows stored for one capture date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
