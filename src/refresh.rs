//! The refresh pipeline.
//!
//! listing page -> project links -> project pages -> today's table ->
//! diff against stored history -> append today's rows.
//!
//! Only an unreachable listing page aborts a refresh. Every per-project
//! failure is collected in `skipped` and the pass carries on.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::extract::extract_links;
use crate::fetch::{FetchError, PageSource};
use crate::parse::parse_project;
use crate::record::{DiffRow, ProjectRecord, SnapshotRow};
use crate::store::diff::compute_diff;
use crate::store::Store;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("could not load the listing page {url}: {source}")]
    Listing {
        url: String,
        #[source]
        source: FetchError,
    },
}

/// A project page that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub link: String,
    pub reason: String,
}

/// Today's table as scraped, before any diffing.
#[derive(Debug, Default)]
pub struct Scrape {
    pub links_found: usize,
    pub records: Vec<ProjectRecord>,
    pub skipped: Vec<Skipped>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub rows: Vec<DiffRow>,
    pub skipped: Vec<Skipped>,
    pub diagnostics: Vec<String>,
    pub duration_ms: u64,
}

/// Fetch the listing and every project page it links to.
pub fn scrape(source: &impl PageSource, config: &Config) -> Result<Scrape, RefreshError> {
    let listing_url = config.listing_url.as_str();
    let listing = source.fetch(listing_url).map_err(|source| RefreshError::Listing {
        url: listing_url.to_string(),
        source,
    })?;

    let links = extract_links(&listing, &config.listing_url, &config.path_prefix);
    info!(links = links.len(), "found project links");

    let mut result = Scrape { links_found: links.len(), ..Scrape::default() };

    for (link, page) in source.fetch_many(&links) {
        match page {
            Ok(markup) => {
                let fields = parse_project(&markup, &config.selectors);
                result.records.push(ProjectRecord { title: fields.title, link, votes: fields.votes });
            }
            Err(e) => {
                warn!(%link, error = %e, "skipping project");
                result.skipped.push(Skipped { link, reason: e.to_string() });
            }
        }
    }

    Ok(result)
}

/// Run one full refresh at `now`.
///
/// History is read before today's rows are appended, so a project is never
/// compared against its own fresh row. When the store is unavailable the
/// refresh still succeeds with every project diffed from zero, and the
/// problem is reported in `diagnostics`.
pub fn refresh(
    source: &impl PageSource,
    store: Option<&mut Store>,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<RefreshOutcome, RefreshError> {
    let start = std::time::Instant::now();
    let mut diagnostics = Vec::new();

    let previous = match &store {
        Some(store) => store.load_latest(),
        None => {
            diagnostics.push("history unavailable, all deltas counted from zero and snapshot not saved".to_string());
            Default::default()
        }
    };

    let scraped = scrape(source, config)?;
    if !scraped.skipped.is_empty() {
        diagnostics.push(format!(
            "{} of {} project pages could not be loaded",
            scraped.skipped.len(),
            scraped.links_found
        ));
    }

    let rows = compute_diff(&scraped.records, &previous, now);

    if let Some(store) = store {
        let captured_at = now.with_timezone(&Local).date_naive();
        let snapshot: Vec<SnapshotRow> = scraped
            .records
            .iter()
            .cloned()
            .map(|record| SnapshotRow::new(record, captured_at))
            .collect();

        if let Err(e) = store.append(&snapshot) {
            warn!(error = %e, "failed to save snapshot");
            diagnostics.push(format!("failed to save snapshot: {e}"));
        }
    }

    info!(projects = rows.len(), skipped = scraped.skipped.len(), "refresh complete");

    Ok(RefreshOutcome {
        rows,
        skipped: scraped.skipped,
        diagnostics,
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}
