//! Project link discovery on the listing page.
//!
//! Collects every `a[href]`, resolves it against the listing URL and keeps
//! same-origin links under the project path prefix. The listing page
//! itself (`<prefix>list`) is never returned. Output is deduplicated with
//! first-seen order preserved.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

pub fn extract_links(markup: &str, base_url: &Url, path_prefix: &str) -> Vec<String> {
    let mut out = Vec::new();
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return out,
    };

    let doc = Html::parse_document(markup);
    let mut seen = HashSet::new();

    for a in doc.select(&selector) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let Ok(mut url) = base_url.join(href) else {
            continue;
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            continue;
        }
        if url.origin() != base_url.origin() {
            continue;
        }
        if !is_project_path(url.path(), path_prefix) {
            continue;
        }

        url.set_fragment(None);
        let link = url.to_string();
        if seen.insert(link.clone()) {
            out.push(link);
        }
    }

    out
}

/// True for `<prefix><something>` where something is not the listing page.
fn is_project_path(path: &str, prefix: &str) -> bool {
    let Some(rest) = path.strip_prefix(prefix) else {
        return false;
    };
    let rest = rest.trim_end_matches('/');
    !rest.is_empty() && rest != "list"
}
