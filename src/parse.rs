//! Project page parsing.
//!
//! Pulls the title and the vote count out of a project page. Neither field
//! is allowed to fail: a missing title becomes `UNTITLED`, a missing or
//! digit-free vote element becomes 0.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::record::UNTITLED;

pub const DEFAULT_TITLE_SELECTOR: &str = "p.title";
pub const DEFAULT_VOTES_SELECTOR: &str = "div.took-part-banner_count";

/// Compiled selectors for the two marked elements on a project page.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub title: Selector,
    pub votes: Selector,
}

#[derive(Debug, Error)]
#[error("invalid selector '{selector}': {reason}")]
pub struct SelectorError {
    pub selector: String,
    reason: String,
}

impl Selectors {
    pub fn new(title: &str, votes: &str) -> Result<Self, SelectorError> {
        Ok(Selectors {
            title: compile(title)?,
            votes: compile(votes)?,
        })
    }
}

// scraper's parse error borrows the input, so keep only its message
fn compile(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFields {
    pub title: String,
    pub votes: u64,
}

pub fn parse_project(markup: &str, selectors: &Selectors) -> ProjectFields {
    let doc = Html::parse_document(markup);

    let title = doc
        .select(&selectors.title)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let votes = doc
        .select(&selectors.votes)
        .next()
        .map(|el| digits_to_votes(&element_text(el)))
        .unwrap_or(0);

    ProjectFields { title, votes }
}

/// Keep only the ASCII digits of `text` and read them as one number.
///
/// `"Голосов: 1,234 чел."` reads as 1234. No digits, or more digits than
/// fit in a u64, reads as 0.
pub fn digits_to_votes(text: &str) -> u64 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
