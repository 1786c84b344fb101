//! Listing page and seed page parsing
//!
//! These functions work on an already rendered DOM and capture nothing
//! beyond their explicit inputs, so they are tested against static HTML.

use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use crate::config::CrawlConfig;
use crate::models::ListingRecord;
use crate::parser::selectors::{
    BODY, CONTAINER, JOB_LINK, LINK, METADATA, METADATA_SPAN, SEED_LINK, TITLE,
};
use crate::utils::error::ParseError;

/// Configurable parts of listing extraction
///
/// Which metadata span holds the view count, and how the count is read
/// from it, differ between page revisions, so both are configuration.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    views_span_index: usize,
    views_pattern: Regex,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            views_span_index: 1,
            views_pattern: Regex::new(r"(\d+)").expect("Invalid default views pattern"),
        }
    }
}

impl ExtractionRules {
    /// # Errors
    ///
    /// Returns `ParseError::InvalidRule` if `views_pattern` does not compile
    pub fn new(views_span_index: usize, views_pattern: &str) -> Result<Self, ParseError> {
        let views_pattern = Regex::new(views_pattern).map_err(|e| ParseError::InvalidRule {
            name: "views_pattern".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            views_span_index,
            views_pattern,
        })
    }

    pub fn from_config(config: &CrawlConfig) -> Result<Self, ParseError> {
        Self::new(config.views_span_index, &config.views_pattern)
    }

    /// Read the view count from a metadata span's text
    ///
    /// Uses the first capture group when the pattern has one, the whole
    /// match otherwise. Anything that does not yield a number is `None`.
    pub fn parse_views(&self, text: &str) -> Option<u64> {
        let caps = self.views_pattern.captures(text)?;
        let matched = caps.get(1).or_else(|| caps.get(0))?;
        let digits: String = matched
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

/// Concatenated text of every descendant text node, as rendered
fn raw_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn trimmed_text(element: ElementRef<'_>) -> String {
    raw_text(element).trim().to_string()
}

/// Parse a rendered listing page into a record
///
/// # Errors
///
/// Returns `ParseError::ContainerNotFound`, `MetadataNotFound` or
/// `BodyNotFound` when a required subtree is missing. A missing or
/// malformed view count is not an error.
pub fn parse_listing(
    document: &Html,
    url: &str,
    rules: &ExtractionRules,
) -> Result<ListingRecord, ParseError> {
    let container = document
        .select(&CONTAINER)
        .next()
        .ok_or(ParseError::ContainerNotFound)?;

    let title = container.select(&TITLE).next().map(trimmed_text);

    let metadata = container
        .select(&METADATA)
        .next()
        .ok_or(ParseError::MetadataNotFound)?;
    let spans: Vec<ElementRef<'_>> = metadata.select(&METADATA_SPAN).collect();

    let city = spans.first().map(|s| trimmed_text(*s));
    let views = spans
        .get(rules.views_span_index)
        .and_then(|s| rules.parse_views(&trimmed_text(*s)));

    let body = container
        .select(&BODY)
        .next()
        .ok_or(ParseError::BodyNotFound)?;

    let target_urls = body
        .select(&LINK)
        .map(raw_text)
        .filter(|text| JOB_LINK.is_match(text))
        .collect::<Vec<_>>()
        .join(",");

    Ok(ListingRecord {
        url: url.to_string(),
        title,
        city,
        views,
        target_urls,
    })
}

/// Collect listing URLs from the seed page in document order
///
/// Relative `href` values are resolved against `base`; elements without a
/// usable `href` are skipped.
pub fn extract_target_links(document: &Html, base: Option<&Url>) -> Vec<String> {
    document
        .select(&SEED_LINK)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| {
            let href = href.trim();
            match base {
                Some(base) => base.join(href).ok(),
                None => Url::parse(href).ok(),
            }
        })
        .map(String::from)
        .collect()
}
