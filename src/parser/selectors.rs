//! CSS selectors and patterns for makler.md pages
//!
//! Selectors for the seed profile page and for listing detail pages. They
//! are fixed for the single supported site and parsed once.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// Raw selector of the element the browser waits for before parsing
pub const CONTENT_CONTAINER: &str = "#contentWrapper";

lazy_static! {
    /// Listing links on the seller profile page
    pub static ref SEED_LINK: Selector = parse_selector!(".ls-detail_anUrl");

    /// Main listing-detail subtree
    pub static ref CONTAINER: Selector = parse_selector!("#contentWrapper");

    pub static ref TITLE: Selector = parse_selector!("h1");

    /// Block of labelled metadata spans (city, views)
    pub static ref METADATA: Selector = parse_selector!(".item_title_info");

    pub static ref METADATA_SPAN: Selector = parse_selector!("span");

    /// Free-text listing body
    pub static ref BODY: Selector = parse_selector!("#anText");

    pub static ref LINK: Selector = parse_selector!("a");

    /// External job-posting links kept in `target_urls`
    pub static ref JOB_LINK: Regex =
        Regex::new(r"https://job\.hi-tech\.md/job/").expect("Invalid job link pattern");
}
