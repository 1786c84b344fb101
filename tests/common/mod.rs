//! Common test utilities
//!
//! A scripted in-memory browser implementing the crawler's browser traits,
//! a recording result sink, and page fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use makler_crawler::browser::{Connector, NavigationContext, ResourceFilter, Session};
use makler_crawler::config::CrawlConfig;
use makler_crawler::models::ListingRecord;
use makler_crawler::sink::ResultSink;
use makler_crawler::utils::error::BrowserError;

pub const SEED_URL: &str = "https://makler.md/ru/an/user/index/id/1262205";

/// Absolute URL of the n-th fixture listing
pub fn listing_url(n: usize) -> String {
    format!("https://makler.md/ru/an/{n}")
}

/// Seed page linking to `/ru/an/1` .. `/ru/an/{count}` in order
pub fn seed_html(count: usize) -> String {
    let links: String = (1..=count)
        .map(|n| {
            format!(r#"<li><a class="ls-detail_anUrl" href="/ru/an/{n}">Listing {n}</a></li>"#)
        })
        .collect();
    format!("<html><body><ul>{links}</ul></body></html>")
}

/// Listing detail page with title, city, view count and one job link
pub fn listing_html(n: usize) -> String {
    format!(
        r#"<html><body><div id="contentWrapper">
            <h1>Listing {n}</h1>
            <div class="item_title_info"><span>Кишинёв</span><span>{views}</span></div>
            <div id="anText">
                <a href="https://job.hi-tech.md/job/{n}">https://job.hi-tech.md/job/{n}</a>
            </div>
        </div></body></html>"#,
        views = n * 10
    )
}

/// Crawl settings with the default timings and the fixture seed URL
pub fn crawl_config() -> CrawlConfig {
    CrawlConfig {
        seed_url: SEED_URL.to_string(),
        ..CrawlConfig::default()
    }
}

/// Crawl settings without any delays, for tests on the real clock
pub fn fast_crawl_config() -> CrawlConfig {
    CrawlConfig {
        attempt_delay_ms: 0,
        step_delay_ms: 0,
        ..crawl_config()
    }
}

// ============================================================================
// Fake browser
// ============================================================================

/// Injected failure for a single navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The context dies; this and every later call on it fails
    ContextLoss,
    /// Navigation times out; the context stays usable
    Transient,
}

/// Observable browser activity, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect,
    OpenContext { id: usize, filter: ResourceFilter },
    Navigate { id: usize, url: String },
    CloseContext { id: usize },
    CloseSession,
}

#[derive(Default)]
struct BrowserState {
    connect_failures: u32,
    open_failures: u32,
    pages: HashMap<String, String>,
    faults: HashMap<String, VecDeque<Fault>>,
    lost: Vec<usize>,
    next_id: usize,
    events: Vec<Event>,
}

/// Shared handle to the scripted browser
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed page with `count` listings, each of which loads fine
    pub fn with_listings(count: usize) -> Self {
        let browser = Self::new();
        browser.add_page(SEED_URL, seed_html(count));
        for n in 1..=count {
            browser.add_page(&listing_url(n), listing_html(n));
        }
        browser
    }

    pub fn add_page(&self, url: &str, html: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), html.into());
    }

    /// Queue faults consumed by successive navigations to `url`
    pub fn fail_navigation(&self, url: &str, faults: &[Fault]) {
        self.state
            .lock()
            .unwrap()
            .faults
            .entry(url.to_string())
            .or_default()
            .extend(faults.iter().copied());
    }

    /// Refuse the next `n` connection attempts
    pub fn fail_connects(&self, n: u32) {
        self.state.lock().unwrap().connect_failures = n;
    }

    /// Refuse the next `n` context openings
    pub fn fail_open_context(&self, n: u32) {
        self.state.lock().unwrap().open_failures = n;
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(FakeConnector {
            browser: self.clone(),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn connect_count(&self) -> usize {
        self.count(|e| matches!(e, Event::Connect))
    }

    pub fn navigations(&self) -> Vec<(usize, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Navigate { id, url } => Some((id, url)),
                _ => None,
            })
            .collect()
    }

    /// Ids of contexts opened, in order
    pub fn opened(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::OpenContext { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::CloseContext { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.state.lock().unwrap().events.push(event);
    }

    fn is_lost(&self, id: usize) -> bool {
        self.state.lock().unwrap().lost.contains(&id)
    }
}

struct FakeConnector {
    browser: FakeBrowser,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Session>, BrowserError> {
        self.browser.record(Event::Connect);

        let mut state = self.browser.state.lock().unwrap();
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(BrowserError::Connect(format!("{endpoint}: connection refused")));
        }

        Ok(Box::new(FakeSession {
            browser: self.browser.clone(),
        }))
    }
}

struct FakeSession {
    browser: FakeBrowser,
}

#[async_trait]
impl Session for FakeSession {
    async fn open_context(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Box<dyn NavigationContext>, BrowserError> {
        let id = {
            let mut state = self.browser.state.lock().unwrap();
            if state.open_failures > 0 {
                state.open_failures -= 1;
                return Err(BrowserError::Protocol("could not create target".to_string()));
            }
            state.next_id += 1;
            state.next_id
        };

        self.browser.record(Event::OpenContext {
            id,
            filter: filter.clone(),
        });

        Ok(Box::new(FakeContext {
            id,
            browser: self.browser.clone(),
            current: Mutex::new(None),
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.browser.record(Event::CloseSession);
        Ok(())
    }
}

struct FakeContext {
    id: usize,
    browser: FakeBrowser,
    current: Mutex<Option<String>>,
}

impl FakeContext {
    fn ensure_alive(&self) -> Result<(), BrowserError> {
        if self.browser.is_lost(self.id) {
            Err(BrowserError::from_protocol("Target closed"))
        } else {
            Ok(())
        }
    }

    fn current_html(&self) -> Option<String> {
        let url = self.current.lock().unwrap().clone()?;
        self.browser.state.lock().unwrap().pages.get(&url).cloned()
    }
}

#[async_trait]
impl NavigationContext for FakeContext {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.browser.record(Event::Navigate {
            id: self.id,
            url: url.to_string(),
        });
        self.ensure_alive()?;

        let fault = {
            let mut state = self.browser.state.lock().unwrap();
            let fault = state.faults.get_mut(url).and_then(|q| q.pop_front());
            if fault == Some(Fault::ContextLoss) {
                state.lost.push(self.id);
            }
            fault
        };

        match fault {
            Some(Fault::ContextLoss) => Err(BrowserError::from_protocol(
                "Protocol error (Page.navigate): Target closed",
            )),
            Some(Fault::Transient) => Err(BrowserError::Timeout {
                what: format!("navigation to {url}"),
                after_ms: timeout.as_millis() as u64,
            }),
            None => {
                let known = self.browser.state.lock().unwrap().pages.contains_key(url);
                if !known {
                    return Err(BrowserError::Navigation {
                        url: url.to_string(),
                        reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
                    });
                }
                *self.current.lock().unwrap() = Some(url.to_string());
                Ok(())
            }
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.ensure_alive()?;

        let id = selector.trim_start_matches('#');
        match self.current_html() {
            Some(html) if html.contains(&format!(r#"id="{id}""#)) => Ok(()),
            _ => Err(BrowserError::Timeout {
                what: selector.to_string(),
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.ensure_alive()?;
        Ok(self.current_html().unwrap_or_default())
    }

    async fn current_url(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.browser.record(Event::CloseContext { id: self.id });
        Ok(())
    }
}

// ============================================================================
// Recording sink
// ============================================================================

/// Result sink that remembers every submitted batch
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<ListingRecord>>>,
    response: Option<Value>,
}

impl RecordingSink {
    pub fn responding(response: Value) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            response: Some(response),
        }
    }

    pub fn batches(&self) -> Vec<Vec<ListingRecord>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn submit(&self, records: &[ListingRecord]) -> Option<Value> {
        self.batches.lock().unwrap().push(records.to_vec());
        self.response.clone()
    }
}
