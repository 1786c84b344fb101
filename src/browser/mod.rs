//! Remote browser abstraction
//!
//! The crawler only talks to these traits. [`chromium`] implements them on
//! top of a remote Chrome DevTools endpoint; tests provide scripted fakes.
//!
//! ```text
//! Connector ──connect──▶ Session ──open_context(filter)──▶ NavigationContext
//! ```
//!
//! A context is always opened together with its [`ResourceFilter`], so no
//! navigation can happen before the filter is in place.

pub mod chromium;
pub mod filter;
pub mod session;

use async_trait::async_trait;
use std::time::Duration;

use crate::utils::error::BrowserError;

pub use chromium::ChromiumConnector;
pub use filter::{FilterDecision, ResourceFilter, ResourceKind};
pub use session::SessionManager;

/// Opens sessions against a browser-automation endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Session>, BrowserError>;
}

/// An exclusively owned connection to the automation service
#[async_trait]
pub trait Session: Send + Sync {
    /// Open a new browsing surface with `filter` installed
    async fn open_context(
        &self,
        filter: &ResourceFilter,
    ) -> Result<Box<dyn NavigationContext>, BrowserError>;

    /// Close the session and everything opened through it
    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// A single browsing surface inside a session
#[async_trait]
pub trait NavigationContext: Send + Sync {
    /// Navigate and wait until the document is no longer loading
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Wait until an element matching `selector` is present
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Serialized DOM of the current document
    async fn content(&self) -> Result<String, BrowserError>;

    /// URL of the current document, when known
    async fn current_url(&self) -> Option<String>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}
