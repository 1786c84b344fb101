//! Error types for the makler crawler
//!
//! This module defines the domain error types used by the browser layer,
//! the listing parser, the crawler and the result sink.

use thiserror::Error;

/// Message fragments that mark a navigation context as permanently lost
const CONTEXT_LOSS_SIGNATURES: &[&str] = &[
    "target closed",
    "session closed",
    "execution context was destroyed",
    "detached",
    "no target with given id",
    "context was lost",
    "channel closed",
];

/// Check whether an error message carries a context-loss signature
pub fn is_context_loss_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    CONTEXT_LOSS_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

/// Errors reported by the remote browser layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    /// Could not open a connection to the automation service
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The navigation context became unusable and must be replaced
    #[error("Navigation context lost: {0}")]
    ContextLost(String),

    /// Navigation was rejected by the browser
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// A bounded wait expired
    #[error("Timed out after {after_ms}ms waiting for {what}")]
    Timeout { what: String, after_ms: u64 },

    /// Any other protocol-level failure
    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

impl BrowserError {
    /// Build a protocol error, promoting it to `ContextLost` when the
    /// message carries a context-loss signature
    pub fn from_protocol(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_context_loss_message(&message) {
            Self::ContextLost(message)
        } else {
            Self::Protocol(message)
        }
    }

    /// Whether the context is gone
    ///
    /// Only the browser-reported reason is inspected; the URL and the wait
    /// description never are. Timeouts are never context loss on their own.
    pub fn is_context_loss(&self) -> bool {
        match self {
            Self::ContextLost(_) => true,
            Self::Navigation { reason, .. } => is_context_loss_message(reason),
            Self::Protocol(message) => is_context_loss_message(message),
            Self::Connect(_) | Self::Timeout { .. } => false,
        }
    }
}

/// Errors that can occur while parsing a listing page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The main content container is missing
    #[error("Content container not found")]
    ContainerNotFound,

    /// The labelled metadata block is missing
    #[error("Listing metadata block not found")]
    MetadataNotFound,

    /// The listing body is missing
    #[error("Listing body not found")]
    BodyNotFound,

    /// A configured selector or pattern does not compile
    #[error("Invalid extraction rule {name}: {reason}")]
    InvalidRule { name: String, reason: String },
}

/// Errors that can occur while extracting one listing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Browser failure during navigation or waiting
    #[error("{0}")]
    Browser(#[from] BrowserError),

    /// Page loaded but could not be parsed
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Every attempt on this context failed
    #[error("Extraction of {url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<ExtractError>,
    },
}

impl ExtractError {
    /// Whether this failure means the context itself is gone
    pub fn is_context_loss(&self) -> bool {
        match self {
            Self::Browser(e) => e.is_context_loss(),
            Self::Parse(_) => false,
            Self::Exhausted { last, .. } => last.is_context_loss(),
        }
    }
}

/// Errors that can occur while acquiring a browser session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// All connection attempts failed
    #[error("Failed to connect to browser service at {endpoint} after {attempts} attempts: {last}")]
    Connection {
        endpoint: String,
        attempts: u32,
        last: BrowserError,
    },

    /// No endpoint is configured for the current run mode
    #[error("No browser endpoint configured (set WS_ENDPOINT in development mode)")]
    MissingEndpoint,
}

/// Run-level crawl errors
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Session could not be acquired
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The seed page could not be loaded or read
    #[error("Seed page {url} could not be loaded: {source}")]
    SeedNavigation {
        url: String,
        #[source]
        source: BrowserError,
    },

    /// The shared navigation context could not be opened
    #[error("Failed to open navigation context: {0}")]
    Context(BrowserError),
}

/// Errors that can occur while submitting a batch downstream
#[derive(Error, Debug)]
pub enum SubmitError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the ingestion API
    #[error("Ingestion API returned status {0}")]
    Status(u16),

    /// Invalid endpoint URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
