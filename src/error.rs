//! Unified error handling for the makler crawler
//!
//! Domain errors live next to the code that raises them (see
//! [`crate::utils::error`]). This module wraps them into a single [`Error`]
//! used at module boundaries, by the HTTP server and by the binary.
//!
//! # Architecture
//!
//! - [`MaklerErrorTrait`] - Common interface implemented by the crate's error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use makler_crawler::error::{Error, MaklerErrorTrait};
//!
//! fn report(err: &Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = ?err.category(), "Run failed, will succeed on retry: {err}");
//!     } else {
//!         tracing::error!(category = ?err.category(), "Fatal error: {err}");
//!     }
//! }
//! ```

use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::utils::error::{
    BrowserError, CrawlError, ExtractError, ParseError, SessionError, SubmitError,
};

/// Common trait for the crate's error types
pub trait MaklerErrorTrait: std::error::Error {
    /// Check if a later run could succeed without a configuration change
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Browser service and downstream API failures
    Network,
    /// Page content did not match the expected structure
    Parsing,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Config => "config",
        }
    }
}

impl MaklerErrorTrait for BrowserError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl MaklerErrorTrait for ExtractError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Browser(_) => true,
            Self::Parse(ParseError::InvalidRule { .. }) => false,
            Self::Parse(_) => true,
            Self::Exhausted { last, .. } => last.is_recoverable(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Browser(_) => ErrorCategory::Network,
            Self::Parse(ParseError::InvalidRule { .. }) => ErrorCategory::Config,
            Self::Parse(_) => ErrorCategory::Parsing,
            Self::Exhausted { last, .. } => last.category(),
        }
    }
}

impl MaklerErrorTrait for CrawlError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Session(SessionError::MissingEndpoint) => false,
            Self::Session(SessionError::Connection { .. }) => true,
            Self::SeedNavigation { .. } | Self::Context(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Session(SessionError::MissingEndpoint) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

/// Unified error type for the makler crawler
#[derive(Error, Debug)]
pub enum Error {
    /// Run-level crawl failures
    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    /// Browser session errors outside of a run
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Listing parsing and extraction rule errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Downstream submission errors
    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl MaklerErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Crawl(e) => e.is_recoverable(),
            Self::Session(SessionError::MissingEndpoint) => false,
            Self::Session(SessionError::Connection { .. }) => true,
            Self::Parse(ParseError::InvalidRule { .. }) => false,
            Self::Parse(_) => true,
            Self::Submit(SubmitError::InvalidUrl(_)) => false,
            Self::Submit(_) => true,
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Crawl(e) => e.category(),
            Self::Session(SessionError::MissingEndpoint) => ErrorCategory::Config,
            Self::Session(_) => ErrorCategory::Network,
            Self::Parse(ParseError::InvalidRule { .. }) => ErrorCategory::Config,
            Self::Parse(_) => ErrorCategory::Parsing,
            Self::Submit(SubmitError::InvalidUrl(_)) => ErrorCategory::Config,
            Self::Submit(_) => ErrorCategory::Network,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
