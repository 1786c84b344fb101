//! Configuration management for the makler crawler
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. The resulting [`Config`] is built once at
//! startup and handed to each component at construction time.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::utils::retry::RetryPolicy;

/// Fixed seller profile whose listings are crawled
pub const DEFAULT_SEED_URL: &str = "https://makler.md/ru/an/user/index/id/1262205";

/// Browser service endpoint used outside development mode
pub const PRODUCTION_ENDPOINT: &str = "ws://browserless:3000";

/// Env file read into the process environment outside production
pub const DEV_ENV_FILE: &str = "dev.env";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing required value: {0}")]
    Missing(String),

    #[error("Failed to load env file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Deployment mode, read from `APP_ENV` (or `NODE_ENV` when unset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Production,
    Development,
    /// Neither value was given; behaves like development for TLS and like
    /// production for endpoint selection
    #[default]
    Unspecified,
}

impl RunMode {
    /// Read the mode from `APP_ENV`, falling back to `NODE_ENV`
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        lookup("APP_ENV")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| lookup("NODE_ENV"))
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// TLS validation for the ingestion API is only enforced in production
    pub fn relax_tls(&self) -> bool {
        !matches!(self, Self::Production)
    }
}

impl FromStr for RunMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "production" => Self::Production,
            "development" => Self::Development,
            _ => Self::Unspecified,
        })
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment mode
    pub mode: RunMode,

    /// Remote browser configuration
    pub browser: BrowserConfig,

    /// Crawl and extraction parameters
    pub crawl: CrawlConfig,

    /// Downstream ingestion API
    pub api: ApiConfig,

    /// HTTP trigger server
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote browser-automation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Endpoint used in development mode (`WS_ENDPOINT`)
    pub ws_endpoint: Option<String>,

    /// Endpoint used in every other mode
    pub production_endpoint: String,

    /// Total connection attempts before giving up
    pub connect_attempts: u32,

    /// Fixed delay between connection attempts in milliseconds
    pub connect_delay_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            ws_endpoint: None,
            production_endpoint: PRODUCTION_ENDPOINT.to_string(),
            connect_attempts: 5,
            connect_delay_ms: 2000,
        }
    }
}

impl BrowserConfig {
    /// Select the service endpoint for the given run mode
    pub fn endpoint(&self, mode: RunMode) -> Option<&str> {
        if mode.is_development() {
            self.ws_endpoint.as_deref().filter(|e| !e.is_empty())
        } else {
            Some(self.production_endpoint.as_str())
        }
    }

    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy::with_delay_ms(self.connect_attempts, self.connect_delay_ms)
    }
}

/// Crawl and extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Profile page listing every target
    pub seed_url: String,

    /// Navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,

    /// Content container wait timeout in milliseconds
    pub content_timeout_ms: u64,

    /// Extraction attempts per URL per context
    pub max_page_attempts: u32,

    /// Delay between extraction attempts in milliseconds
    pub attempt_delay_ms: u64,

    /// Politeness delay between URLs in milliseconds
    pub step_delay_ms: u64,

    /// Index of the metadata span holding the view count
    pub views_span_index: usize,

    /// Pattern whose first capture group is the view count
    pub views_pattern: String,

    /// Process at most this many targets (all when unset)
    pub max_targets: Option<usize>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed_url: DEFAULT_SEED_URL.to_string(),
            navigation_timeout_ms: 8000,
            content_timeout_ms: 3000,
            max_page_attempts: 3,
            attempt_delay_ms: 500,
            step_delay_ms: 100,
            views_span_index: 1,
            views_pattern: r"(\d+)".to_string(),
            max_targets: None,
        }
    }
}

impl CrawlConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn page_policy(&self) -> RetryPolicy {
        RetryPolicy::with_delay_ms(self.max_page_attempts, self.attempt_delay_ms)
    }
}

/// Ingestion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL (`API_BASE`)
    pub base_url: String,

    /// Access token (`API_TOKEN`)
    pub token: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8000"),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable request tracing
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 35001)),
            enable_request_logging: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Console log format (text, json)
    pub format: String,

    /// Directory for the log file; file logging is off when unset
    pub directory: Option<PathBuf>,

    /// Log file name inside `directory`
    pub file_name: String,

    /// Size at which the log file is rotated
    pub max_file_bytes: usize,

    /// Log files kept on disk, the live one included
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
            directory: Some(PathBuf::from("logs")),
            file_name: String::from("parser.log"),
            max_file_bytes: 1024 * 1024,
            max_files: 1,
        }
    }
}

/// Load `path` into the process environment unless running in production
///
/// Variables already present in the environment are kept. Returns whether
/// a file was read; a missing file is not an error.
pub fn load_dev_env(path: &Path) -> Result<bool, ConfigError> {
    if RunMode::from_vars(|key| std::env::var(key).ok()) == RunMode::Production {
        return Ok(false);
    }

    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(ConfigError::EnvFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Result<Option<T>, ConfigError> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => v
                    .trim()
                    .parse::<T>()
                    .map(Some)
                    .map_err(|_| invalid(key, format!("cannot parse '{v}'"))),
                _ => Ok(None),
            }
        }

        let mut config = Self::default();

        config.mode = RunMode::from_vars(&lookup);

        config.browser.ws_endpoint = lookup("WS_ENDPOINT").filter(|v| !v.is_empty());
        if let Some(v) = parsed(&lookup, "MAKLER_CONNECT_ATTEMPTS")? {
            config.browser.connect_attempts = v;
        }
        if let Some(v) = parsed(&lookup, "MAKLER_CONNECT_DELAY_MS")? {
            config.browser.connect_delay_ms = v;
        }

        if let Some(v) = lookup("MAKLER_SEED_URL").filter(|v| !v.is_empty()) {
            config.crawl.seed_url = v;
        }
        if let Some(v) = parsed(&lookup, "MAKLER_PAGE_ATTEMPTS")? {
            config.crawl.max_page_attempts = v;
        }
        if let Some(v) = parsed(&lookup, "MAKLER_STEP_DELAY_MS")? {
            config.crawl.step_delay_ms = v;
        }
        if let Some(v) = parsed(&lookup, "MAKLER_VIEWS_SPAN_INDEX")? {
            config.crawl.views_span_index = v;
        }
        if let Some(v) = lookup("MAKLER_VIEWS_PATTERN").filter(|v| !v.is_empty()) {
            config.crawl.views_pattern = v;
        }
        config.crawl.max_targets = parsed(&lookup, "MAKLER_MAX_TARGETS")?;

        if let Some(v) = lookup("API_BASE") {
            config.api.base_url = v;
        }
        if let Some(v) = lookup("API_TOKEN") {
            config.api.token = v;
        }

        if let Some(port) = parsed::<u16>(&lookup, "PORT")? {
            config.server.bind_address.set_port(port);
        }

        if let Some(v) = lookup("MAKLER_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = lookup("MAKLER_LOG_FORMAT") {
            config.logging.format = v;
        }
        if let Some(v) = lookup("MAKLER_LOG_DIR") {
            config.logging.directory = (!v.is_empty()).then(|| PathBuf::from(v));
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browser.connect_attempts == 0 {
            return Err(invalid("connect_attempts", "must be at least 1"));
        }

        if self.browser.endpoint(self.mode).is_none() {
            return Err(ConfigError::Missing("WS_ENDPOINT".to_string()));
        }

        if self.crawl.max_page_attempts == 0 {
            return Err(invalid("max_page_attempts", "must be at least 1"));
        }

        if self.crawl.navigation_timeout_ms == 0 || self.crawl.content_timeout_ms == 0 {
            return Err(invalid("timeouts", "must be greater than 0"));
        }

        url::Url::parse(&self.crawl.seed_url)
            .map_err(|e| invalid("seed_url", e.to_string()))?;

        regex::Regex::new(&self.crawl.views_pattern)
            .map_err(|e| invalid("views_pattern", e.to_string()))?;

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(invalid("api.base_url", "must start with http:// or https://"));
        }

        Ok(())
    }
}
