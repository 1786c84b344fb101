//! Tracing subscriber setup
//!
//! Console output (text or JSON) plus an optional plain-text log file,
//! `logs/parser.log` by default, rotated by size. `RUST_LOG` overrides the
//! configured level.

use anyhow::{Context, Result};
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use std::path::Path;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Anything other than `json` falls back to text
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Filter directives used when `RUST_LOG` is not set
pub fn default_directives(level: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { level.trim() };
    format!("makler_crawler={level},tower_http={level},warn")
}

/// Size-capped writer for the log file
///
/// The live file never grows past `max_file_bytes`. Rotated copies beyond
/// `max_files - 1` are deleted, so `max_files = 1` keeps only the live file.
pub fn file_writer(dir: &Path, config: &LoggingConfig) -> FileRotate<AppendCount> {
    FileRotate::new(
        dir.join(&config.file_name),
        AppendCount::new(config.max_files.saturating_sub(1)),
        ContentLimit::Bytes(config.max_file_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    )
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
///
/// # Errors
///
/// Fails if the log directory cannot be created or a subscriber is
/// already installed.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&config.level, verbose)))
        .context("Invalid log filter")?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let (writer, guard) = non_blocking(file_writer(dir, config));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let (text_layer, json_layer) = match LogFormat::parse(&config.format) {
        LogFormat::Json => (None, Some(fmt::layer().json())),
        LogFormat::Text => (Some(fmt::layer()), None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
