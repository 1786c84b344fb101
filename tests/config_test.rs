//! Tests for config loading from files and the process environment

use std::io::Write;

use makler_crawler::config::{
    load_dev_env, Config, RunMode, DEFAULT_SEED_URL, PRODUCTION_ENDPOINT,
};
use serial_test::serial;
use tempfile::{tempdir, NamedTempFile};

const ENV_KEYS: &[&str] = &[
    "APP_ENV",
    "NODE_ENV",
    "WS_ENDPOINT",
    "API_BASE",
    "API_TOKEN",
    "PORT",
    "MAKLER_MAX_TARGETS",
    "MAKLER_STEP_DELAY_MS",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
fn test_example_config_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");
    let config = Config::from_file(&path).expect("config.example.toml should parse");

    assert_eq!(config.mode, RunMode::Development);
    assert_eq!(config.browser.endpoint(config.mode), Some("ws://localhost:3000"));
    assert_eq!(config.crawl.seed_url, DEFAULT_SEED_URL);
    assert_eq!(config.crawl.views_pattern, r"(\d+)");
    assert_eq!(config.crawl.max_targets, None);
    assert_eq!(config.server.bind_address.port(), 35001);
    assert_eq!(config.logging.file_name, "parser.log");
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
mode = "production"

[crawl]
max_targets = 3
views_span_index = 2
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.mode, RunMode::Production);
    assert_eq!(config.browser.endpoint(config.mode), Some(PRODUCTION_ENDPOINT));
    assert_eq!(config.crawl.max_targets, Some(3));
    assert_eq!(config.crawl.views_span_index, 2);
    assert_eq!(config.crawl.max_page_attempts, 3);
    assert_eq!(config.browser.connect_attempts, 5);
}

#[test]
fn test_invalid_file_reports_path() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[crawl]\nmax_page_attempts = \"three\"").unwrap();

    let err = Config::from_file(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains(&file.path().display().to_string()));
}

#[test]
fn test_missing_file() {
    assert!(Config::from_file(std::path::Path::new("/nonexistent/makler.toml")).is_err());
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.mode, RunMode::Unspecified);
    assert_eq!(config.browser.endpoint(config.mode), Some(PRODUCTION_ENDPOINT));
    assert!(config.mode.relax_tls());
    assert_eq!(config.server.bind_address.port(), 35001);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("APP_ENV", "development");
    std::env::set_var("WS_ENDPOINT", "ws://127.0.0.1:9222/devtools/browser/abc");
    std::env::set_var("API_BASE", "https://ingest.example.md");
    std::env::set_var("API_TOKEN", "t0ken");
    std::env::set_var("PORT", "40000");
    std::env::set_var("MAKLER_MAX_TARGETS", "2");
    std::env::set_var("MAKLER_STEP_DELAY_MS", "0");

    let config = Config::from_env().unwrap();
    clear_env();

    assert!(config.mode.is_development());
    assert_eq!(
        config.browser.endpoint(config.mode),
        Some("ws://127.0.0.1:9222/devtools/browser/abc")
    );
    assert_eq!(config.api.base_url, "https://ingest.example.md");
    assert_eq!(config.api.token, "t0ken");
    assert_eq!(config.server.bind_address.port(), 40000);
    assert_eq!(config.crawl.max_targets, Some(2));
    assert_eq!(config.crawl.step_delay_ms, 0);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_development_without_endpoint_is_invalid() {
    clear_env();
    std::env::set_var("APP_ENV", "development");

    let config = Config::from_env().unwrap();
    clear_env();

    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_production_enforces_tls() {
    clear_env();
    std::env::set_var("APP_ENV", "production");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.mode, RunMode::Production);
    assert!(!config.mode.relax_tls());
}

#[test]
#[serial]
fn test_node_env_production_enforces_tls() {
    clear_env();
    std::env::set_var("NODE_ENV", "production");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.mode, RunMode::Production);
    assert!(!config.mode.relax_tls());
}

#[test]
#[serial]
fn test_dev_env_file_feeds_development_run() {
    clear_env();
    std::env::set_var("APP_ENV", "development");
    std::env::set_var("API_TOKEN", "from-process");
    let dir = tempdir().unwrap();
    let path = dir.path().join("dev.env");
    std::fs::write(
        &path,
        "WS_ENDPOINT=ws://localhost:3000\nAPI_BASE=https://ingest.example.md\nAPI_TOKEN=from-file\n",
    )
    .unwrap();

    let loaded = load_dev_env(&path).unwrap();
    let config = Config::from_env().unwrap();
    clear_env();

    assert!(loaded);
    assert_eq!(config.browser.endpoint(config.mode), Some("ws://localhost:3000"));
    assert_eq!(config.api.base_url, "https://ingest.example.md");
    // Variables already in the environment take precedence
    assert_eq!(config.api.token, "from-process");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_dev_env_file_ignored_in_production() {
    clear_env();
    std::env::set_var("APP_ENV", "production");
    let dir = tempdir().unwrap();
    let path = dir.path().join("dev.env");
    std::fs::write(&path, "WS_ENDPOINT=ws://localhost:3000\n").unwrap();

    let loaded = load_dev_env(&path).unwrap();
    let endpoint = std::env::var("WS_ENDPOINT");
    clear_env();

    assert!(!loaded);
    assert!(endpoint.is_err());
}

#[test]
#[serial]
fn test_missing_dev_env_file_is_not_an_error() {
    clear_env();
    let dir = tempdir().unwrap();

    let loaded = load_dev_env(&dir.path().join("dev.env")).unwrap();

    assert!(!loaded);
}
