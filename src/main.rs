use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use makler_crawler::browser::ChromiumConnector;
use makler_crawler::config::{load_dev_env, Config, DEV_ENV_FILE};
use makler_crawler::crawler::CrawlOrchestrator;
use makler_crawler::logging;
use makler_crawler::server::CrawlServer;

#[derive(Parser)]
#[command(
    name = "makler-crawler",
    version,
    about = "makler.md listing crawler driven by a remote headless browser",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve POST /run and GET /test (default)
    Serve {
        /// Override the listening port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one crawl and print the ingestion response
    Run {
        /// Only process the first N listings
        #[arg(long)]
        max_targets: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dev_env_loaded = load_dev_env(std::path::Path::new(DEV_ENV_FILE))?;
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    let _log_guard = logging::init(&config.logging, cli.verbose)?;

    tracing::info!(mode = ?config.mode, "makler-crawler starting");
    if dev_env_loaded {
        tracing::info!(file = DEV_ENV_FILE, "Loaded development environment file");
    }

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.bind_address.set_port(port);
            }
            config.validate().context("Invalid configuration")?;
            serve(config).await?;
        }

        Commands::Run { max_targets } => {
            if max_targets.is_some() {
                config.crawl.max_targets = max_targets;
            }
            config.validate().context("Invalid configuration")?;
            run_once(config).await?;
        }
    }

    tracing::info!("makler-crawler stopped");
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env().context("Failed to read configuration from environment"),
    }
}

async fn serve(config: Config) -> Result<()> {
    let orchestrator = CrawlOrchestrator::from_config(Arc::new(ChromiumConnector), &config)?;
    let server = CrawlServer::new(Arc::new(orchestrator), config.server.clone());

    server.start_with_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn run_once(config: Config) -> Result<()> {
    let orchestrator = CrawlOrchestrator::from_config(Arc::new(ChromiumConnector), &config)?;
    let result = orchestrator.run().await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
