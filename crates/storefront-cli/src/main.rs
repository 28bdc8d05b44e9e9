//! Storefront CLI - browse products, manage a cart and an account
//! against the storefront REST backend.

mod cli;
mod commands;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_core::Config;

use cli::Cli;

/// Log file written in the cache directory when `log_to_file` is set
const LOG_FILE: &str = "storefront.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so buffered file logs get flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load config")?;

    let log_dir = if config.log_to_file {
        let dir = config.cache_dir()?;
        std::fs::create_dir_all(&dir).context("Failed to create cache directory")?;
        Some(dir)
    } else {
        None
    };
    let _guard = init_tracing(log_dir.as_deref());
    info!(base_url = %config.api_base_url(), "Storefront starting");

    commands::dispatch(cli, config).await
}
