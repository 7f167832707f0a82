//! Cell DB Fetcher CLI application
//!
//! Builds the offline cell tower database once and prints the run log.

use std::process;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use cell_db_fetcher::app::{DownloadService, RunOutcome, SignalHandler};
use cell_db_fetcher::cli::{Cli, ProgressConfig, ProgressDisplay};
use cell_db_fetcher::config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let mut config = AppConfig::load(cli.global.config.clone())
        .await
        .context("Failed to load configuration")?;
    cli.apply_to(&mut config);

    init_logging(&cli, &config)?;
    info!("Cell DB Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let (coordinator, client) = config.to_runtime_config();
    coordinator.validate()?;
    let output_path = coordinator.output_path.clone();

    let service = Arc::new(DownloadService::with_http(coordinator, client));

    let signals = {
        let service = Arc::clone(&service);
        SignalHandler::new(move || service.cancel()).setup()
    };
    let progress_config = ProgressConfig {
        enable_progress_bar: !cli.global.quiet,
        ..Default::default()
    };
    let display = ProgressDisplay::start(Arc::clone(&service), &progress_config)?;

    let result = service.run().await;

    if let Some(display) = display {
        display.finish();
    }
    signals.abort();

    if !cli.global.quiet {
        print!("{}", service.log_text());
    }

    match result? {
        RunOutcome::Completed { .. } => {
            println!("Database written to {}", output_path.display());
        }
        RunOutcome::Cancelled { .. } => {
            println!("Cancelled, {} left unchanged", output_path.display());
        }
    }
    Ok(())
}

/// Initialize logging based on CLI verbosity and the configured level
fn init_logging(cli: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let log_level = cli.log_level(&config.logging.level);

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("cell_db_fetcher={}", log_level).parse()?);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
    Ok(())
}
