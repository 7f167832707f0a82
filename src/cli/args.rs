//! Command-line argument parsing for the cell database fetcher
//!
//! Flags override the configuration file and environment.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::config::AppConfig;

/// Cell DB Fetcher - build an offline cell tower database
#[derive(Parser, Debug)]
#[command(
    name = "cell_db_fetcher",
    version,
    about = "Build an offline cell tower location database",
    long_about = "Downloads the OpenCellID and Mozilla Location Service cell exports, keeps the
towers matching the MCC/MNC filters and publishes them as a single SQLite database."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Download options
    #[command(flatten)]
    pub fetch: FetchArgs,
}

/// Logging and configuration options
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long)]
    pub very_verbose: bool,

    /// Quiet mode - suppress the progress bar and run log
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// What to download and where to put it
#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Output database path
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Comma-separated MCC codes to keep (empty keeps all)
    #[arg(long, value_name = "CODES")]
    pub mcc: Option<String>,

    /// Comma-separated MNC codes to keep (empty keeps all)
    #[arg(long, value_name = "CODES")]
    pub mnc: Option<String>,

    /// OpenCellID API key
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Skip the OpenCellID export
    #[arg(long)]
    pub no_opencellid: bool,

    /// Skip the Mozilla Location Service export
    #[arg(long)]
    pub no_mozilla: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level directive, falling back to `configured` without flags
    pub fn log_level(&self, configured: &str) -> String {
        if self.global.quiet {
            "error".to_string()
        } else if self.global.very_verbose {
            "debug".to_string()
        } else if self.global.verbose {
            "info".to_string()
        } else {
            configured.to_string()
        }
    }

    /// Apply flag overrides on top of a loaded configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        let fetch = &self.fetch;

        if let Some(output) = &fetch.output {
            config.database.output_path = Some(output.clone());
        }
        if let Some(mcc) = &fetch.mcc {
            config.filters.mcc = mcc.clone();
        }
        if let Some(mnc) = &fetch.mnc {
            config.filters.mnc = mnc.clone();
        }
        if let Some(key) = &fetch.api_key {
            config.providers.opencellid_api_key = key.clone();
        }
        if fetch.no_opencellid {
            config.providers.use_opencellid = false;
        }
        if fetch.no_mozilla {
            config.providers.use_mozilla = false;
        }
    }
}
