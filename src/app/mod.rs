//! Core application logic for the cell database fetcher
//!
//! Bottom-up: code filters, the streaming gzip CSV decoder, the staged
//! database builder, provider URLs and the export source seam. The
//! ingestion pipeline joins them per provider; the coordinator runs the
//! pipeline for every enabled provider and publishes the result; the
//! service is the surface a host drives.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cell_db_fetcher::app::{ClientConfig, CoordinatorConfig, DownloadService};
//!
//! # async fn example() -> cell_db_fetcher::Result<()> {
//! let config = CoordinatorConfig::default().with_filters("262", "1,2,3");
//! let service = DownloadService::with_http(config, ClientConfig::default());
//!
//! service.run_once().await;
//! println!("{}", service.log_text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod database;
pub mod decoder;
pub mod filter;
pub mod pipeline;
pub mod providers;
pub mod service;

// Re-export main public API
pub use client::{ClientConfig, HttpSource, ProviderSource, ProviderStream};
pub use coordinator::{
    CancelToken, CoordinatorConfig, DownloadOrchestrator, IngestStats, KeepAwake,
    KeepAwakeGuard, NoopKeepAwake, ProgressLog, ProgressSnapshot, ProviderReport, RunOutcome,
    RunSession, RunState, SignalHandler,
};
pub use database::{DatabaseBuilder, TowerRecord};
pub use decoder::{StreamingCsvDecoder, TowerColumns};
pub use filter::CodeFilter;
pub use pipeline::IngestionPipeline;
pub use providers::{Provider, ProviderSettings};
pub use service::DownloadService;
