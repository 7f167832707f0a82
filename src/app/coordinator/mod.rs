//! Download orchestration
//!
//! [`DownloadOrchestrator`] drives one database build: it stages a new
//! database next to the output path, ingests each enabled provider in order,
//! then either indexes and publishes the result or throws it away. The
//! output path only ever holds the previous database or a complete new one.
//!
//! The sequential body runs on a single blocking task. The caller awaits
//! [`DownloadOrchestrator::run`] and can watch the [`RunSession`] log and
//! cancel through it while the task runs.
//!
//! - [`config`] - run configuration and validation
//! - [`progress`] - host-visible log and progress state
//! - [`signals`] - cancellation token and OS signal bridge
//! - [`resources`] - keep-awake resources held for the run
//! - [`stats`] - ingestion statistics and run outcomes
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cell_db_fetcher::app::{CoordinatorConfig, DownloadOrchestrator, HttpSource};
//!
//! # async fn example() -> cell_db_fetcher::Result<()> {
//! let config = CoordinatorConfig::default()
//!     .with_output_path("/tmp/cells/new_lacells.db")
//!     .with_filters("262", "");
//!
//! let orchestrator = DownloadOrchestrator::new(config, Arc::new(HttpSource::default()));
//! let outcome = orchestrator.run().await?;
//! println!("Inserted {} towers", outcome.records_inserted());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod progress;
pub mod resources;
pub mod signals;
pub mod stats;

#[cfg(test)]
mod tests;

use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::app::client::ProviderSource;
use crate::app::database::DatabaseBuilder;
use crate::app::filter::CodeFilter;
use crate::app::pipeline::IngestionPipeline;
use crate::errors::{AppError, CoordinatorError, Result};

pub use config::CoordinatorConfig;
pub use progress::{ProgressLog, ProgressSnapshot};
pub use resources::{KeepAwake, KeepAwakeGuard, NoopKeepAwake};
pub use signals::{CancelToken, SignalHandler};
pub use stats::{IngestStats, ProviderReport, RunOutcome, RunState};

/// Log, cancellation flag and state of one run, shared with the host
#[derive(Debug, Default)]
pub struct RunSession {
    log: ProgressLog,
    cancel: CancelToken,
    state: RwLock<RunState>,
}

impl RunSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Ask the run to stop at the next row or provider boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> RunState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: RunState) {
        debug!("Run state: {}", state);
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

/// Builds and publishes one tower database
pub struct DownloadOrchestrator {
    config: CoordinatorConfig,
    source: Arc<dyn ProviderSource>,
    keep_awake: Arc<dyn KeepAwake>,
    session: Arc<RunSession>,
}

impl DownloadOrchestrator {
    pub fn new(config: CoordinatorConfig, source: Arc<dyn ProviderSource>) -> Self {
        Self {
            config,
            source,
            keep_awake: Arc::new(NoopKeepAwake),
            session: Arc::new(RunSession::new()),
        }
    }

    /// Hold `keep_awake` for the duration of the run
    pub fn with_keep_awake(mut self, keep_awake: Arc<dyn KeepAwake>) -> Self {
        self.keep_awake = keep_awake;
        self
    }

    /// Report into an existing session instead of a private one
    pub fn with_session(mut self, session: Arc<RunSession>) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &Arc<RunSession> {
        &self.session
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run the build to completion, cancellation or failure
    ///
    /// Keep-awake resources are held until the build ends. On cancellation
    /// the staged database is discarded and `Ok(RunOutcome::Cancelled)`
    /// returned.
    ///
    /// # Errors
    ///
    /// Any configuration, network, decode or storage error. The staged
    /// database is discarded and the output path is left untouched.
    pub async fn run(&self) -> Result<RunOutcome> {
        self.run_holding(()).await
    }

    /// [`run`](Self::run), keeping `held` alive until the build finishes
    ///
    /// `held` and the keep-awake guard move into the blocking task, so they
    /// are released when the work ends, not when the caller stops waiting.
    /// Dropping the returned future cancels the run; the staged database is
    /// then discarded instead of published.
    pub async fn run_holding<H: Send + 'static>(&self, held: H) -> Result<RunOutcome> {
        let keep_awake = KeepAwakeGuard::acquire(Arc::clone(&self.keep_awake));
        self.session.set_state(RunState::Running);

        let config = self.config.clone();
        let source = Arc::clone(&self.source);
        let session = Arc::clone(&self.session);

        let task = tokio::task::spawn_blocking(move || {
            let result = run_logged(&config, source.as_ref(), &session);
            session.set_state(final_state(&result));
            drop(keep_awake);
            drop(held);
            result
        });

        let mut abandon = CancelOnDrop::new(Arc::clone(&self.session));
        let joined = task.await;
        abandon.disarm();

        match joined {
            Ok(result) => result,
            Err(e) => {
                let error = AppError::from(CoordinatorError::TaskFailed {
                    reason: e.to_string(),
                });
                self.session
                    .log()
                    .fail(format!("{}: {}", error.category(), error));
                self.session.set_state(RunState::Failed);
                Err(error)
            }
        }
    }
}

/// Cancels the session if the awaiting caller goes away
struct CancelOnDrop {
    session: Option<Arc<RunSession>>,
}

impl CancelOnDrop {
    fn new(session: Arc<RunSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn disarm(&mut self) {
        self.session = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            warn!("Caller stopped waiting for the run, cancelling");
            session.cancel();
        }
    }
}

fn final_state(result: &Result<RunOutcome>) -> RunState {
    match result {
        Ok(RunOutcome::Completed { .. }) => RunState::Completed,
        Ok(RunOutcome::Cancelled { .. }) => RunState::Cancelled,
        Err(_) => RunState::Failed,
    }
}

/// Run the build and write the failure and run summary lines
fn run_logged(
    config: &CoordinatorConfig,
    source: &dyn ProviderSource,
    session: &RunSession,
) -> Result<RunOutcome> {
    let started = Instant::now();
    let log = session.log();
    log.clear();

    let result = build_database(config, source, session, started);

    if let Err(e) = &result {
        log.fail(format!("{}: {}", e.category(), e));
    }
    log.info(format!("Total run time: {} ms", started.elapsed().as_millis()));
    log.info("Finished");

    result
}

fn build_database(
    config: &CoordinatorConfig,
    source: &dyn ProviderSource,
    session: &RunSession,
    started: Instant,
) -> Result<RunOutcome> {
    config.validate()?;

    let log = session.log();
    let cancel = session.cancel_token();

    let mcc = config.mcc();
    let mnc = config.mnc();
    log_filter(log, "MCC", &config.mcc_filter, &mcc);
    log_filter(log, "MNC", &config.mnc_filter, &mnc);

    let mut builder = DatabaseBuilder::open_new(config.output_dir())?;
    let pipeline = IngestionPipeline::new(source, &mcc, &mnc, log, cancel)
        .with_batch_size(config.batch_size)
        .with_progress_interval(config.progress_interval);

    let providers = match ingest_providers(config, &pipeline, cancel, log, &mut builder) {
        Ok(providers) => providers,
        Err(e) => {
            builder.discard();
            return Err(e);
        }
    };

    if cancel.is_cancelled() {
        builder.discard();
        log.warn("Download cancelled, no database published");
        return Ok(RunOutcome::Cancelled {
            providers,
            elapsed: started.elapsed(),
        });
    }

    log.progress(Some(100), "Creating indices");
    if let Err(e) = builder.create_index() {
        builder.discard();
        return Err(e.into());
    }
    builder.publish(&config.output_path)?;
    log.info(format!("Database written to {}", config.output_path.display()));

    Ok(RunOutcome::Completed {
        providers,
        elapsed: started.elapsed(),
    })
}

fn ingest_providers(
    config: &CoordinatorConfig,
    pipeline: &IngestionPipeline<'_>,
    cancel: &CancelToken,
    log: &ProgressLog,
    builder: &mut DatabaseBuilder,
) -> Result<Vec<ProviderReport>> {
    builder.create_schema()?;

    let mut reports = Vec::new();
    for provider in config.providers.enabled() {
        if cancel.is_cancelled() {
            break;
        }

        log.info(format!("Getting {} data", provider));
        let url = config.providers.url_for(provider, Utc::now())?;
        let stats = pipeline.ingest(&url, builder)?;
        info!(
            provider = %provider,
            read = stats.records_read,
            inserted = stats.records_inserted,
            "Provider ingested"
        );
        reports.push(ProviderReport { provider, stats });
    }

    Ok(reports)
}

fn log_filter(log: &ProgressLog, name: &str, raw: &str, filter: &CodeFilter) {
    if filter.is_restrictive() {
        let codes: Vec<String> = filter.enabled_codes().map(|c| c.to_string()).collect();
        log.info(format!("{} filter: {}", name, codes.join(",")));
        return;
    }

    if !raw.trim().is_empty() {
        log.warn(format!(
            "{} filter \"{}\" has no valid code, accepting all codes",
            name, raw
        ));
    }
    log.info(format!("{} filter: none (all codes)", name));
}
