//! Host facade
//!
//! [`DownloadService`] is what an embedding host talks to: start a run,
//! cancel it, read the log and progress. It allows one run at a time.
//! Every run gets a fresh [`RunSession`], so the log and cancellation flag
//! of one run never leak into the next.

use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::app::client::{ClientConfig, HttpSource, ProviderSource};
use crate::app::coordinator::{
    CoordinatorConfig, DownloadOrchestrator, KeepAwake, NoopKeepAwake, ProgressSnapshot,
    RunOutcome, RunSession, RunState,
};
use crate::errors::{CoordinatorError, Result};

/// Single-run download service
pub struct DownloadService {
    config: CoordinatorConfig,
    source: Arc<dyn ProviderSource>,
    keep_awake: Arc<dyn KeepAwake>,
    run_guard: Arc<Mutex<()>>,
    session: RwLock<Arc<RunSession>>,
}

impl DownloadService {
    pub fn new(config: CoordinatorConfig, source: Arc<dyn ProviderSource>) -> Self {
        Self {
            config,
            source,
            keep_awake: Arc::new(NoopKeepAwake),
            run_guard: Arc::new(Mutex::new(())),
            session: RwLock::new(Arc::new(RunSession::new())),
        }
    }

    /// Service fetching over HTTP(S)
    pub fn with_http(config: CoordinatorConfig, client: ClientConfig) -> Self {
        Self::new(config, Arc::new(HttpSource::new(client)))
    }

    pub fn with_keep_awake(mut self, keep_awake: Arc<dyn KeepAwake>) -> Self {
        self.keep_awake = keep_awake;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Build and publish a new database
    ///
    /// # Errors
    ///
    /// `CoordinatorError::AlreadyRunning` if another run is in progress,
    /// otherwise whatever error ended the run.
    ///
    /// The service stays busy until the build itself ends, even if this
    /// future is dropped first. Dropping it cancels the run.
    pub async fn run(&self) -> Result<RunOutcome> {
        let running = Arc::clone(&self.run_guard)
            .try_lock_owned()
            .map_err(|_| CoordinatorError::AlreadyRunning)?;

        let session = Arc::new(RunSession::new());
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&session);
        debug!("Starting download run");

        DownloadOrchestrator::new(self.config.clone(), Arc::clone(&self.source))
            .with_keep_awake(Arc::clone(&self.keep_awake))
            .with_session(session)
            .run_holding(running)
            .await
    }

    /// Run once and drop the result; the log holds what happened
    pub async fn run_once(&self) {
        match self.run().await {
            Ok(outcome) => debug!(completed = outcome.is_completed(), "Download run ended"),
            Err(e) => warn!("Download run failed: {}", e),
        }
    }

    /// Cancel the current run. No effect when idle.
    pub fn cancel(&self) {
        self.current().cancel();
    }

    /// Accumulated log of the current or most recent run
    pub fn log_text(&self) -> String {
        self.current().log().text()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.current().log().snapshot()
    }

    pub fn state(&self) -> RunState {
        self.current().state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Session of the current or most recent run
    pub fn current(&self) -> Arc<RunSession> {
        Arc::clone(&self.session.read().unwrap_or_else(|e| e.into_inner()))
    }
}
