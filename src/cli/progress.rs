//! Terminal progress bar for a download run
//!
//! The bar polls the service's progress state; the run itself knows nothing
//! about the terminal.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::DownloadService;

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Show a progress bar at all
    pub enable_progress_bar: bool,
    /// How often to poll the service
    pub update_interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bar: true,
            update_interval: Duration::from_millis(100),
        }
    }
}

/// Live progress bar driven by a polling task
pub struct ProgressDisplay {
    bar: ProgressBar,
    update_task: JoinHandle<()>,
}

impl ProgressDisplay {
    /// Start polling `service`
    ///
    /// Returns `None` when disabled or when stderr is not a terminal.
    pub fn start(
        service: Arc<DownloadService>,
        config: &ProgressConfig,
    ) -> anyhow::Result<Option<Self>> {
        if !config.enable_progress_bar || !atty::is(atty::Stream::Stderr) {
            debug!("Progress bar disabled");
            return Ok(None);
        }

        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
                .progress_chars("##-"),
        );
        bar.set_message("Starting");

        let update_interval = config.update_interval;
        let polled = bar.clone();
        let update_task = tokio::spawn(async move {
            loop {
                let snapshot = service.progress();
                polled.set_position(u64::from(snapshot.percent));
                if let Some(message) = snapshot.message {
                    polled.set_message(message);
                }
                tokio::time::sleep(update_interval).await;
            }
        });

        Ok(Some(Self { bar, update_task }))
    }

    /// Stop polling and clear the bar
    pub fn finish(self) {
        self.update_task.abort();
        self.bar.finish_and_clear();
    }
}
