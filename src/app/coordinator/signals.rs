//! Cooperative cancellation and OS signal handling
//!
//! A [`CancelToken`] is a shared flag. The ingestion loop checks it before
//! each row and each provider; nothing is interrupted mid-row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs a cancel action on Ctrl+C or SIGTERM
pub struct SignalHandler {
    on_signal: Arc<dyn Fn() + Send + Sync>,
}

impl SignalHandler {
    /// Call `on_signal` when a termination signal arrives
    pub fn new(on_signal: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            on_signal: Arc::new(on_signal),
        }
    }

    /// Cancel `token` when a termination signal arrives
    pub fn for_token(token: CancelToken) -> Self {
        Self::new(move || token.cancel())
    }

    /// Spawn the task that waits for a termination signal
    pub fn setup(&self) -> JoinHandle<()> {
        let on_signal = Arc::clone(&self.on_signal);

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, cancelling download");
                },
                _ = terminate => {
                    info!("Received terminate signal, cancelling download");
                },
            }

            on_signal();
        })
    }
}
