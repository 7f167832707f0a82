//! Scoped system resources held for the duration of a run
//!
//! Hosts on devices that sleep or drop connectivity plug their wake/network
//! locks in through [`KeepAwake`]. The orchestrator holds a
//! [`KeepAwakeGuard`] for the whole run, so `release` is called exactly once
//! on every exit path, including panics in the ingestion task.

use std::sync::Arc;

use tracing::debug;

/// Resources that keep the device awake and networked
pub trait KeepAwake: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// For hosts with nothing to hold
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopKeepAwake;

impl KeepAwake for NoopKeepAwake {
    fn acquire(&self) {}
    fn release(&self) {}
}

/// Releases the resource when dropped
pub struct KeepAwakeGuard {
    resource: Arc<dyn KeepAwake>,
}

impl KeepAwakeGuard {
    pub fn acquire(resource: Arc<dyn KeepAwake>) -> Self {
        debug!("Acquiring keep-awake resources");
        resource.acquire();
        Self { resource }
    }
}

impl Drop for KeepAwakeGuard {
    fn drop(&mut self) {
        debug!("Releasing keep-awake resources");
        self.resource.release();
    }
}
