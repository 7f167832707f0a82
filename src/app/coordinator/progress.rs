//! Host-visible run log and progress state
//!
//! Informational, warning and failure lines accumulate. Progress lines do
//! not: only the latest one is kept, and it is dropped as soon as any other
//! line is logged. [`ProgressLog::text`] joins the two for display.
//!
//! Every line is also emitted as a tracing event.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error, info, warn};

use crate::constants::logging;

#[derive(Debug, Default)]
struct LogState {
    lines: String,
    current: Option<String>,
    percent: u8,
}

/// Point-in-time copy of the progress state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    /// Percent complete for the provider being ingested (0-100)
    pub percent: u8,
    /// Latest progress message, if no other line has been logged since
    pub message: Option<String>,
}

/// Accumulated run log plus the current progress line
#[derive(Debug, Default)]
pub struct ProgressLog {
    state: RwLock<LogState>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all previous lines and reset progress to zero
    pub fn clear(&self) {
        *self.write() = LogState::default();
    }

    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{}", message);
        self.append(logging::TAG_INFO, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        warn!("{}", message);
        self.append(logging::TAG_WARN, message);
    }

    pub fn fail(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        error!("{}", message);
        self.append(logging::TAG_FAIL, message);
    }

    /// Replace the current progress line
    ///
    /// `None` keeps the previous percentage, for streams of unknown length.
    pub fn progress(&self, percent: Option<u8>, message: impl AsRef<str>) {
        let message = message.as_ref();
        let mut state = self.write();
        if let Some(percent) = percent {
            state.percent = percent.min(100);
        }
        debug!("{}%  {}", state.percent, message);
        state.current = Some(message.to_string());
    }

    /// All accumulated lines followed by the current progress line
    pub fn text(&self) -> String {
        let state = self.read();
        match &state.current {
            Some(current) => {
                let tag = format!("{:03}%", state.percent);
                format!("{}{}", state.lines, format_line(&tag, current))
            }
            None => state.lines.clone(),
        }
    }

    /// Current percentage
    pub fn percent(&self) -> u8 {
        self.read().percent
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.read();
        ProgressSnapshot {
            percent: state.percent,
            message: state.current.clone(),
        }
    }

    fn append(&self, tag: &str, message: &str) {
        let mut state = self.write();
        state.current = None;
        state.lines.push_str(&format_line(tag, message));
    }

    // A panic while holding the lock cannot leave LogState half-updated,
    // so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, LogState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LogState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn format_line(tag: &str, message: &str) -> String {
    format!("[{}]  {}\n", tag, message)
}
