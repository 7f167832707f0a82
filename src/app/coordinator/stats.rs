//! Ingestion statistics and run outcomes

use std::fmt;
use std::time::Duration;

use crate::app::providers::Provider;

/// Counters for one provider's ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Data rows decoded from the export, accepted or not
    pub records_read: u64,
    /// Rows that passed both filters and were staged
    pub records_inserted: u64,
    /// Compressed bytes pulled from the response body
    pub bytes_consumed: u64,
    /// Wall time from opening the export to the final commit
    pub elapsed: Duration,
    /// Whether ingestion stopped early on cancellation
    pub cancelled: bool,
}

impl IngestStats {
    /// Milliseconds spent per record read, `None` when nothing was read
    pub fn ms_per_record(&self) -> Option<f64> {
        if self.records_read == 0 {
            return None;
        }
        Some(self.elapsed.as_secs_f64() * 1000.0 / self.records_read as f64)
    }

    /// [`Self::ms_per_record`] formatted for the run log
    pub fn format_rate(&self) -> String {
        match self.ms_per_record() {
            Some(rate) => format!("{:.4} ms/record", rate),
            None => "n/a".to_string(),
        }
    }
}

/// Statistics for one provider within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReport {
    pub provider: Provider,
    pub stats: IngestStats,
}

/// How a run ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The staged database was indexed and published
    Completed {
        providers: Vec<ProviderReport>,
        elapsed: Duration,
    },
    /// Cancellation was observed before publishing; the staged file is gone
    Cancelled {
        providers: Vec<ProviderReport>,
        elapsed: Duration,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn providers(&self) -> &[ProviderReport] {
        match self {
            Self::Completed { providers, .. } | Self::Cancelled { providers, .. } => providers,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Completed { elapsed, .. } | Self::Cancelled { elapsed, .. } => *elapsed,
        }
    }

    /// Rows staged across all providers
    pub fn records_inserted(&self) -> u64 {
        self.providers().iter().map(|p| p.stats.records_inserted).sum()
    }
}

/// Lifecycle of the current (or most recent) run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
