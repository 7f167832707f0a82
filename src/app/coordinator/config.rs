//! Configuration for a database build run

use std::path::{Path, PathBuf};

use crate::app::filter::CodeFilter;
use crate::app::providers::ProviderSettings;
use crate::constants::{files, ingest};
use crate::errors::CoordinatorError;

/// Everything one run needs besides the source and host resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Comma-separated MCC list, empty for all
    pub mcc_filter: String,
    /// Comma-separated MNC list, empty for all
    pub mnc_filter: String,
    /// Which providers to ingest and where to fetch them
    pub providers: ProviderSettings,
    /// Where the finished database is published
    pub output_path: PathBuf,
    /// Rows per committed transaction
    pub batch_size: usize,
    /// Rows read between progress events
    pub progress_interval: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            mcc_filter: String::new(),
            mnc_filter: String::new(),
            providers: ProviderSettings::default(),
            output_path: default_output_path(),
            batch_size: ingest::DEFAULT_BATCH_SIZE,
            progress_interval: ingest::DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_filters(mut self, mcc: impl Into<String>, mnc: impl Into<String>) -> Self {
        self.mcc_filter = mcc.into();
        self.mnc_filter = mnc.into();
        self
    }

    pub fn with_providers(mut self, providers: ProviderSettings) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Directory the staging file is created in
    ///
    /// Same directory as the output so the final rename stays on one
    /// filesystem.
    pub fn output_dir(&self) -> &Path {
        match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn mcc(&self) -> CodeFilter {
        CodeFilter::parse(&self.mcc_filter)
    }

    pub fn mnc(&self) -> CodeFilter {
        CodeFilter::parse(&self.mnc_filter)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.batch_size == 0 {
            return Err(invalid("Batch size cannot be zero"));
        }

        if self.progress_interval == 0 {
            return Err(invalid("Progress interval cannot be zero"));
        }

        if self.output_path.file_name().is_none() {
            return Err(invalid(format!(
                "Output path {} does not name a file",
                self.output_path.display()
            )));
        }

        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> CoordinatorError {
    CoordinatorError::InvalidConfig {
        reason: reason.into(),
    }
}

/// `<data dir>/cell-db-fetcher/new_lacells.db`, or the bare file name when the
/// platform has no data directory
pub fn default_output_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(files::APP_DIR_NAME).join(files::OUTPUT_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(files::OUTPUT_FILE_NAME))
}
