//! Cell Database Fetcher Library
//!
//! Builds an offline cell tower location database from the OpenCellID and
//! Mozilla Location Service exports. Exports are streamed, filtered by
//! MCC/MNC, staged in SQLite and published with an atomic rename.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(DEFAULT_BATCH_SIZE, 1000);
        assert_eq!(env::OPENCELLID_API_KEY, "OPENCELLID_API_KEY");
        assert!(USER_AGENT.contains("cell-db-fetcher"));
    }

    #[test]
    fn test_error_types() {
        let error = AppError::from(errors::CoordinatorError::AlreadyRunning);
        assert_eq!(error.category(), "coordinator");
    }
}
