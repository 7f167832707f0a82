//! Error types for the cell database fetcher
//!
//! Errors are grouped by the stage that raises them. The orchestrator treats
//! every kind the same way (log, discard the staged database, re-raise), but the
//! kind is kept so the log line carries a distinguishing tag and the host can
//! tell a bad API key from a full disk.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Provider URL could not be parsed
    #[error("Invalid provider URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Could not locate a platform directory
    #[error("Could not determine the user {kind} directory")]
    NoPlatformDirectory { kind: &'static str },
}

/// Network and transport errors
#[derive(Error, Debug)]
pub enum NetworkError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error: HTTP {status} for {url}")]
    ServerError { status: u16, url: String },
}

/// Errors while decoding a provider export stream
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Gzip framing, truncated stream or connection reset while reading
    #[error("Failed to read compressed stream: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV framing
    #[error("Malformed CSV data: {0}")]
    Csv(csv::Error),

    /// Stream ended before a header line was read
    #[error("Export is empty: no header line")]
    EmptyHeader,

    /// A required header column is absent
    #[error("Export header is missing required column '{column}'")]
    MissingColumn { column: &'static str },
}

/// Staged database errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite reported an error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Staging file could not be created
    #[error("Could not create staging database in {dir}")]
    TempFile {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Atomic rename of the staged file failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Insert or commit attempted with no open transaction
    #[error("No transaction is open")]
    NoOpenTransaction,

    /// Begin attempted while a transaction is already open
    #[error("A transaction is already open")]
    TransactionAlreadyOpen,
}

/// Run coordination errors
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Another run holds the single-run guard
    #[error("A database download is already running")]
    AlreadyRunning,

    /// Background ingestion task panicked or was aborted
    #[error("Ingestion task terminated unexpectedly: {reason}")]
    TaskFailed { reason: String },

    /// Invalid coordinator configuration
    #[error("Invalid coordinator configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Network error
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Decode error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Storage error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Coordination error
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

impl AppError {
    /// Get error category for log tagging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Network(_) => "network",
            AppError::Decode(_) => "decode",
            AppError::Storage(_) => "storage",
            AppError::Coordinator(_) => "coordinator",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Network(NetworkError::Http(error))
    }
}

impl From<csv::Error> for DecodeError {
    /// Reader faults below the CSV layer (gzip, transport) keep their I/O error
    fn from(error: csv::Error) -> Self {
        if !error.is_io_error() {
            return DecodeError::Csv(error);
        }
        match error.into_kind() {
            csv::ErrorKind::Io(io) => DecodeError::Io(io),
            other => DecodeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{:?}", other),
            )),
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(error: csv::Error) -> Self {
        AppError::Decode(DecodeError::from(error))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        AppError::Storage(StorageError::Sqlite(error))
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Decode result type alias
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Storage result type alias
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
