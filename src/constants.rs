//! Application constants for the cell database fetcher
//!
//! Constants are grouped by functional domain, the same way the configuration
//! sections are.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// OpenCellID API key override
    pub const OPENCELLID_API_KEY: &str = "OPENCELLID_API_KEY";

    /// MCC filter override
    pub const MCC_FILTER: &str = "CELLDB_MCC_FILTER";

    /// MNC filter override
    pub const MNC_FILTER: &str = "CELLDB_MNC_FILTER";
}

/// Data provider endpoints
pub mod providers {
    /// OpenCellID full export, `{api_key}` is substituted verbatim
    pub const OPENCELLID_URL_TEMPLATE: &str =
        "https://opencellid.org/ocid/downloads?token={api_key}&type=full&file=cell_towers.csv.gz";

    /// Mozilla Location Service daily export, `{date}` is `yyyy-MM-dd`
    pub const MOZILLA_URL_TEMPLATE: &str =
        "https://d17pt8qph6ncyq.cloudfront.net/export/MLS-full-cell-export-{date}T000000.csv.gz";

    /// MLS publishes shortly after midnight UTC; dating the request a few hours
    /// west of Greenwich gives the export time to appear
    pub const MOZILLA_UTC_OFFSET_WEST_SECS: i32 = 3 * 3600;

    /// Date format used in the MLS export name
    pub const MOZILLA_DATE_FORMAT: &str = "%Y-%m-%d";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "cell-db-fetcher/0.1.0";

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// TCP keep-alive interval for long-running export downloads
    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
}

/// Ingestion constants
pub mod ingest {
    /// Filter domain for MCC/MNC codes (0..=999)
    pub const CODE_DOMAIN: usize = 1000;

    /// Rows with this many fields or fewer end the stream
    pub const MIN_FIELD_COUNT: usize = 8;

    /// Rows per committed transaction
    pub const DEFAULT_BATCH_SIZE: usize = 1000;

    /// Rows read between progress events
    pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

    /// Buffer in front of the gzip decoder
    pub const READ_BUFFER_SIZE: usize = 64 * 1024;

    /// Header column names, in database column order
    pub const COLUMN_MCC: &str = "mcc";
    pub const COLUMN_MNC: &str = "net";
    pub const COLUMN_LAC: &str = "area";
    pub const COLUMN_CELL: &str = "cell";
    pub const COLUMN_LON: &str = "lon";
    pub const COLUMN_LAT: &str = "lat";
    pub const COLUMN_RANGE: &str = "range";
    pub const COLUMN_SAMPLES: &str = "samples";
}

/// Database layout constants
pub mod database {
    /// Table holding tower records
    pub const TABLE_NAME: &str = "cells";

    /// Side files SQLite may leave next to a database
    pub const SIDE_FILE_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];
}

/// File operation constants
pub mod files {
    /// File name of the published database
    pub const OUTPUT_FILE_NAME: &str = "new_lacells.db";

    /// Application directory name under platform config/data dirs
    pub const APP_DIR_NAME: &str = "cell-db-fetcher";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "cell-db-fetcher.toml";

    /// Prefix for staging files
    pub const STAGING_PREFIX: &str = ".staging-";

    /// Suffix for staging files
    pub const STAGING_SUFFIX: &str = ".db.tmp";
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";

    /// Tag for informational lines
    pub const TAG_INFO: &str = "info";

    /// Tag for warning lines
    pub const TAG_WARN: &str = "warn";

    /// Tag for failure lines
    pub const TAG_FAIL: &str = "fail";
}

// Re-export commonly used constants for convenience
pub use http::USER_AGENT;
pub use ingest::{DEFAULT_BATCH_SIZE, DEFAULT_PROGRESS_INTERVAL};
