//! Configuration management for the cell database fetcher
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! environment variables, then command-line flags (applied by the CLI).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, CoordinatorConfig, ProviderSettings};
use crate::constants::{env, files, http, ingest, logging, providers};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// MCC/MNC filters
    pub filters: FiltersConfig,
    /// Provider selection and endpoints
    pub providers: ProvidersConfig,
    /// Output database settings
    pub database: DatabaseConfig,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Comma-separated code lists; empty accepts every code
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FiltersConfig {
    pub mcc: String,
    pub mnc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub use_opencellid: bool,
    pub use_mozilla: bool,
    /// Substituted verbatim for `{api_key}` in the OpenCellID URL
    pub opencellid_api_key: String,
    pub opencellid_url: String,
    /// `{date}` becomes the export date
    pub mozilla_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            use_opencellid: true,
            use_mozilla: true,
            opencellid_api_key: String::new(),
            opencellid_url: providers::OPENCELLID_URL_TEMPLATE.to_string(),
            mozilla_url: providers::MOZILLA_URL_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Published database path (None = platform data directory)
    pub output_path: Option<PathBuf>,
    /// Accepted rows per transaction
    pub batch_size: usize,
    /// Rows read between progress updates
    pub progress_interval: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            output_path: None,
            batch_size: ingest::DEFAULT_BATCH_SIZE,
            progress_interval: ingest::DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Whole-request timeout in seconds (None = no limit)
    pub request_timeout_secs: Option<u64>,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// TCP keep-alive in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    pub tcp_nodelay: bool,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            tcp_keepalive_secs: Some(http::TCP_KEEPALIVE.as_secs()),
            tcp_nodelay: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Convert to the runtime configuration of the coordinator and client
    pub fn to_runtime_config(&self) -> (CoordinatorConfig, ClientConfig) {
        let mut coordinator = CoordinatorConfig::default()
            .with_filters(self.filters.mcc.clone(), self.filters.mnc.clone())
            .with_providers(self.providers.to_runtime_config())
            .with_batch_size(self.database.batch_size)
            .with_progress_interval(self.database.progress_interval);
        if let Some(path) = &self.database.output_path {
            coordinator = coordinator.with_output_path(path.clone());
        }

        (coordinator, self.client.to_runtime_config())
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit, or the first one found)
    /// 3. Environment variables
    ///
    /// CLI flags are applied on top by the caller.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Self::load_from_file(&path).await?
            }
            None => match Self::find_config_file() {
                Some(path) => Self::load_from_file(&path).await?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(key) = value(env::OPENCELLID_API_KEY) {
            debug!("Using OpenCellID API key from {}", env::OPENCELLID_API_KEY);
            self.providers.opencellid_api_key = key;
        }
        if let Some(mcc) = value(env::MCC_FILTER) {
            self.filters.mcc = mcc;
        }
        if let Some(mnc) = value(env::MNC_FILTER) {
            self.filters.mnc = mnc;
        }
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or(ConfigError::NoPlatformDirectory { kind: "config" })?;
        Ok(config_dir.join(files::APP_DIR_NAME).join("config.toml"))
    }

    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(format!("./{}", files::LOCAL_CONFIG_FILE))];
        if let Ok(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.exists();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}

impl ProvidersConfig {
    pub fn to_runtime_config(&self) -> ProviderSettings {
        ProviderSettings {
            use_opencellid: self.use_opencellid,
            use_mozilla: self.use_mozilla,
            opencellid_api_key: self.opencellid_api_key.clone(),
            opencellid_url: self.opencellid_url.clone(),
            mozilla_url: self.mozilla_url.clone(),
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
        }
    }
}
