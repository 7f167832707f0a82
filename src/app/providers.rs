//! Data providers and their export URLs

use chrono::{DateTime, FixedOffset, Utc};
use url::Url;

use crate::constants::providers;
use crate::errors::{ConfigError, ConfigResult};

/// Tower data provider, in ingestion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenCellId,
    MozillaLocationService,
}

impl Provider {
    /// All providers in the fixed order they are ingested
    pub const ALL: [Provider; 2] = [Provider::OpenCellId, Provider::MozillaLocationService];

    /// Human-readable provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenCellId => "OpenCellID",
            Provider::MozillaLocationService => "Mozilla Location Service",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// URL templates and credentials for the providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub use_opencellid: bool,
    pub use_mozilla: bool,
    pub opencellid_api_key: String,
    pub opencellid_url: String,
    pub mozilla_url: String,
}

impl Default for ProviderSettings {
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

impl ProviderSettings {
    /// Providers enabled in these settings, in ingestion order
    pub fn enabled(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| match p {
                Provider::OpenCellId => self.use_opencellid,
                Provider::MozillaLocationService => self.use_mozilla,
            })
            .collect()
    }

    /// Export URL for `provider` as of `now`
    ///
    /// The API key goes into the URL verbatim; a bad key is the provider's to
    /// reject. The MLS export date is taken in UTC-03:00.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the expanded template is not a URL.
    pub fn url_for(&self, provider: Provider, now: DateTime<Utc>) -> ConfigResult<Url> {
        let expanded = match provider {
            Provider::OpenCellId => self
                .opencellid_url
                .replace("{api_key}", &self.opencellid_api_key),
            Provider::MozillaLocationService => {
                self.mozilla_url.replace("{date}", &mozilla_export_date(now))
            }
        };

        Url::parse(&expanded).map_err(|e| ConfigError::InvalidUrl {
            url: expanded.clone(),
            reason: e.to_string(),
        })
    }
}

/// Date stamp of the newest MLS export expected to exist at `now`
pub fn mozilla_export_date(now: DateTime<Utc>) -> String {
    match FixedOffset::west_opt(providers::MOZILLA_UTC_OFFSET_WEST_SECS) {
        Some(offset) => now
            .with_timezone(&offset)
            .format(providers::MOZILLA_DATE_FORMAT)
            .to_string(),
        None => now.format(providers::MOZILLA_DATE_FORMAT).to_string(),
    }
}
