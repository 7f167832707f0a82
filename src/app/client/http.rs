//! Plain and TLS GET of provider exports

use tracing::{debug, warn};
use url::Url;

use super::config::ClientConfig;
use super::{ProviderSource, ProviderStream};
use crate::errors::{NetworkError, Result};

/// [`ProviderSource`] that fetches exports over HTTP(S)
///
/// A client is built per request. Requests are made from the blocking
/// ingestion task, and one export per provider makes pooling pointless.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    config: ClientConfig,
}

impl HttpSource {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl ProviderSource for HttpSource {
    fn open(&self, url: &Url) -> Result<ProviderStream> {
        let client = self.config.build_http_client()?;

        debug!("GET {}", url);
        let response = client.get(url.clone()).send().map_err(NetworkError::Http)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Provider responded with HTTP {} for {}", status.as_u16(), url);
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        Ok(ProviderStream {
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}
