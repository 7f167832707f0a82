//! HTTP client configuration and building logic

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::constants::http;
use crate::errors::NetworkError;

/// Configuration for the export download client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Total request timeout. `None` by default: a full export can take
    /// longer than any sensible fixed bound, and the host cancels instead.
    pub request_timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            connect_timeout: http::CONNECT_TIMEOUT,
            tcp_keepalive: Some(http::TCP_KEEPALIVE),
            tcp_nodelay: true,
        }
    }
}

impl ClientConfig {
    /// Builds the blocking HTTP client with the specified configuration
    ///
    /// Automatic response decompression stays off: the decoder needs the raw
    /// gzip bytes to measure progress.
    pub fn build_http_client(&self) -> Result<Client, NetworkError> {
        Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .tcp_keepalive(self.tcp_keepalive)
            .tcp_nodelay(self.tcp_nodelay)
            .user_agent(http::USER_AGENT)
            .build()
            .map_err(NetworkError::Http)
    }
}
