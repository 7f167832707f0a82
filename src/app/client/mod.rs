//! Export sources
//!
//! The ingestion pipeline reads provider exports through [`ProviderSource`],
//! so the network transport can be swapped for an in-process source.
//! [`HttpSource`] is the production implementation; any
//! `Fn(&Url) -> Result<ProviderStream>` closure is a source too.

pub mod config;
pub mod http;

use std::io::Read;

use url::Url;

use crate::errors::Result;

pub use config::ClientConfig;
pub use http::HttpSource;

/// An opened export: the raw (still compressed) body and its declared length
pub struct ProviderStream {
    /// `Content-Length` as declared by the server, if any
    pub content_length: Option<u64>,
    /// Response body
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for ProviderStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Opens a provider export for reading
///
/// Called from the blocking ingestion task.
pub trait ProviderSource: Send + Sync {
    /// GET `url`
    ///
    /// # Errors
    ///
    /// Returns a network error on connection failure or non-2xx status.
    fn open(&self, url: &Url) -> Result<ProviderStream>;
}

impl<F> ProviderSource for F
where
    F: Fn(&Url) -> Result<ProviderStream> + Send + Sync,
{
    fn open(&self, url: &Url) -> Result<ProviderStream> {
        self(url)
    }
}
