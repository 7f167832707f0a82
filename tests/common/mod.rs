//! Shared fixtures for integration tests
//!
//! Provider exports are built in memory and served by [`TestSource`], keyed
//! by URL host.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::Connection;
use url::Url;

use cell_db_fetcher::app::{
    CancelToken, CoordinatorConfig, KeepAwake, ProviderSettings, ProviderSource, ProviderStream,
};
use cell_db_fetcher::errors::NetworkError;
use cell_db_fetcher::Result;

pub const OCID_HOST: &str = "ocid.test";
pub const MLS_HOST: &str = "mls.test";

/// OpenCellID export header
pub const HEADER: &str =
    "radio,mcc,net,area,cell,unit,lon,lat,range,samples,changeable,created,updated,averageSignal\n";

pub fn row(mcc: &str, mnc: &str, cell: u32) -> String {
    format!("GSM,{mcc},{mnc},100,{cell},0,13.4,52.5,1000,3,1,0,0,0\n")
}

pub fn gzip_with(text: &str, level: Compression) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), level);
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

pub fn export(rows: &[String]) -> Vec<u8> {
    gzip_with(&format!("{HEADER}{}", rows.concat()), Compression::default())
}

/// `count` accepted rows with distinct cell ids
pub fn rows(count: u32) -> Vec<String> {
    (0..count).map(|cell| row("262", "1", cell)).collect()
}

/// Uncompressed gzip framing, so compressed bytes track rows read
pub fn stored_export(rows: &[String]) -> Vec<u8> {
    gzip_with(&format!("{HEADER}{}", rows.concat()), Compression::none())
}

type BodyWrapper = Box<dyn Fn(Vec<u8>) -> Box<dyn Read + Send> + Send + Sync>;

/// In-process provider source
pub struct TestSource {
    routes: HashMap<String, Vec<u8>>,
    wrap: BodyWrapper,
    requests: Mutex<Vec<Url>>,
}

impl TestSource {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            wrap: Box::new(|bytes| Box::new(Cursor::new(bytes))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_route(mut self, host: &str, body: Vec<u8>) -> Self {
        self.routes.insert(host.to_string(), body);
        self
    }

    /// Wrap every served body, e.g. to slow it down
    pub fn with_wrapper(
        mut self,
        wrap: impl Fn(Vec<u8>) -> Box<dyn Read + Send> + Send + Sync + 'static,
    ) -> Self {
        self.wrap = Box::new(wrap);
        self
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

impl ProviderSource for TestSource {
    fn open(&self, url: &Url) -> Result<ProviderStream> {
        self.requests.lock().unwrap().push(url.clone());

        let body = url.host_str().and_then(|host| self.routes.get(host));
        match body {
            Some(bytes) => Ok(ProviderStream {
                content_length: Some(bytes.len() as u64),
                body: (self.wrap)(bytes.clone()),
            }),
            None => Err(NetworkError::ServerError {
                status: 404,
                url: url.to_string(),
            }
            .into()),
        }
    }
}

/// Serves `chunk` bytes per read, sleeping `delay` before each
pub struct ThrottledReader {
    inner: Cursor<Vec<u8>>,
    chunk: usize,
    delay: Duration,
}

impl ThrottledReader {
    pub fn new(bytes: Vec<u8>, chunk: usize, delay: Duration) -> Self {
        Self {
            inner: Cursor::new(bytes),
            chunk,
            delay,
        }
    }
}

impl Read for ThrottledReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::thread::sleep(self.delay);
        let len = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..len])
    }
}

/// Cancels `token` once `after` bytes have been served
pub struct CancellingReader {
    inner: Cursor<Vec<u8>>,
    served: usize,
    after: usize,
    chunk: usize,
    token: CancelToken,
}

impl CancellingReader {
    pub fn new(bytes: Vec<u8>, after: usize, chunk: usize, token: CancelToken) -> Self {
        Self {
            inner: Cursor::new(bytes),
            served: 0,
            after,
            chunk,
            token,
        }
    }
}

impl Read for CancellingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let len = buf.len().min(self.chunk);
        let n = self.inner.read(&mut buf[..len])?;
        self.served += n;
        if self.served >= self.after {
            self.token.cancel();
        }
        Ok(n)
    }
}

#[derive(Debug, Default)]
pub struct CountingKeepAwake {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl CountingKeepAwake {
    pub fn counts(&self) -> (usize, usize) {
        (
            self.acquired.load(Ordering::SeqCst),
            self.released.load(Ordering::SeqCst),
        )
    }
}

impl KeepAwake for CountingKeepAwake {
    fn acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Configuration pointing both providers at [`TestSource`] hosts
pub fn test_config(output: &Path) -> CoordinatorConfig {
    CoordinatorConfig::default()
        .with_output_path(output)
        .with_providers(ProviderSettings {
            opencellid_api_key: "pk.test-key".to_string(),
            opencellid_url: format!("https://{OCID_HOST}/cells.csv.gz?token={{api_key}}"),
            mozilla_url: format!("https://{MLS_HOST}/MLS-full-cell-export-{{date}}T000000.csv.gz"),
            ..Default::default()
        })
}

pub fn count_rows(path: &Path) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row("SELECT COUNT(*) FROM cells", [], |r| r.get(0))
        .unwrap()
}

pub fn all_rows(path: &Path) -> Vec<(i64, i64, i64, i64)> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT mcc, mnc, lac, cellid FROM cells ORDER BY rowid")
        .unwrap();
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
        .unwrap()
        .collect::<std::result::Result<Vec<_>, _>>()
        .unwrap();
    rows
}

/// File names in `dir`, sorted
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
