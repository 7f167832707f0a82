//! Streaming CSV decoding of gzip-compressed provider exports
//!
//! The decoder stacks a byte counter, a read buffer, a gzip decoder and a CSV
//! reader over the raw connection body. Records are read one at a time into a
//! reused buffer, so memory stays flat no matter how large the export is.
//!
//! ```text
//! body -> CountingReader -> BufReader -> MultiGzDecoder -> csv::Reader
//! ```

use std::io::{BufReader, Read};

use csv::StringRecord;
use flate2::read::MultiGzDecoder;

use crate::constants::ingest;
use crate::errors::{DecodeError, DecodeResult};

/// Reader adapter that counts bytes pulled from the inner reader
#[derive(Debug)]
pub struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }

    /// Total bytes read so far
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

type DecodeStack<R> = csv::Reader<MultiGzDecoder<BufReader<CountingReader<R>>>>;

/// Forward-only CSV record reader over a gzip stream
pub struct StreamingCsvDecoder<R: Read> {
    reader: DecodeStack<R>,
    record: StringRecord,
    finished: bool,
}

impl<R: Read> StreamingCsvDecoder<R> {
    /// Wrap a gzip-compressed byte stream
    pub fn new(body: R) -> Self {
        let buffered = BufReader::with_capacity(ingest::READ_BUFFER_SIZE, CountingReader::new(body));
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(MultiGzDecoder::new(buffered));

        Self {
            reader,
            record: StringRecord::new(),
            finished: false,
        }
    }

    /// Read the header line. Must be called once, before any record.
    pub fn parse_header(&mut self) -> DecodeResult<Vec<String>> {
        if !self.reader.read_record(&mut self.record)? {
            self.finished = true;
            return Err(DecodeError::EmptyHeader);
        }

        Ok(self
            .record
            .iter()
            .map(|name| name.trim_start_matches('\u{feff}').trim().to_string())
            .collect())
    }

    /// Next data record, or `None` at end of stream
    ///
    /// A record with too few fields also ends the stream: providers sometimes
    /// finish an export with a truncated row.
    pub fn next_record(&mut self) -> DecodeResult<Option<&StringRecord>> {
        if self.finished {
            return Ok(None);
        }

        if !self.reader.read_record(&mut self.record)? {
            self.finished = true;
            return Ok(None);
        }

        if self.record.len() <= ingest::MIN_FIELD_COUNT {
            tracing::debug!(
                fields = self.record.len(),
                "Short record, treating as end of export"
            );
            self.finished = true;
            return Ok(None);
        }

        Ok(Some(&self.record))
    }

    /// Compressed bytes read from the underlying stream so far
    pub fn bytes_consumed(&self) -> u64 {
        self.reader.get_ref().get_ref().get_ref().count()
    }
}

/// Header positions of the columns the database needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TowerColumns {
    pub mcc: usize,
    pub mnc: usize,
    pub lac: usize,
    pub cellid: usize,
    pub longitude: usize,
    pub latitude: usize,
    pub accuracy: usize,
    pub samples: usize,
}

impl TowerColumns {
    /// Resolve column positions from a header row
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::MissingColumn` naming the first absent column.
    pub fn resolve(headers: &[String]) -> DecodeResult<Self> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or(DecodeError::MissingColumn { column })
        };

        Ok(Self {
            mcc: find(ingest::COLUMN_MCC)?,
            mnc: find(ingest::COLUMN_MNC)?,
            lac: find(ingest::COLUMN_LAC)?,
            cellid: find(ingest::COLUMN_CELL)?,
            longitude: find(ingest::COLUMN_LON)?,
            latitude: find(ingest::COLUMN_LAT)?,
            accuracy: find(ingest::COLUMN_RANGE)?,
            samples: find(ingest::COLUMN_SAMPLES)?,
        })
    }
}
