//! Per-provider ingestion
//!
//! [`IngestionPipeline::ingest`] streams one provider export into an open
//! [`DatabaseBuilder`]: open the URL, decode the gzip CSV one record at a
//! time, keep the rows both code filters accept, and commit in fixed-size
//! batches. It is synchronous and runs on the orchestrator's blocking task.

use std::io::Read;
use std::time::Instant;

use csv::StringRecord;
use tracing::debug;
use url::Url;

use crate::app::client::ProviderSource;
use crate::app::coordinator::progress::ProgressLog;
use crate::app::coordinator::signals::CancelToken;
use crate::app::coordinator::stats::IngestStats;
use crate::app::database::{DatabaseBuilder, TowerRecord};
use crate::app::decoder::{StreamingCsvDecoder, TowerColumns};
use crate::app::filter::CodeFilter;
use crate::constants::ingest;
use crate::errors::Result;

/// Streams provider exports into a staged database
pub struct IngestionPipeline<'a> {
    source: &'a dyn ProviderSource,
    mcc_filter: &'a CodeFilter,
    mnc_filter: &'a CodeFilter,
    log: &'a ProgressLog,
    cancel: &'a CancelToken,
    batch_size: usize,
    progress_interval: u64,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(
        source: &'a dyn ProviderSource,
        mcc_filter: &'a CodeFilter,
        mnc_filter: &'a CodeFilter,
        log: &'a ProgressLog,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            source,
            mcc_filter,
            mnc_filter,
            log,
            cancel,
            batch_size: ingest::DEFAULT_BATCH_SIZE,
            progress_interval: ingest::DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Accepted rows per transaction. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Rows read between progress events. Zero is treated as one.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Ingest the export at `url` into `builder`
    ///
    /// The builder must have its schema and no open transaction. On success
    /// every inserted row is committed, including when the loop stopped on
    /// cancellation; the caller decides whether to publish. On error a
    /// transaction may be left open and the builder should be discarded.
    ///
    /// Rows whose MCC or MNC is not an integer are counted as read and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Network errors from opening the export, decode errors from the stream
    /// or header, and storage errors from the builder.
    pub fn ingest(&self, url: &Url, builder: &mut DatabaseBuilder) -> Result<IngestStats> {
        let started = Instant::now();

        self.log.info(format!("URL: {}", url));
        let stream = self.source.open(url)?;
        match stream.content_length {
            Some(length) => self.log.info(format!("Content length: {} bytes", length)),
            None => self.log.info("Content length: unknown"),
        }
        let content_length = stream.content_length.filter(|&length| length > 0);

        let mut decoder = StreamingCsvDecoder::new(stream.body);
        let headers = decoder.parse_header()?;
        let columns = TowerColumns::resolve(&headers)?;
        debug!(?columns, "Resolved export columns");

        let mut stats = IngestStats::default();
        self.log.progress(Some(0), records_message(&stats));

        let copied = self.copy_records(&mut decoder, &columns, content_length, builder, &mut stats);
        if let Err(e) = copied {
            self.log.warn(format!("Ingestion stopped. {}", records_message(&stats)));
            return Err(e);
        }

        stats.bytes_consumed = decoder.bytes_consumed();
        stats.cancelled = self.cancel.is_cancelled();
        stats.elapsed = started.elapsed();

        if stats.cancelled {
            self.log.warn("Download cancelled");
        }
        self.log.info(records_message(&stats));
        self.log.info(format!(
            "Total time: {} ms ({})",
            stats.elapsed.as_millis(),
            stats.format_rate()
        ));

        Ok(stats)
    }

    /// Filter and insert rows until the stream ends or cancellation is seen,
    /// then commit
    fn copy_records<R: Read>(
        &self,
        decoder: &mut StreamingCsvDecoder<R>,
        columns: &TowerColumns,
        content_length: Option<u64>,
        builder: &mut DatabaseBuilder,
        stats: &mut IngestStats,
    ) -> Result<()> {
        builder.begin_transaction()?;

        while !self.cancel.is_cancelled() {
            let Some(record) = decoder.next_record()? else {
                break;
            };
            stats.records_read += 1;

            if let Some(row) = select_record(record, columns, self.mcc_filter, self.mnc_filter) {
                builder.insert(&row)?;
                stats.records_inserted += 1;

                if builder.pending_rows() >= self.batch_size {
                    builder.commit_transaction()?;
                    builder.begin_transaction()?;
                }
            }

            if stats.records_read % self.progress_interval == 0 {
                let percent = percent_complete(decoder.bytes_consumed(), content_length);
                self.log.progress(percent, records_message(stats));
            }
        }

        builder.commit_transaction()?;
        Ok(())
    }
}

/// Build the row to insert, or `None` if the record is filtered out
fn select_record<'r>(
    record: &'r StringRecord,
    columns: &TowerColumns,
    mcc_filter: &CodeFilter,
    mnc_filter: &CodeFilter,
) -> Option<TowerRecord<'r>> {
    let mcc = parse_code(record.get(columns.mcc)?)?;
    let mnc = record.get(columns.mnc)?;

    if !mcc_filter.accepts(mcc) || !mnc_filter.accepts(parse_code(mnc)?) {
        return None;
    }

    Some(TowerRecord {
        mcc: u16::try_from(mcc).ok()?,
        mnc,
        lac: record.get(columns.lac)?,
        cellid: record.get(columns.cellid)?,
        longitude: record.get(columns.longitude)?,
        latitude: record.get(columns.latitude)?,
        accuracy: record.get(columns.accuracy)?,
        samples: record.get(columns.samples)?,
    })
}

fn parse_code(field: &str) -> Option<i64> {
    field.trim().parse().ok()
}

/// Share of the compressed body consumed, `None` when the length is unknown
fn percent_complete(consumed: u64, content_length: Option<u64>) -> Option<u8> {
    let total = content_length?;
    let percent = (u128::from(consumed) * 100 / u128::from(total)).min(100);
    u8::try_from(percent).ok()
}

fn records_message(stats: &IngestStats) -> String {
    format!(
        "Records read: {}, records inserted: {}",
        stats.records_read, stats.records_inserted
    )
}
