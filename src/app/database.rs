//! Staged construction of the tower database
//!
//! A [`DatabaseBuilder`] writes into a randomly named file next to the output
//! path. Nothing is visible at the output path until [`DatabaseBuilder::publish`]
//! renames the finished file over it, so readers see either the previous
//! database or the complete new one. Dropping or discarding a builder removes
//! the staging file.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::constants::{database, files};
use crate::errors::{StorageError, StorageResult};

/// One filtered export row, borrowed from the decoder's record buffer
///
/// Only `mcc` is parsed. The remaining values are stored as the provider
/// wrote them and SQLite column affinity does the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TowerRecord<'a> {
    pub mcc: u16,
    pub mnc: &'a str,
    pub lac: &'a str,
    pub cellid: &'a str,
    pub longitude: &'a str,
    pub latitude: &'a str,
    pub accuracy: &'a str,
    pub samples: &'a str,
}

/// Builder for a staged tower database
pub struct DatabaseBuilder {
    conn: Connection,
    path: TempPath,
    in_transaction: bool,
    pending_rows: usize,
    rows_inserted: u64,
}

impl DatabaseBuilder {
    /// Create and open a new staging database inside `dir`
    ///
    /// The staging file gets a random hidden name, so it never collides with
    /// the published file or a backup of it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TempFile` if `dir` is not writable.
    pub fn open_new(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::TempFile {
            dir: dir.to_path_buf(),
            source,
        })?;

        let path = tempfile::Builder::new()
            .prefix(files::STAGING_PREFIX)
            .suffix(files::STAGING_SUFFIX)
            .tempfile_in(dir)
            .map_err(|source| StorageError::TempFile {
                dir: dir.to_path_buf(),
                source,
            })?
            .into_temp_path();

        let conn = Connection::open(&path)?;
        // Bulk load of a throwaway file: a crash just means the file is discarded
        conn.pragma_update(None, "synchronous", "OFF")?;

        debug!("Opened staging database {}", path.display());

        Ok(Self {
            conn,
            path,
            in_transaction: false,
            pending_rows: 0,
            rows_inserted: 0,
        })
    }

    /// Path of the staging file
    pub fn staging_path(&self) -> &Path {
        &self.path
    }

    /// Create the tower table
    ///
    /// Values are bound as the text read from the export. Column affinity
    /// stores numeric text as numbers, so an MNC of "05" reads back as 5.
    pub fn create_schema(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE {table} (
                mcc INTEGER,
                mnc INTEGER,
                lac INTEGER,
                cellid INTEGER,
                longitude REAL,
                latitude REAL,
                accuracy REAL,
                samples INTEGER
            );",
            table = database::TABLE_NAME
        ))?;
        Ok(())
    }

    /// Open an explicit transaction
    pub fn begin_transaction(&mut self) -> StorageResult<()> {
        if self.in_transaction {
            return Err(StorageError::TransactionAlreadyOpen);
        }
        self.conn.execute_batch("BEGIN")?;
        self.in_transaction = true;
        self.pending_rows = 0;
        Ok(())
    }

    /// Commit the open transaction
    pub fn commit_transaction(&mut self) -> StorageResult<()> {
        if !self.in_transaction {
            return Err(StorageError::NoOpenTransaction);
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        self.pending_rows = 0;
        Ok(())
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Rows added to the open transaction so far
    pub fn pending_rows(&self) -> usize {
        self.pending_rows
    }

    /// Rows inserted over the builder's lifetime
    pub fn rows_inserted(&self) -> u64 {
        self.rows_inserted
    }

    /// Append one row to the open transaction. Does not commit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NoOpenTransaction` when called outside
    /// [`begin_transaction`](Self::begin_transaction) /
    /// [`commit_transaction`](Self::commit_transaction).
    pub fn insert(&mut self, record: &TowerRecord<'_>) -> StorageResult<()> {
        if !self.in_transaction {
            return Err(StorageError::NoOpenTransaction);
        }

        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {} (mcc, mnc, lac, cellid, longitude, latitude, accuracy, samples)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            database::TABLE_NAME
        ))?;
        stmt.execute(params![
            record.mcc,
            record.mnc,
            record.lac,
            record.cellid,
            record.longitude,
            record.latitude,
            record.accuracy,
            record.samples,
        ])?;

        self.pending_rows += 1;
        self.rows_inserted += 1;
        Ok(())
    }

    /// Build lookup indices. Must run after all inserts, outside a transaction.
    pub fn create_index(&mut self) -> StorageResult<()> {
        if self.in_transaction {
            return Err(StorageError::TransactionAlreadyOpen);
        }
        self.conn.execute_batch(&format!(
            "CREATE INDEX _idx1 ON {table} (mcc, mnc, lac, cellid);
             CREATE INDEX _idx2 ON {table} (lac, cellid);",
            table = database::TABLE_NAME
        ))?;
        Ok(())
    }

    /// Close the staging database and atomically move it to `target`
    ///
    /// On error the staging file is removed and `target` is left as it was.
    pub fn publish(self, target: &Path) -> StorageResult<()> {
        let Self { conn, path, .. } = self;

        close_connection(conn)?;
        remove_side_files(&path);

        path.persist(target).map_err(|e| StorageError::AtomicOperationFailed {
            temp_path: e.path.to_path_buf(),
            final_path: target.to_path_buf(),
            source: e.error,
        })?;

        info!("Published database to {}", target.display());
        Ok(())
    }

    /// Close and delete the staging database and its side files
    ///
    /// Safe to call at any point, including after a failed insert or while
    /// a transaction is still open.
    pub fn discard(self) {
        let Self { conn, path, .. } = self;

        if let Err(e) = close_connection(conn) {
            warn!("Closing staging database failed: {}", e);
        }
        remove_side_files(&path);

        let staging = path.to_path_buf();
        match path.close() {
            Ok(()) => debug!("Discarded staging database {}", staging.display()),
            Err(e) => warn!(
                "Could not remove staging database {}: {}",
                staging.display(),
                e
            ),
        }
    }
}

fn close_connection(conn: Connection) -> StorageResult<()> {
    conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
}

/// Side file paths SQLite may create for `db_path`
pub fn side_file_paths(db_path: &Path) -> Vec<PathBuf> {
    database::SIDE_FILE_SUFFIXES
        .iter()
        .map(|suffix| {
            let mut name = db_path.as_os_str().to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        })
        .collect()
}

fn remove_side_files(db_path: &Path) {
    for side in side_file_paths(db_path) {
        match std::fs::remove_file(&side) {
            Ok(()) => debug!("Removed {}", side.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", side.display(), e),
        }
    }
}
