//! Journal Writer
//!
//! Handles appending commit records to the journal file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{AtlasError, Result};

use super::JournalRecord;

/// Appends commit records to the journal file
pub struct JournalWriter {
    /// Journal file path (needed to reopen on rollback)
    path: PathBuf,
    /// Buffered append handle
    writer: BufWriter<File>,
    /// LSN of the last record known to be in the file
    last_lsn: u64,
    /// Bytes of complete records in the file
    len: u64,
    sync_strategy: SyncStrategy,
    /// Commits appended since the last fsync
    unsynced: usize,
}

impl JournalWriter {
    /// Open or create a journal file for appending
    ///
    /// `last_lsn` is the highest LSN already accounted for (snapshot or
    /// replayed records); new records must be numbered above it.
    pub fn open(path: &Path, sync_strategy: SyncStrategy, last_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            last_lsn,
            len,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append a record, flush it to the OS and fsync per the sync strategy
    ///
    /// Returns the journal length after the append. On failure the file is
    /// cut back to its previous length so a retried commit starts clean.
    pub fn append(&mut self, record: &JournalRecord) -> Result<u64> {
        if record.lsn <= self.last_lsn {
            return Err(AtlasError::Encoding(format!(
                "journal LSN must increase: got {}, last {}",
                record.lsn, self.last_lsn
            )));
        }

        let bytes = record.serialize()?;

        if let Err(e) = self.write_record(&bytes) {
            tracing::error!(lsn = record.lsn, error = %e, "journal append failed, rolling back");
            self.rollback()?;
            return Err(e);
        }

        self.len += bytes.len() as u64;
        self.last_lsn = record.lsn;
        Ok(self.len)
    }

    fn write_record(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;

        self.unsynced += 1;
        let should_sync = match self.sync_strategy {
            SyncStrategy::EveryCommit => true,
            SyncStrategy::EveryNCommits { count } => self.unsynced >= count,
        };
        if should_sync {
            self.writer.get_ref().sync_data()?;
            self.unsynced = 0;
        }
        Ok(())
    }

    /// Drop whatever a failed append left behind
    fn rollback(&mut self) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let old = std::mem::replace(&mut self.writer, BufWriter::new(file));
        // Discard the buffer without flushing it into the file
        let _ = old.into_parts();
        self.writer.get_ref().set_len(self.len)?;
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Empty the journal (after a checkpoint made its records redundant)
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_ref();
        file.set_len(0)?;
        file.sync_all()?;
        self.len = 0;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN of the last appended record
    pub fn last_lsn(&self) -> u64 {
        self.last_lsn
    }

    /// Current journal length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
