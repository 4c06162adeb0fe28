//! Journal Recovery
//!
//! Handles crash recovery by replaying the journal.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{AtlasError, Result};

use super::{JournalReader, JournalRecord};

/// Handles journal recovery after a crash
pub struct JournalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records successfully read
    pub records_recovered: u64,

    /// Length of the valid prefix of the journal
    pub valid_len: u64,

    /// Bytes discarded after the last good record
    pub bytes_discarded: u64,

    /// Last valid LSN (0 when the journal is empty)
    pub last_lsn: u64,

    /// Whether the journal was truncated (torn or corrupt tail removed)
    pub was_truncated: bool,
}

impl JournalRecovery {
    /// Recover records from a journal file
    ///
    /// This will:
    /// 1. Read all valid records in order
    /// 2. Stop at the first torn, corrupt or out-of-order record
    /// 3. Truncate the file after the last good record
    /// 4. Return the good records
    pub fn recover(path: &Path) -> Result<(Vec<JournalRecord>, RecoveryResult)> {
        let (records, result) = Self::scan(path)?;

        if result.bytes_discarded > 0 {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
            tracing::warn!(
                path = %path.display(),
                discarded = result.bytes_discarded,
                last_lsn = result.last_lsn,
                "truncated journal tail"
            );
        }

        Ok((records, result))
    }

    /// Verify integrity of a journal file without modifying it
    ///
    /// `was_truncated` then reports whether `recover` would cut the file.
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<JournalRecord>, RecoveryResult)> {
        let mut reader = JournalReader::open(path)?;
        let mut records: Vec<JournalRecord> = Vec::new();
        let mut last_lsn = 0;

        loop {
            let good_len = reader.position();
            match reader.next_record() {
                Ok(Some(record)) => {
                    if record.lsn <= last_lsn {
                        tracing::warn!(lsn = record.lsn, last_lsn, "journal LSN went backwards");
                        return Ok(Self::finish(records, last_lsn, good_len, reader.file_len()));
                    }
                    last_lsn = record.lsn;
                    records.push(record);
                }
                Ok(None) => break,
                Err(AtlasError::Format(reason)) => {
                    tracing::warn!(%reason, "journal scan stopped");
                    return Ok(Self::finish(records, last_lsn, good_len, reader.file_len()));
                }
                Err(e) => return Err(e),
            }
        }

        let len = reader.file_len();
        Ok(Self::finish(records, last_lsn, len, len))
    }

    fn finish(
        records: Vec<JournalRecord>,
        last_lsn: u64,
        good_len: u64,
        file_len: u64,
    ) -> (Vec<JournalRecord>, RecoveryResult) {
        let result = RecoveryResult {
            records_recovered: records.len() as u64,
            valid_len: good_len,
            bytes_discarded: file_len - good_len,
            last_lsn,
            was_truncated: file_len > good_len,
        };
        (records, result)
    }
}
