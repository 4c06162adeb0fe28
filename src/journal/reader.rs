//! Journal Reader
//!
//! Handles reading commit records from the journal file.

use std::fs;
use std::path::Path;

use crate::error::{AtlasError, Result};

use super::entry::Decoded;
use super::JournalRecord;

/// Reads records from a journal file
///
/// The file is loaded whole; journals are bounded by the checkpoint
/// threshold.
pub struct JournalReader {
    data: Vec<u8>,
    /// Offset of the next unread record
    position: usize,
}

impl JournalReader {
    /// Open a journal file for reading
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_bytes(fs::read(path)?))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    /// Read the next record
    ///
    /// Returns `Ok(None)` at a clean end of file and a `Format` error for a
    /// torn or corrupt record. The position does not advance past a bad
    /// record.
    pub fn next_record(&mut self) -> Result<Option<JournalRecord>> {
        if self.position >= self.data.len() {
            return Ok(None);
        }

        match JournalRecord::decode(&self.data[self.position..]) {
            Decoded::Record(record, consumed) => {
                self.position += consumed;
                Ok(Some(record))
            }
            Decoded::Incomplete => Err(AtlasError::Format(format!(
                "incomplete journal record at offset {}",
                self.position
            ))),
            Decoded::Corrupt(reason) => Err(AtlasError::Format(format!(
                "corrupt journal record at offset {}: {}",
                self.position, reason
            ))),
        }
    }

    /// Bytes of valid records read so far
    pub fn position(&self) -> u64 {
        self.position as u64
    }

    /// Total file length
    pub fn file_len(&self) -> u64 {
        self.data.len() as u64
    }
}

impl Iterator for JournalReader {
    type Item = Result<JournalRecord>;

    /// Yields records until the end of file or the first bad record
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                // Stop iteration after reporting the bad record once
                self.position = self.data.len();
                Some(Err(e))
            }
        }
    }
}
