//! Journal record definitions
//!
//! Defines the structure of a single commit record and its byte encoding.

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::collection::CollectionKind;
use crate::error::{AtlasError, Result};

/// Record header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest payload a single record may carry (256 MB)
pub const MAX_RECORD_SIZE: u32 = 256 * 1024 * 1024;

/// A single state change inside a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// A collection came into existence
    CreateCollection { name: String, kind: CollectionKind },

    /// A collection and all of its contents were removed
    DropCollection { name: String },

    /// Hash collection: set `key` to `value`
    Put {
        collection: String,
        key: String,
        value: String,
    },

    /// Hash collection: delete `key`
    Remove { collection: String, key: String },

    /// Ordered set: insert `member`
    Add { collection: String, member: String },

    /// Ordered set: delete `member`
    Discard { collection: String, member: String },
}

/// One commit as stored in the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRecord {
    /// Log Sequence Number - the commit sequence number
    pub lsn: u64,

    /// Mutations of the commit, in call order
    pub mutations: Vec<Mutation>,
}

/// Result of decoding the front of a byte slice
#[derive(Debug)]
pub(crate) enum Decoded {
    /// A complete, checksum-valid record and its encoded length
    Record(JournalRecord, usize),
    /// Not enough bytes for a full record (torn write)
    Incomplete,
    /// Bytes present but invalid
    Corrupt(String),
}

impl JournalRecord {
    pub fn new(lsn: u64, mutations: Vec<Mutation>) -> Self {
        Self { lsn, mutations }
    }

    /// Encode as `[lsn][crc][len][payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&self.mutations)
            .map_err(|e| AtlasError::Encoding(format!("journal record {}: {}", self.lsn, e)))?;

        if payload.len() > MAX_RECORD_SIZE as usize {
            return Err(AtlasError::Encoding(format!(
                "journal record {} too large: {} bytes (max {})",
                self.lsn,
                payload.len(),
                MAX_RECORD_SIZE
            )));
        }

        let len = payload.len() as u32;
        let crc = Self::compute_crc(self.lsn, len, &payload);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.put_u64_le(self.lsn);
        bytes.put_u32_le(crc);
        bytes.put_u32_le(len);
        bytes.put_slice(&payload);
        Ok(bytes)
    }

    /// Decode the record at the start of `bytes`
    pub(crate) fn decode(bytes: &[u8]) -> Decoded {
        if bytes.len() < HEADER_SIZE {
            return Decoded::Incomplete;
        }

        let mut header = &bytes[..HEADER_SIZE];
        let lsn = header.get_u64_le();
        let stored_crc = header.get_u32_le();
        let len = header.get_u32_le();

        if len > MAX_RECORD_SIZE {
            return Decoded::Corrupt(format!("record {} claims {} bytes", lsn, len));
        }

        let total = HEADER_SIZE + len as usize;
        if bytes.len() < total {
            return Decoded::Incomplete;
        }

        let payload = &bytes[HEADER_SIZE..total];
        let crc = Self::compute_crc(lsn, len, payload);
        if crc != stored_crc {
            return Decoded::Corrupt(format!(
                "record {} CRC mismatch: stored {:#010x}, computed {:#010x}",
                lsn, stored_crc, crc
            ));
        }

        match bincode::deserialize::<Vec<Mutation>>(payload) {
            Ok(mutations) => Decoded::Record(Self { lsn, mutations }, total),
            Err(e) => Decoded::Corrupt(format!("record {} undecodable: {}", lsn, e)),
        }
    }

    /// CRC32 over LSN, length and payload
    pub fn compute_crc(lsn: u64, len: u32, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(&len.to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }
}
