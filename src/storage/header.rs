//! Store header
//!
//! Fixed-size record that marks a directory as a store and names the
//! current snapshot generation.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use bytes::{Buf, BufMut};

use crate::error::{AtlasError, Result};

/// File name of the header inside a store directory
pub const HEADER_FILENAME: &str = "store.hdr";

/// Magic bytes identifying a store header
pub(crate) const MAGIC: &[u8; 4] = b"ATKS";

/// Current header format version
pub(crate) const VERSION: u16 = 1;

/// Magic (4) + Version (2) + Flags (2) + Generation (8) + LastSeq (8) + CRC (4) + Pad (4)
pub const HEADER_SIZE: usize = 32;

/// Bytes covered by the checksum
const CHECKSUMMED_LEN: usize = 24;

/// Decoded header contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreHeader {
    /// Reserved, written as zero
    pub flags: u16,
    /// Snapshot generation in effect (0 = no snapshot yet)
    pub generation: u64,
    /// Last commit sequence number folded into that snapshot
    pub last_seq: u64,
}

/// How the header was obtained on open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    /// Fresh store, header just written
    Created,
    /// Header present and checksum valid
    Valid,
    /// Checksum mismatch ignored per the bypass policy
    ChecksumBypassed { stored: u32, computed: u32 },
    /// Header missing or unreadable beside store files; rebuilt from the directory
    Rebuilt,
}

/// What was found at the header path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFile {
    /// No header file
    Missing,
    /// Too short or without the magic: a torn or zeroed write, or not ours
    Unreadable { len: usize },
    /// Decoded header and how its checksum was treated
    Present(StoreHeader, HeaderStatus),
}

impl StoreHeader {
    pub fn new(generation: u64, last_seq: u64) -> Self {
        Self {
            flags: 0,
            generation,
            last_seq,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        buf.put_slice(MAGIC);
        buf.put_u16_le(VERSION);
        buf.put_u16_le(self.flags);
        buf.put_u64_le(self.generation);
        buf.put_u64_le(self.last_seq);
        let crc = crc32fast::hash(&buf[..CHECKSUMMED_LEN]);
        buf.put_u32_le(crc);
        buf.put_u32_le(0);

        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode header bytes
    ///
    /// Magic, version and length problems are always `Format` errors. A
    /// checksum mismatch is reported as `ChecksumBypassed` when `bypass` is
    /// set and as a `Format` error otherwise.
    pub fn decode(bytes: &[u8], bypass: bool) -> Result<(Self, HeaderStatus)> {
        if bytes.len() < HEADER_SIZE {
            return Err(AtlasError::Format(format!(
                "header too short: {} bytes (expected {})",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(AtlasError::Format(format!(
                "invalid header magic: expected ATKS, got {:?}",
                &bytes[0..4]
            )));
        }

        let mut buf = &bytes[4..HEADER_SIZE];
        let version = buf.get_u16_le();
        if version != VERSION {
            return Err(AtlasError::Format(format!(
                "unsupported store version: {}",
                version
            )));
        }

        let header = Self {
            flags: buf.get_u16_le(),
            generation: buf.get_u64_le(),
            last_seq: buf.get_u64_le(),
        };
        let stored = buf.get_u32_le();
        let computed = crc32fast::hash(&bytes[..CHECKSUMMED_LEN]);

        if stored == computed {
            return Ok((header, HeaderStatus::Valid));
        }

        if bypass {
            Ok((header, HeaderStatus::ChecksumBypassed { stored, computed }))
        } else {
            Err(AtlasError::Format(format!(
                "header checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored, computed
            )))
        }
    }

    /// True when `bytes` cannot be a header at all (short or wrong magic)
    pub fn is_unreadable(bytes: &[u8]) -> bool {
        bytes.len() < HEADER_SIZE || &bytes[0..4] != MAGIC
    }

    /// Read the header file
    ///
    /// Short and magic-less files come back as `Unreadable` so the caller
    /// can decide from the directory contents; every other decode failure
    /// (version, strict checksum) is an error.
    pub fn read(path: &Path, bypass: bool) -> Result<HeaderFile> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HeaderFile::Missing),
            Err(e) => return Err(e.into()),
        };

        if Self::is_unreadable(&bytes) {
            return Ok(HeaderFile::Unreadable { len: bytes.len() });
        }
        let (header, status) = Self::decode(&bytes, bypass)?;
        Ok(HeaderFile::Present(header, status))
    }

    /// Rewrite the header in place and fsync it
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.write_all(&self.encode())?;
        file.set_len(HEADER_SIZE as u64)?;
        file.sync_all()?;
        Ok(())
    }
}
