//! Snapshot Builder
//!
//! Writes every collection of a registry into a new snapshot file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

use crate::collection::CollectionData;
use crate::error::{AtlasError, Result};

use super::{SnapshotMeta, MAGIC, MEMBER_MARKER, VERSION};

/// Builder for a new snapshot file
pub struct SnapshotBuilder {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Sequence number recorded in the header
    last_seq: u64,
    /// Collections announced in the header
    collection_count: u32,
    /// Collections written so far
    collections_written: u32,
    /// Entries written across all collections
    entry_count: u64,
    /// Running CRC over header and blocks
    hasher: crc32fast::Hasher,
    /// Scratch buffer reused per collection block
    scratch: BytesMut,
}

impl SnapshotBuilder {
    /// Create a snapshot file and write its header
    ///
    /// Exactly `collection_count` calls to `add_collection` must follow
    /// before `finish()`.
    pub fn new(path: &Path, last_seq: u64, collection_count: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut builder = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            last_seq,
            collection_count,
            collections_written: 0,
            entry_count: 0,
            hasher: crc32fast::Hasher::new(),
            scratch: BytesMut::with_capacity(64 * 1024),
        };

        let mut header = BytesMut::with_capacity(super::HEADER_SIZE);
        header.put_slice(MAGIC);
        header.put_u16_le(VERSION);
        header.put_u64_le(last_seq);
        header.put_u32_le(collection_count);
        builder.emit(&header)?;

        Ok(builder)
    }

    /// Write one collection block; entries are emitted in ascending key order
    pub fn add_collection(&mut self, name: &str, data: &CollectionData) -> Result<()> {
        if self.collections_written >= self.collection_count {
            return Err(AtlasError::Encoding(format!(
                "snapshot announced {} collections, got more",
                self.collection_count
            )));
        }

        let mut block = std::mem::take(&mut self.scratch);
        block.clear();

        block.put_u8(data.kind().tag());
        block.put_u32_le(encode_len(name.len())?);
        block.put_u64_le(data.len() as u64);
        block.put_slice(name.as_bytes());

        match data {
            CollectionData::Hash(map) => {
                let mut entries: Vec<(&String, &String)> = map.iter().collect();
                entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
                for (key, value) in entries {
                    block.put_u32_le(encode_len(key.len())?);
                    block.put_u32_le(encode_len(value.len())?);
                    block.put_slice(key.as_bytes());
                    block.put_slice(value.as_bytes());
                }
            }
            CollectionData::OrderedSet(set) => {
                for member in set {
                    block.put_u32_le(encode_len(member.len())?);
                    block.put_u32_le(MEMBER_MARKER);
                    block.put_slice(member.as_bytes());
                }
            }
        }

        self.emit(&block)?;
        self.scratch = block;
        self.collections_written += 1;
        self.entry_count += data.len() as u64;
        Ok(())
    }

    /// Write the footer, fsync and return metadata
    pub fn finish(mut self) -> Result<SnapshotMeta> {
        if self.collections_written != self.collection_count {
            return Err(AtlasError::Encoding(format!(
                "snapshot announced {} collections, wrote {}",
                self.collection_count, self.collections_written
            )));
        }

        let data_crc = self.hasher.finalize();

        // Footer: entry_count (8) + data_crc (4) + padding (4)
        self.writer.write_all(&self.entry_count.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;
        self.writer.flush()?;

        let file = self
            .writer
            .into_inner()
            .map_err(|e| AtlasError::Io(e.into_error()))?;
        file.sync_all()?;
        let file_size = file.metadata()?.len();

        Ok(SnapshotMeta {
            path: self.path,
            last_seq: self.last_seq,
            collection_count: self.collection_count,
            entry_count: self.entry_count,
            file_size,
        })
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.hasher.update(bytes);
        Ok(())
    }
}

fn encode_len(len: usize) -> Result<u32> {
    match u32::try_from(len) {
        Ok(n) if n != MEMBER_MARKER => Ok(n),
        _ => Err(AtlasError::Encoding(format!(
            "string of {} bytes is too long for a snapshot",
            len
        ))),
    }
}
