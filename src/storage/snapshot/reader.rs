//! Snapshot Reader
//!
//! Loads a snapshot file back into collection contents.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use bytes::Buf;

use crate::collection::{CollectionData, CollectionKind};
use crate::error::{AtlasError, Result};

use super::{LoadedSnapshot, FOOTER_SIZE, HEADER_SIZE, MAGIC, MEMBER_MARKER, VERSION};

/// Reader for snapshot files
pub struct SnapshotReader;

impl SnapshotReader {
    /// Read, verify and decode a snapshot file
    ///
    /// Unlike the store header, a snapshot checksum mismatch is always an
    /// error.
    pub fn load(path: &Path) -> Result<LoadedSnapshot> {
        let bytes = fs::read(path)?;
        Self::decode(&bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<LoadedSnapshot> {
        if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(AtlasError::Format(format!(
                "snapshot too short: {} bytes",
                bytes.len()
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(AtlasError::Format(format!(
                "invalid snapshot magic: expected ATSN, got {:?}",
                &bytes[0..4]
            )));
        }

        // Footer: entry_count (8) + data_crc (4) + padding (4)
        let body_len = bytes.len() - FOOTER_SIZE;
        let mut footer = &bytes[body_len..];
        let footer_entries = footer.get_u64_le();
        let stored_crc = footer.get_u32_le();

        let computed_crc = crc32fast::hash(&bytes[..body_len]);
        if stored_crc != computed_crc {
            return Err(AtlasError::Format(format!(
                "snapshot CRC mismatch: stored {:#010x}, computed {:#010x}",
                stored_crc, computed_crc
            )));
        }

        let mut buf = &bytes[4..body_len];
        let version = buf.get_u16_le();
        if version != VERSION {
            return Err(AtlasError::Format(format!(
                "unsupported snapshot version: {}",
                version
            )));
        }
        let last_seq = buf.get_u64_le();
        let collection_count = buf.get_u32_le();

        let mut collections = BTreeMap::new();
        let mut entry_count = 0u64;

        for _ in 0..collection_count {
            let (name, data) = read_collection(&mut buf)?;
            entry_count += data.len() as u64;
            if collections.insert(name.clone(), data).is_some() {
                return Err(AtlasError::Format(format!(
                    "duplicate collection '{}' in snapshot",
                    name
                )));
            }
        }

        if buf.has_remaining() {
            return Err(AtlasError::Format(format!(
                "{} trailing bytes after last collection",
                buf.remaining()
            )));
        }

        if entry_count != footer_entries {
            return Err(AtlasError::Format(format!(
                "snapshot entry count mismatch: footer {}, decoded {}",
                footer_entries, entry_count
            )));
        }

        Ok(LoadedSnapshot {
            last_seq,
            entry_count,
            collections,
        })
    }
}

fn read_collection(buf: &mut &[u8]) -> Result<(String, CollectionData)> {
    ensure(buf, 1 + 4 + 8, "collection header")?;
    let tag = buf.get_u8();
    let kind = CollectionKind::from_tag(tag)
        .ok_or_else(|| AtlasError::Format(format!("unknown collection kind tag {}", tag)))?;
    let name_len = buf.get_u32_le() as usize;
    let entries = buf.get_u64_le();
    let name = read_string(buf, name_len, "collection name")?;

    let data = match kind {
        CollectionKind::Hash => {
            let mut map = HashMap::new();
            for _ in 0..entries {
                let (key, value) = read_entry(buf)?;
                let value = value.ok_or_else(|| {
                    AtlasError::Format(format!("hash collection '{}' holds a set member", name))
                })?;
                map.insert(key, value);
            }
            CollectionData::Hash(map)
        }
        CollectionKind::OrderedSet => {
            let mut set = BTreeSet::new();
            for _ in 0..entries {
                let (member, value) = read_entry(buf)?;
                if value.is_some() {
                    return Err(AtlasError::Format(format!(
                        "ordered set '{}' holds a keyed value",
                        name
                    )));
                }
                set.insert(member);
            }
            CollectionData::OrderedSet(set)
        }
    };

    Ok((name, data))
}

/// `[key_len][val_len][key][value]`; `None` value for set members
fn read_entry(buf: &mut &[u8]) -> Result<(String, Option<String>)> {
    ensure(buf, 8, "entry header")?;
    let key_len = buf.get_u32_le() as usize;
    let val_len = buf.get_u32_le();

    let key = read_string(buf, key_len, "entry key")?;
    if val_len == MEMBER_MARKER {
        return Ok((key, None));
    }
    let value = read_string(buf, val_len as usize, "entry value")?;
    Ok((key, Some(value)))
}

fn read_string(buf: &mut &[u8], len: usize, what: &str) -> Result<String> {
    ensure(buf, len, what)?;
    let bytes = buf[..len].to_vec();
    buf.advance(len);
    String::from_utf8(bytes).map_err(|e| AtlasError::Format(format!("{} is not UTF-8: {}", what, e)))
}

fn ensure(buf: &[u8], needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(AtlasError::Format(format!(
            "truncated snapshot: {} needs {} bytes, {} left",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}
