//! Snapshot Module
//!
//! Compacted, immutable image of every collection in a store.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                               │
//! │   Magic: "ATSN" (4) | Version: u16 (2) | LastSeq: u64 (8)       │
//! │   CollectionCount: u32 (4)                                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Collection Block (repeated CollectionCount times)               │
//! │   [Kind: u8][NameLen: u32][EntryCount: u64][Name]               │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]  ... per entry ...     │
//! │   (ValLen = u32::MAX marks a set member, no value bytes)        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                               │
//! │   EntryCount: u64 (8) | DataCRC: u32 (4) | Padding (4)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//! Entries are written in ascending key order. The CRC covers header and
//! collection blocks.

mod builder;
mod reader;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::collection::CollectionData;

pub use builder::SnapshotBuilder;
pub use reader::SnapshotReader;

// =============================================================================
// Shared Constants (used by builder and reader)
// =============================================================================

/// Magic bytes identifying a snapshot file
pub(crate) const MAGIC: &[u8; 4] = b"ATSN";

/// Current snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + LastSeq (8) + CollectionCount (4)
pub(crate) const HEADER_SIZE: usize = 18;

/// Footer size: EntryCount (8) + DataCRC (4) + Padding (4)
pub(crate) const FOOTER_SIZE: usize = 16;

/// Value length marking an ordered-set member (no value bytes follow)
pub(crate) const MEMBER_MARKER: u32 = u32::MAX;

// =============================================================================
// Snapshot Metadata
// =============================================================================

/// Metadata of a snapshot written by [`SnapshotBuilder`]
#[derive(Debug, Clone)]
pub struct SnapshotMeta {
    /// Path to the snapshot file
    pub path: PathBuf,
    /// Last commit sequence number contained in the image
    pub last_seq: u64,
    /// Number of collections
    pub collection_count: u32,
    /// Number of entries across all collections
    pub entry_count: u64,
    /// File size in bytes
    pub file_size: u64,
}

/// A snapshot read back into memory
#[derive(Debug, Clone, Default)]
pub struct LoadedSnapshot {
    pub last_seq: u64,
    pub entry_count: u64,
    pub collections: BTreeMap<String, CollectionData>,
}
