//! Storage Module
//!
//! The on-disk substrate of a store: header, snapshots and their lifecycle.
//!
//! ## Responsibilities
//! - Identify a directory as a store (header magic/version)
//! - Tolerate a header checksum mismatch when configured to
//! - Persist compacted images of every collection (snapshots)
//! - Discover snapshots on startup and fall back when one is unreadable
//!
//! ## Directory Layout
//! ```text
//! {path}/
//!   ├── store.hdr               header, rewritten in place at checkpoints
//!   ├── journal.log             commit journal (see `journal`)
//!   └── snapshot_000042.snap    newest checkpoint
//! ```
//!
//! ## Header Format (32 bytes)
//! ```text
//! ┌──────────┬─────────────┬───────────┬────────────────┬──────────────┬─────────┬─────────┐
//! │Magic (4) │ Version (2) │ Flags (2) │ Generation (8) │ LastSeq (8)  │ CRC (4) │ Pad (4) │
//! └──────────┴─────────────┴───────────┴────────────────┴──────────────┴─────────┴─────────┘
//! ```

mod header;
mod manager;
mod snapshot;

pub use header::{HeaderFile, HeaderStatus, StoreHeader, HEADER_FILENAME, HEADER_SIZE};
pub use manager::{LoadOutcome, SnapshotManager};
pub use snapshot::{LoadedSnapshot, SnapshotBuilder, SnapshotMeta, SnapshotReader};

/// File name of the commit journal inside a store directory
pub const JOURNAL_FILENAME: &str = "journal.log";
