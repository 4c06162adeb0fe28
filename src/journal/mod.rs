//! Commit Journal Module
//!
//! Provides durability for commits through append-only logging.
//!
//! ## Responsibilities
//! - Append one record per commit holding that commit's mutations
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) equal to commit sequence numbers
//! - Replay on open, truncating a torn tail
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1 (commit 1)                     │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2 (commit 2)                     │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! `Data` is the bincode encoding of the commit's `Vec<Mutation>`; the CRC
//! covers LSN, Len and Data.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{JournalRecord, Mutation, HEADER_SIZE, MAX_RECORD_SIZE};
pub use writer::JournalWriter;
pub use reader::JournalReader;
pub use recovery::{JournalRecovery, RecoveryResult};
