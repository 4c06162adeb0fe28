//! Store observer
//!
//! Lifecycle notifications are handed to an observer injected through
//! [`Config`](crate::Config) instead of being printed. The default
//! [`TracingObserver`] forwards them to `tracing`.
//!
//! Events are delivered after the store has released its internal lock, so
//! an observer may call back into the store or its collection handles.

use std::path::Path;

/// A lifecycle event emitted by a store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent<'a> {
    /// The store was opened (or created)
    Opened {
        path: &'a Path,
        created: bool,
        collections: usize,
    },

    /// The header checksum did not match and was ignored
    HeaderChecksumBypassed { stored: u32, computed: u32 },

    /// The header was missing or unreadable and was rebuilt from the
    /// snapshots and journal beside it
    HeaderRebuilt { unreadable: bool },

    /// The preferred snapshot could not be loaded and an older one was used
    SnapshotFallback { wanted: u64, loaded: Option<u64> },

    /// Journal replay finished
    JournalRecovered {
        records_replayed: u64,
        records_skipped: u64,
        was_truncated: bool,
    },

    /// Pending mutations were written to the journal
    Committed { lsn: u64, mutations: usize },

    /// A new snapshot replaced the journal
    Checkpointed { generation: u64, last_seq: u64 },

    /// The store handle was released
    Closed { discarded_mutations: usize },
}

/// Receives store lifecycle events
pub trait StoreObserver: Send + Sync {
    fn on_event(&self, event: &StoreEvent<'_>);
}

/// Default observer: structured `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StoreObserver for TracingObserver {
    fn on_event(&self, event: &StoreEvent<'_>) {
        match event {
            StoreEvent::Opened {
                path,
                created,
                collections,
            } => {
                tracing::info!(path = %path.display(), created, collections, "store opened");
            }
            StoreEvent::HeaderChecksumBypassed { stored, computed } => {
                tracing::warn!(stored, computed, "header checksum mismatch, bypassing");
            }
            StoreEvent::HeaderRebuilt { unreadable } => {
                tracing::warn!(unreadable, "header rebuilt from directory contents");
            }
            StoreEvent::SnapshotFallback { wanted, loaded } => {
                tracing::warn!(wanted, ?loaded, "snapshot unavailable, fell back");
            }
            StoreEvent::JournalRecovered {
                records_replayed,
                records_skipped,
                was_truncated,
            } => {
                if *was_truncated {
                    tracing::warn!(
                        records_replayed,
                        records_skipped,
                        "journal recovered, torn tail truncated"
                    );
                } else {
                    tracing::debug!(records_replayed, records_skipped, "journal recovered");
                }
            }
            StoreEvent::Committed { lsn, mutations } => {
                tracing::debug!(lsn, mutations, "commit");
            }
            StoreEvent::Checkpointed {
                generation,
                last_seq,
            } => {
                tracing::info!(generation, last_seq, "checkpoint written");
            }
            StoreEvent::Closed {
                discarded_mutations,
            } => {
                if *discarded_mutations > 0 {
                    tracing::warn!(discarded_mutations, "store closed with uncommitted mutations");
                } else {
                    tracing::info!("store closed");
                }
            }
        }
    }
}
