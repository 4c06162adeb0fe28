//! Store Module
//!
//! The storage engine that coordinates header, snapshots, journal and the
//! in-memory collection registry of one store directory.
//!
//! ## Responsibilities
//! - Open or create the store directory, recovering committed state
//! - Hand out collection handles (get-or-create by name and kind)
//! - Buffer mutations until `commit()` appends them to the journal
//! - Checkpoint: fold the journal into a new snapshot
//! - Release the directory on `close()`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collection::{CollectionKind, HashCollection, OrderedSetCollection};
use crate::config::Config;
use crate::error::{AtlasError, Result};
use crate::journal::{JournalRecord, JournalRecovery, JournalWriter, Mutation};
use crate::observer::{StoreEvent, StoreObserver};
use crate::registry::CollectionRegistry;
use crate::storage::{
    HeaderFile, HeaderStatus, SnapshotManager, StoreHeader, HEADER_FILENAME, JOURNAL_FILENAME,
};

/// State shared between a store and its collection handles.
/// `None` once the store is closed.
pub(crate) type SharedCore = Arc<Mutex<Option<StoreCore>>>;

/// Run `f` against the open store, or fail with `Closed`
pub(crate) fn with_core<R>(
    shared: &SharedCore,
    f: impl FnOnce(&mut StoreCore) -> Result<R>,
) -> Result<R> {
    let mut guard = shared.lock();
    let core = guard.as_mut().ok_or(AtlasError::Closed)?;
    f(core)
}

/// A durable store holding named hash and ordered-set collections
///
/// ## Lifecycle
/// `open` → mutate through collection handles → `commit` → `close`.
/// Mutations are buffered in memory and survive a restart only once
/// committed. `close` does not commit; `shut_down` does both.
///
/// ## Concurrency
/// Calls are synchronous and take effect in call order. Handles share the
/// store state behind a mutex, so use from several threads is memory-safe
/// but unsupported as a consistency model: serialize access externally.
/// Opening the same path twice in one process is unsupported.
pub struct Store {
    path: PathBuf,
    header_status: HeaderStatus,
    observer: Arc<dyn StoreObserver>,
    shared: SharedCore,
}

/// Everything that exists only while the store is open
pub(crate) struct StoreCore {
    pub(crate) config: Config,
    pub(crate) registry: CollectionRegistry,

    /// Mutations since the last commit, in call order
    pending: Vec<Mutation>,

    journal: JournalWriter,
    snapshots: SnapshotManager,
    header: StoreHeader,

    /// Sequence number of the last successful commit
    last_seq: u64,

    /// Events raised under the lock, delivered once it is released
    events: Vec<StoreEvent<'static>>,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Create the directory if it doesn't exist
    /// 2. Read the header (checksum mismatch bypassed unless disabled)
    /// 3. Load the newest usable snapshot
    /// 4. Replay newer journal records, truncating a torn tail
    pub fn open(config: Config) -> Result<Self> {
        let path = config.path.clone();
        let observer = Arc::clone(&config.observer);
        let (core, header_status) = StoreCore::open(config)?;

        Ok(Self {
            path,
            header_status,
            observer,
            shared: Arc::new(Mutex::new(Some(core))),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified directory
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::builder().path(path.as_ref()).build())
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Get or create the hash collection `name`
    pub fn hash(&self, name: &str) -> Result<HashCollection> {
        self.ensure_collection(name, CollectionKind::Hash)?;
        Ok(HashCollection::new(Arc::clone(&self.shared), name))
    }

    /// Get or create the ordered-set collection `name`
    pub fn ordered_set(&self, name: &str) -> Result<OrderedSetCollection> {
        self.ensure_collection(name, CollectionKind::OrderedSet)?;
        Ok(OrderedSetCollection::new(Arc::clone(&self.shared), name))
    }

    fn ensure_collection(&self, name: &str, kind: CollectionKind) -> Result<()> {
        with_core(&self.shared, |core| {
            if core.registry.ensure(name, kind)? {
                tracing::debug!(collection = name, %kind, "collection created");
                core.record(Mutation::CreateCollection {
                    name: name.to_string(),
                    kind,
                });
            }
            Ok(())
        })
    }

    /// Remove a collection and its contents
    ///
    /// Returns `true` if it existed. Handles to it fail with
    /// `CollectionNotFound` afterwards.
    pub fn remove_collection(&self, name: &str) -> Result<bool> {
        with_core(&self.shared, |core| {
            let existed = core.registry.remove(name);
            if existed {
                core.record(Mutation::DropCollection {
                    name: name.to_string(),
                });
            }
            Ok(existed)
        })
    }

    /// Names and kinds of all collections, in name order
    pub fn collections(&self) -> Result<Vec<(String, CollectionKind)>> {
        with_core(&self.shared, |core| {
            Ok(core
                .registry
                .iter()
                .map(|(name, data)| (name.clone(), data.kind()))
                .collect())
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Persist every pending mutation
    ///
    /// A no-op when nothing is pending. On failure the pending mutations are
    /// kept and the commit can be retried.
    pub fn commit(&self) -> Result<()> {
        self.with_core_events(StoreCore::commit)
    }

    /// Commit, then fold the journal into a new snapshot
    ///
    /// Returns the new snapshot generation.
    pub fn checkpoint(&self) -> Result<u64> {
        self.with_core_events(|core| {
            core.commit_pending()?;
            core.checkpoint()
        })
    }

    /// Release the store without committing
    ///
    /// Uncommitted mutations are discarded. Closing a closed store is a no-op.
    pub fn close(&self) -> Result<()> {
        let core = self.shared.lock().take();
        match core {
            Some(core) => core.close(),
            None => Ok(()),
        }
    }

    /// Commit, then close. A no-op on a closed store.
    pub fn shut_down(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.commit()?;
        self.close()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_closed(&self) -> bool {
        self.shared.lock().is_none()
    }

    /// True when mutations are waiting for a commit (false once closed)
    pub fn is_dirty(&self) -> bool {
        self.shared
            .lock()
            .as_ref()
            .map_or(false, |core| !core.pending.is_empty())
    }

    /// Number of mutations waiting for a commit
    pub fn pending_mutations(&self) -> Result<usize> {
        with_core(&self.shared, |core| Ok(core.pending.len()))
    }

    /// Sequence number of the last successful commit
    pub fn last_seq(&self) -> Result<u64> {
        with_core(&self.shared, |core| Ok(core.last_seq))
    }

    /// Snapshot generation currently in effect (0 = none yet)
    pub fn generation(&self) -> Result<u64> {
        with_core(&self.shared, |core| Ok(core.header.generation))
    }

    /// Current journal length in bytes
    pub fn journal_len(&self) -> Result<u64> {
        with_core(&self.shared, |core| Ok(core.journal.len()))
    }

    /// How the header was read when the store was opened
    pub fn header_status(&self) -> HeaderStatus {
        self.header_status
    }

    /// Store directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Like `with_core`, then hand queued events to the observer unlocked
    fn with_core_events<R>(&self, f: impl FnOnce(&mut StoreCore) -> Result<R>) -> Result<R> {
        let (result, events) = {
            let mut guard = self.shared.lock();
            let core = guard.as_mut().ok_or(AtlasError::Closed)?;
            let result = f(core);
            (result, std::mem::take(&mut core.events))
        };

        for event in &events {
            self.observer.on_event(event);
        }
        result
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!(path = %self.path.display(), error = %e, "failed to close store");
        }
    }
}

impl StoreCore {
    fn open(config: Config) -> Result<(Self, HeaderStatus)> {
        config.validate()?;
        let dir = config.path.clone();

        if dir.exists() && !dir.is_dir() {
            return Err(AtlasError::Format(format!(
                "{} is not a store directory",
                dir.display()
            )));
        }
        std::fs::create_dir_all(&dir)?;

        let header_path = dir.join(HEADER_FILENAME);
        let journal_path = dir.join(JOURNAL_FILENAME);
        let snapshots = SnapshotManager::open(&dir)?;

        // Step 1: Header
        let bypass = config.checksum_header_bypass;
        let (header, status) = match StoreHeader::read(&header_path, bypass)? {
            HeaderFile::Present(header, status) => (header, status),
            HeaderFile::Missing => {
                let has_data = !snapshots.generations()?.is_empty()
                    || std::fs::metadata(&journal_path).map_or(false, |m| m.len() > 0);
                if has_data {
                    config
                        .observer
                        .on_event(&StoreEvent::HeaderRebuilt { unreadable: false });
                    (StoreHeader::default(), HeaderStatus::Rebuilt)
                } else {
                    (StoreHeader::default(), HeaderStatus::Created)
                }
            }
            HeaderFile::Unreadable { len } => {
                if !bypass {
                    return Err(AtlasError::Format(format!(
                        "header unreadable ({} bytes)",
                        len
                    )));
                }
                if let Some(name) = foreign_entry(&dir)? {
                    return Err(AtlasError::Format(format!(
                        "{} holds '{}' and no readable store header",
                        dir.display(),
                        name
                    )));
                }
                config
                    .observer
                    .on_event(&StoreEvent::HeaderRebuilt { unreadable: true });
                (StoreHeader::default(), HeaderStatus::Rebuilt)
            }
        };

        if let HeaderStatus::ChecksumBypassed { stored, computed } = status {
            config
                .observer
                .on_event(&StoreEvent::HeaderChecksumBypassed { stored, computed });
        }

        // Step 2: Snapshot
        let outcome = snapshots.load(header.generation)?;
        if outcome.fell_back {
            config.observer.on_event(&StoreEvent::SnapshotFallback {
                wanted: header.generation,
                loaded: outcome.generation,
            });
        }
        let snapshot_seq = outcome.snapshot.last_seq;
        let mut registry = CollectionRegistry::from_collections(outcome.snapshot.collections);

        // Step 3: Journal replay
        let mut last_seq = snapshot_seq;
        if journal_path.exists() {
            let (records, recovery) = JournalRecovery::recover(&journal_path)?;
            let mut replayed = 0u64;
            let mut skipped = 0u64;

            for record in records {
                if record.lsn <= snapshot_seq {
                    skipped += 1;
                    continue;
                }
                for mutation in &record.mutations {
                    registry.apply(mutation)?;
                }
                replayed += 1;
            }
            last_seq = last_seq.max(recovery.last_lsn);

            if recovery.records_recovered > 0 || recovery.was_truncated {
                config.observer.on_event(&StoreEvent::JournalRecovered {
                    records_replayed: replayed,
                    records_skipped: skipped,
                    was_truncated: recovery.was_truncated,
                });
            }
        }

        let journal = JournalWriter::open(&journal_path, config.sync_strategy, last_seq)?;

        // Step 4: Repair the header when it does not describe what was loaded
        let loaded_generation = outcome.generation.unwrap_or(0);
        let header = if status != HeaderStatus::Valid || header.generation != loaded_generation {
            let repaired = StoreHeader::new(loaded_generation, snapshot_seq);
            repaired.write(&header_path)?;
            repaired
        } else {
            header
        };

        config.observer.on_event(&StoreEvent::Opened {
            path: &dir,
            created: status == HeaderStatus::Created,
            collections: registry.len(),
        });

        let core = Self {
            config,
            registry,
            pending: Vec::new(),
            journal,
            snapshots,
            header,
            last_seq,
            events: Vec::new(),
        };
        Ok((core, status))
    }

    /// Buffer a mutation for the next commit
    pub(crate) fn record(&mut self, mutation: Mutation) {
        self.pending.push(mutation);
    }

    /// Commit, then checkpoint if the journal outgrew its threshold
    fn commit(&mut self) -> Result<()> {
        if !self.commit_pending()? {
            return Ok(());
        }

        if self.journal.len() >= self.config.checkpoint_threshold {
            // The commit above is already durable; a failure here is still reported
            self.checkpoint()?;
        }
        Ok(())
    }

    /// Append pending mutations as one journal record
    ///
    /// Returns `false` when there was nothing to commit.
    fn commit_pending(&mut self) -> Result<bool> {
        if self.pending.is_empty() {
            return Ok(false);
        }

        let lsn = self.last_seq + 1;
        let record = JournalRecord::new(lsn, std::mem::take(&mut self.pending));

        if let Err(e) = self.journal.append(&record) {
            self.pending = record.mutations;
            return Err(e);
        }

        self.last_seq = lsn;
        self.events.push(StoreEvent::Committed {
            lsn,
            mutations: record.mutations.len(),
        });
        Ok(true)
    }

    /// Write a snapshot of the committed state and empty the journal
    ///
    /// Callers make sure nothing is pending, so the registry equals the
    /// committed state.
    fn checkpoint(&mut self) -> Result<u64> {
        debug_assert!(self.pending.is_empty());

        // Step 1: New snapshot (fsynced)
        let (generation, _meta) = self.snapshots.write(self.last_seq, &self.registry)?;

        // Step 2: Point the header at it
        let header = StoreHeader::new(generation, self.last_seq);
        header.write(&self.config.path.join(HEADER_FILENAME))?;
        self.header = header;

        // Step 3: Journal records are now covered by the snapshot
        self.journal.truncate()?;

        // Step 4: Older generations are unreachable
        self.snapshots.remove_except(generation)?;

        self.events.push(StoreEvent::Checkpointed {
            generation,
            last_seq: self.last_seq,
        });
        Ok(generation)
    }

    fn close(mut self) -> Result<()> {
        let discarded = self.pending.len();
        let result = self.journal.sync();
        self.config.observer.on_event(&StoreEvent::Closed {
            discarded_mutations: discarded,
        });
        result
    }
}

/// First directory entry that is not a store file, if any
fn foreign_entry(dir: &Path) -> Result<Option<String>> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_store_file = name == HEADER_FILENAME
            || name == JOURNAL_FILENAME
            || SnapshotManager::is_snapshot_file(&entry.path());
        if !is_store_file {
            return Ok(Some(name));
        }
    }
    Ok(None)
}
