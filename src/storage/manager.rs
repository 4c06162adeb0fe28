//! Snapshot Manager
//!
//! Tracks the snapshot files of a store directory.
//!
//! ## Responsibilities
//! - Discover existing snapshots on startup
//! - Load the preferred generation, falling back newest → oldest
//! - Write new generations from the committed registry
//! - Remove superseded generations after a checkpoint

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{AtlasError, Result};
use crate::registry::CollectionRegistry;

use super::{LoadedSnapshot, SnapshotBuilder, SnapshotMeta, SnapshotReader};

/// Outcome of loading the snapshot on open
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Generation actually loaded, `None` when the store has no snapshot
    pub generation: Option<u64>,
    /// Decoded contents (empty when `generation` is `None`)
    pub snapshot: LoadedSnapshot,
    /// True when the preferred generation was not the one loaded
    pub fell_back: bool,
}

/// Manages snapshot generations inside a store directory
pub struct SnapshotManager {
    /// Store directory
    dir: PathBuf,

    /// Next generation number to write
    next_generation: u64,
}

impl SnapshotManager {
    /// Scan `dir` for snapshot files
    pub fn open(dir: &Path) -> Result<Self> {
        let newest = Self::discover(dir)?.first().copied().unwrap_or(0);
        Ok(Self {
            dir: dir.to_path_buf(),
            next_generation: newest + 1,
        })
    }

    /// Generations present on disk, newest first
    pub fn generations(&self) -> Result<Vec<u64>> {
        Self::discover(&self.dir)
    }

    /// Load `preferred` (0 = none recorded), otherwise the newest loadable
    ///
    /// Fails with `Format` only when a snapshot was expected and none of the
    /// files on disk can be read.
    pub fn load(&self, preferred: u64) -> Result<LoadOutcome> {
        let mut candidates = Vec::new();
        if preferred > 0 {
            candidates.push(preferred);
        }
        candidates.extend(self.generations()?.into_iter().filter(|&g| g != preferred));

        let mut last_error = None;
        for generation in candidates {
            match SnapshotReader::load(&self.snapshot_path(generation)) {
                Ok(snapshot) => {
                    return Ok(LoadOutcome {
                        generation: Some(generation),
                        snapshot,
                        fell_back: generation != preferred && preferred > 0,
                    });
                }
                Err(AtlasError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                    tracing::warn!(generation, "snapshot file missing");
                }
                Err(e @ AtlasError::Format(_)) => {
                    tracing::warn!(generation, error = %e, "snapshot unreadable");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        if preferred == 0 {
            // Only orphans from an interrupted checkpoint, if anything
            return Ok(LoadOutcome::default());
        }

        Err(last_error.unwrap_or_else(|| {
            AtlasError::Format(format!("snapshot generation {} not found", preferred))
        }))
    }

    /// Write the registry as a new generation
    pub fn write(&mut self, last_seq: u64, registry: &CollectionRegistry) -> Result<(u64, SnapshotMeta)> {
        let generation = self.next_generation;
        let path = self.snapshot_path(generation);

        let count = u32::try_from(registry.len()).map_err(|_| {
            AtlasError::Encoding(format!("too many collections: {}", registry.len()))
        })?;

        let mut builder = SnapshotBuilder::new(&path, last_seq, count)?;
        for (name, data) in registry.iter() {
            builder.add_collection(name, data)?;
        }
        let meta = builder.finish()?;
        sync_dir(&self.dir);

        self.next_generation += 1;
        tracing::debug!(
            generation,
            entries = meta.entry_count,
            bytes = meta.file_size,
            "snapshot written"
        );
        Ok((generation, meta))
    }

    /// Delete every snapshot except `keep`; returns how many were removed
    pub fn remove_except(&self, keep: u64) -> Result<usize> {
        let mut removed = 0;
        for generation in self.generations()? {
            if generation == keep {
                continue;
            }
            match fs::remove_file(self.snapshot_path(generation)) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    /// Get the next generation (for testing/debugging)
    pub fn next_generation(&self) -> u64 {
        self.next_generation
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generate the file path for a snapshot generation
    pub fn snapshot_path(&self, generation: u64) -> PathBuf {
        self.dir.join(format!("snapshot_{:06}.snap", generation))
    }

    /// True for file names of the form "snapshot_NNNNNN.snap"
    pub fn is_snapshot_file(path: &Path) -> bool {
        Self::parse_generation(path).is_some()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn discover(dir: &Path) -> Result<Vec<u64>> {
        let mut generations = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(generation) = Self::parse_generation(&path) {
                    generations.push(generation);
                }
            }
        }
        generations.sort_unstable_by(|a, b| b.cmp(a));
        Ok(generations)
    }

    /// Parse the generation from a file name
    /// "snapshot_000042.snap" → Some(42)
    fn parse_generation(path: &Path) -> Option<u64> {
        if path.extension()? != "snap" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix("snapshot_")?.parse().ok()
    }
}

/// Best-effort fsync of a directory so new file names survive a crash
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}
