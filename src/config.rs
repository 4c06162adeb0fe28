//! Configuration for AtlasKV Store
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{AtlasError, Result};
use crate::observer::{StoreObserver, TracingObserver};

/// Main configuration for a store instance
#[derive(Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory of the store
    /// Internal structure:
    ///   {path}/
    ///     ├── store.hdr               (header)
    ///     ├── journal.log             (commit journal)
    ///     └── snapshot_000001.snap    (latest checkpoint)
    pub path: PathBuf,

    /// Open even when the header checksum does not match
    pub checksum_header_bypass: bool,

    // -------------------------------------------------------------------------
    // Journal Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the journal
    pub sync_strategy: SyncStrategy,

    /// Journal size (in bytes) that triggers a checkpoint after a commit
    pub checkpoint_threshold: u64,

    // -------------------------------------------------------------------------
    // Observability
    // -------------------------------------------------------------------------
    /// Receives lifecycle events (open, bypass, recovery, commit, close)
    pub observer: Arc<dyn StoreObserver>,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every commit (safest, slowest)
    EveryCommit,

    /// fsync after N commits; commits in between only reach the OS page cache
    EveryNCommits { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./atlaskv_store"),
            checksum_header_bypass: true,
            sync_strategy: SyncStrategy::EveryCommit,
            checkpoint_threshold: 4 * 1024 * 1024, // 4 MB
            observer: Arc::new(TracingObserver),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("path", &self.path)
            .field("checksum_header_bypass", &self.checksum_header_bypass)
            .field("sync_strategy", &self.sync_strategy)
            .field("checkpoint_threshold", &self.checkpoint_threshold)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings a store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(AtlasError::Config("path must not be empty".to_string()));
        }
        if let SyncStrategy::EveryNCommits { count: 0 } = self.sync_strategy {
            return Err(AtlasError::Config(
                "EveryNCommits sync strategy needs a count of at least 1".to_string(),
            ));
        }
        if self.checkpoint_threshold == 0 {
            return Err(AtlasError::Config(
                "checkpoint_threshold must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store directory
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Allow or refuse opening a store whose header checksum is invalid
    pub fn checksum_header_bypass(mut self, bypass: bool) -> Self {
        self.config.checksum_header_bypass = bypass;
        self
    }

    /// Set the journal sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the journal size (in bytes) that triggers a checkpoint
    pub fn checkpoint_threshold(mut self, bytes: u64) -> Self {
        self.config.checkpoint_threshold = bytes;
        self
    }

    /// Replace the default tracing observer
    pub fn observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.config.observer = observer;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
