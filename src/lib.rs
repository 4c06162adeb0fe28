//! # AtlasKV Store
//!
//! An embedded, file-backed store of named collections:
//! - Hash collections: unordered `String -> String`, last write wins
//! - Ordered sets: strings kept and iterated in ascending byte order
//! - Explicit lifecycle: open → mutate → commit → close
//! - Commit journal with CRC32 records and snapshot checkpoints
//! - Opens despite a header checksum mismatch (unclean shutdown)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │        HashCollection / OrderedSetCollection handles         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Store                                │
//! │     CollectionRegistry (in memory) + pending mutations       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ commit / checkpoint
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Journal   │          │  Snapshot   │
//!   │  (Append)   │          │ + Header    │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use atlaskv_store::Store;
//!
//! # fn main() -> atlaskv_store::Result<()> {
//! let store = Store::open_path("data/mydata")?;
//! let kv = store.hash("kv")?;
//! kv.put("x", "1")?;
//! store.commit()?;
//! store.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod observer;

pub mod journal;
pub mod storage;
pub mod registry;
pub mod collection;
pub mod store;
pub mod json;
pub mod persistent;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use collection::{CollectionKind, HashCollection, OrderedSetCollection, OrderedSetIter};
pub use config::{Config, SyncStrategy};
pub use error::{AtlasError, Result};
pub use observer::{StoreEvent, StoreObserver, TracingObserver};
pub use persistent::{PersistentCollection, PersistentMap, PersistentSet};
pub use storage::HeaderStatus;
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasKV Store
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
