//! Collection Module
//!
//! Named sub-structures of a store and the handles used to reach them.
//!
//! ## Kinds
//! - **Hash**: unordered `String -> String` map, last write wins
//! - **OrderedSet**: set of strings kept in ascending byte-wise order
//!
//! A handle never owns durable state. It names a collection inside the
//! store it came from and locks that store for every call.

mod hash;
mod ordered_set;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

pub use hash::HashCollection;
pub use ordered_set::{OrderedSetCollection, OrderedSetIter};

/// The kind a collection was created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Hash,
    OrderedSet,
}

impl CollectionKind {
    /// On-disk tag used by snapshots
    pub(crate) fn tag(self) -> u8 {
        match self {
            CollectionKind::Hash => 1,
            CollectionKind::OrderedSet => 2,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(CollectionKind::Hash),
            2 => Some(CollectionKind::OrderedSet),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::Hash => f.write_str("hash"),
            CollectionKind::OrderedSet => f.write_str("ordered set"),
        }
    }
}

/// In-memory contents of one collection
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionData {
    Hash(HashMap<String, String>),
    OrderedSet(BTreeSet<String>),
}

impl CollectionData {
    /// Create empty contents for a kind
    pub fn empty(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::Hash => CollectionData::Hash(HashMap::new()),
            CollectionKind::OrderedSet => CollectionData::OrderedSet(BTreeSet::new()),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self {
            CollectionData::Hash(_) => CollectionKind::Hash,
            CollectionData::OrderedSet(_) => CollectionKind::OrderedSet,
        }
    }

    /// Number of keys (hash) or members (ordered set)
    pub fn len(&self) -> usize {
        match self {
            CollectionData::Hash(map) => map.len(),
            CollectionData::OrderedSet(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
