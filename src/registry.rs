//! Collection Registry
//!
//! Name → contents table of one open store. Enforces that a name keeps the
//! kind it was created with, and replays journal mutations on open.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::{BTreeSet, HashMap};

use crate::collection::{CollectionData, CollectionKind};
use crate::error::{AtlasError, Result};
use crate::journal::Mutation;

/// All collections of a store, keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionRegistry {
    collections: BTreeMap<String, CollectionData>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from collections decoded out of a snapshot
    pub fn from_collections(collections: BTreeMap<String, CollectionData>) -> Self {
        Self { collections }
    }

    /// Kind of `name`, if it exists
    pub fn kind_of(&self, name: &str) -> Option<CollectionKind> {
        self.collections.get(name).map(CollectionData::kind)
    }

    /// Get-or-create `name` as `kind`
    ///
    /// Returns `true` when the collection was created. An existing
    /// collection of another kind is a `KindMismatch`.
    pub fn ensure(&mut self, name: &str, kind: CollectionKind) -> Result<bool> {
        match self.kind_of(name) {
            Some(existing) if existing == kind => Ok(false),
            Some(existing) => Err(AtlasError::KindMismatch {
                name: name.to_string(),
                existing,
                requested: kind,
            }),
            None => {
                self.collections
                    .insert(name.to_string(), CollectionData::empty(kind));
                Ok(true)
            }
        }
    }

    /// Remove `name` and its contents; `true` if it existed
    pub fn remove(&mut self, name: &str) -> bool {
        self.collections.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&CollectionData> {
        self.collections.get(name)
    }

    pub fn hash(&self, name: &str) -> Result<&HashMap<String, String>> {
        match self.collections.get(name) {
            Some(CollectionData::Hash(map)) => Ok(map),
            Some(other) => Err(mismatch(name, other.kind(), CollectionKind::Hash)),
            None => Err(AtlasError::CollectionNotFound(name.to_string())),
        }
    }

    pub fn hash_mut(&mut self, name: &str) -> Result<&mut HashMap<String, String>> {
        match self.collections.get_mut(name) {
            Some(CollectionData::Hash(map)) => Ok(map),
            Some(other) => Err(mismatch(name, other.kind(), CollectionKind::Hash)),
            None => Err(AtlasError::CollectionNotFound(name.to_string())),
        }
    }

    pub fn ordered_set(&self, name: &str) -> Result<&BTreeSet<String>> {
        match self.collections.get(name) {
            Some(CollectionData::OrderedSet(set)) => Ok(set),
            Some(other) => Err(mismatch(name, other.kind(), CollectionKind::OrderedSet)),
            None => Err(AtlasError::CollectionNotFound(name.to_string())),
        }
    }

    pub fn ordered_set_mut(&mut self, name: &str) -> Result<&mut BTreeSet<String>> {
        match self.collections.get_mut(name) {
            Some(CollectionData::OrderedSet(set)) => Ok(set),
            Some(other) => Err(mismatch(name, other.kind(), CollectionKind::OrderedSet)),
            None => Err(AtlasError::CollectionNotFound(name.to_string())),
        }
    }

    /// Apply a journaled mutation during replay
    ///
    /// A mutation that cannot apply (unknown collection, wrong kind) means
    /// the journal does not match the snapshot and is reported as `Format`.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<()> {
        let outcome = match mutation {
            Mutation::CreateCollection { name, kind } => self.ensure(name, *kind).map(|_| ()),
            Mutation::DropCollection { name } => {
                self.remove(name);
                Ok(())
            }
            Mutation::Put {
                collection,
                key,
                value,
            } => self.hash_mut(collection).map(|map| {
                map.insert(key.clone(), value.clone());
            }),
            Mutation::Remove { collection, key } => self.hash_mut(collection).map(|map| {
                map.remove(key);
            }),
            Mutation::Add { collection, member } => self.ordered_set_mut(collection).map(|set| {
                set.insert(member.clone());
            }),
            Mutation::Discard { collection, member } => {
                self.ordered_set_mut(collection).map(|set| {
                    set.remove(member);
                })
            }
        };

        outcome.map_err(|e| AtlasError::Format(format!("cannot replay {:?}: {}", mutation, e)))
    }

    /// Collections in name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, CollectionData> {
        self.collections.iter()
    }

    /// Number of collections
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

fn mismatch(name: &str, existing: CollectionKind, requested: CollectionKind) -> AtlasError {
    AtlasError::KindMismatch {
        name: name.to_string(),
        existing,
        requested,
    }
}

