//! Single-collection stores
//!
//! [`PersistentMap`] and [`PersistentSet`] open a store directory and one
//! named collection inside it, and own both. They suit callers that keep one
//! collection per store and want `open(path, name)` / `shut_down()`.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::collection::{CollectionKind, HashCollection, OrderedSetCollection, OrderedSetIter};
use crate::config::Config;
use crate::error::Result;
use crate::json::JsonObject;
use crate::store::Store;

/// Open `collection` of `kind` in the store at `path`
pub fn open(
    path: impl AsRef<Path>,
    collection: &str,
    kind: CollectionKind,
) -> Result<PersistentCollection> {
    let config = Config::builder().path(path.as_ref()).build();
    match kind {
        CollectionKind::Hash => {
            PersistentMap::open_with_config(config, collection).map(PersistentCollection::Map)
        }
        CollectionKind::OrderedSet => {
            PersistentSet::open_with_config(config, collection).map(PersistentCollection::Set)
        }
    }
}

/// Either kind of single-collection store
#[derive(Debug)]
pub enum PersistentCollection {
    Map(PersistentMap),
    Set(PersistentSet),
}

impl PersistentCollection {
    pub fn kind(&self) -> CollectionKind {
        match self {
            PersistentCollection::Map(_) => CollectionKind::Hash,
            PersistentCollection::Set(_) => CollectionKind::OrderedSet,
        }
    }

    pub fn store(&self) -> &Store {
        match self {
            PersistentCollection::Map(map) => map.store(),
            PersistentCollection::Set(set) => set.store(),
        }
    }

    pub fn commit(&self) -> Result<()> {
        self.store().commit()
    }

    pub fn shut_down(&self) -> Result<()> {
        self.store().shut_down()
    }
}

// =============================================================================
// PersistentMap
// =============================================================================

/// A store holding one hash collection
pub struct PersistentMap {
    store: Store,
    map: HashCollection,
}

impl PersistentMap {
    /// e.g. `PersistentMap::open("data/mydata", "mystore")`
    pub fn open(path: impl AsRef<Path>, name: &str) -> Result<Self> {
        Self::open_with_config(Config::builder().path(path.as_ref()).build(), name)
    }

    pub fn open_with_config(config: Config, name: &str) -> Result<Self> {
        let store = Store::open(config)?;
        let map = store.hash(name)?;
        Ok(Self { store, map })
    }

    /// `true` if this overwrote a previous value
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<bool> {
        self.map.put(key, value)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        self.map.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Result<Option<String>> {
        self.map.remove(key)
    }

    pub fn size(&self) -> Result<usize> {
        self.map.size()
    }

    pub fn put_json<T>(&self, key: impl Into<String>, value: &T) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        self.map.put_json(key, value)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.map.get_json(key)
    }

    pub fn get_json_object(&self, key: &str) -> Result<Option<JsonObject>> {
        self.map.get_json_object(key)
    }

    pub fn commit(&self) -> Result<()> {
        self.store.commit()
    }

    /// Commit and close; later calls are no-ops
    pub fn shut_down(&self) -> Result<()> {
        self.store.shut_down()
    }

    pub fn is_closed(&self) -> bool {
        self.store.is_closed()
    }

    pub fn collection(&self) -> &HashCollection {
        &self.map
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl std::fmt::Debug for PersistentMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentMap")
            .field("path", &self.store.path())
            .field("collection", &self.map.name())
            .finish()
    }
}

// =============================================================================
// PersistentSet
// =============================================================================

/// A store holding one ordered-set collection
pub struct PersistentSet {
    store: Store,
    set: OrderedSetCollection,
}

impl PersistentSet {
    pub fn open(path: impl AsRef<Path>, name: &str) -> Result<Self> {
        Self::open_with_config(Config::builder().path(path.as_ref()).build(), name)
    }

    pub fn open_with_config(config: Config, name: &str) -> Result<Self> {
        let store = Store::open(config)?;
        let set = store.ordered_set(name)?;
        Ok(Self { store, set })
    }

    /// `true` if `value` was added
    pub fn add(&self, value: impl Into<String>) -> Result<bool> {
        self.set.add(value)
    }

    pub fn contains(&self, value: &str) -> Result<bool> {
        self.set.contains(value)
    }

    /// `true` if `value` was removed
    pub fn remove(&self, value: &str) -> Result<bool> {
        self.set.remove(value)
    }

    pub fn size(&self) -> Result<usize> {
        self.set.size()
    }

    /// Members in ascending order
    pub fn iter(&self) -> OrderedSetIter {
        self.set.iter()
    }

    pub fn commit(&self) -> Result<()> {
        self.store.commit()
    }

    /// Commit and close; later calls are no-ops
    pub fn shut_down(&self) -> Result<()> {
        self.store.shut_down()
    }

    pub fn is_closed(&self) -> bool {
        self.store.is_closed()
    }

    pub fn collection(&self) -> &OrderedSetCollection {
        &self.set
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl std::fmt::Debug for PersistentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentSet")
            .field("path", &self.store.path())
            .field("collection", &self.set.name())
            .finish()
    }
}
