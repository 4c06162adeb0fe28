//! Hash collection handle
//!
//! Unordered `String -> String` map with last-write-wins semantics.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::journal::Mutation;
use crate::store::{with_core, SharedCore};

/// Handle to a hash collection inside an open [`Store`](crate::Store)
///
/// Reads observe every mutation made through the same store, committed or
/// not. Every call fails with `Closed` once the store is closed.
#[derive(Clone)]
pub struct HashCollection {
    shared: SharedCore,
    name: Arc<str>,
}

impl HashCollection {
    pub(crate) fn new(shared: SharedCore, name: &str) -> Self {
        Self {
            shared,
            name: Arc::from(name),
        }
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or overwrite `key`
    ///
    /// Returns `true` if this replaced an existing value.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<bool> {
        let (key, value) = (key.into(), value.into());
        with_core(&self.shared, |core| {
            let previous = core
                .registry
                .hash_mut(&self.name)?
                .insert(key.clone(), value.clone());

            if previous.as_ref() != Some(&value) {
                core.record(Mutation::Put {
                    collection: self.name.to_string(),
                    key,
                    value,
                });
            }
            Ok(previous.is_some())
        })
    }

    /// Current value of `key`; `None` if never inserted or removed
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        with_core(&self.shared, |core| {
            Ok(core.registry.hash(&self.name)?.get(key).cloned())
        })
    }

    /// True iff `get(key)` would return a value (an empty string counts)
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        with_core(&self.shared, |core| {
            Ok(core.registry.hash(&self.name)?.contains_key(key))
        })
    }

    /// Remove `key`, returning its previous value
    pub fn remove(&self, key: &str) -> Result<Option<String>> {
        with_core(&self.shared, |core| {
            let previous = core.registry.hash_mut(&self.name)?.remove(key);
            if previous.is_some() {
                core.record(Mutation::Remove {
                    collection: self.name.to_string(),
                    key: key.to_string(),
                });
            }
            Ok(previous)
        })
    }

    /// Number of keys
    pub fn size(&self) -> Result<usize> {
        with_core(&self.shared, |core| Ok(core.registry.hash(&self.name)?.len()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    /// All keys, sorted
    pub fn keys(&self) -> Result<Vec<String>> {
        with_core(&self.shared, |core| {
            let mut keys: Vec<String> = core.registry.hash(&self.name)?.keys().cloned().collect();
            keys.sort_unstable();
            Ok(keys)
        })
    }

    /// All `(key, value)` pairs, sorted by key
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        with_core(&self.shared, |core| {
            let mut entries: Vec<(String, String)> = core
                .registry
                .hash(&self.name)?
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
            Ok(entries)
        })
    }
}

impl fmt::Debug for HashCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashCollection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
