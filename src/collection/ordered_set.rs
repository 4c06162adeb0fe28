//! Ordered-set collection handle
//!
//! Set of strings in ascending byte-wise order (Rust `str` ordering, no
//! locale collation).

use std::collections::VecDeque;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use crate::error::Result;
use crate::journal::Mutation;
use crate::store::{with_core, SharedCore};

/// Members fetched per lock acquisition while iterating
const ITER_PAGE_SIZE: usize = 256;

/// Handle to an ordered-set collection inside an open [`Store`](crate::Store)
#[derive(Clone)]
pub struct OrderedSetCollection {
    shared: SharedCore,
    name: Arc<str>,
}

impl OrderedSetCollection {
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

    /// Insert `value`; `true` if it was not already a member
    pub fn add(&self, value: impl Into<String>) -> Result<bool> {
        let value = value.into();
        with_core(&self.shared, |core| {
            let inserted = core
                .registry
                .ordered_set_mut(&self.name)?
                .insert(value.clone());
            if inserted {
                core.record(Mutation::Add {
                    collection: self.name.to_string(),
                    member: value,
                });
            }
            Ok(inserted)
        })
    }

    pub fn contains(&self, value: &str) -> Result<bool> {
        with_core(&self.shared, |core| {
            Ok(core.registry.ordered_set(&self.name)?.contains(value))
        })
    }

    /// Remove `value`; `true` if it was a member
    pub fn remove(&self, value: &str) -> Result<bool> {
        with_core(&self.shared, |core| {
            let removed = core.registry.ordered_set_mut(&self.name)?.remove(value);
            if removed {
                core.record(Mutation::Discard {
                    collection: self.name.to_string(),
                    member: value.to_string(),
                });
            }
            Ok(removed)
        })
    }

    /// Number of members
    pub fn size(&self) -> Result<usize> {
        with_core(&self.shared, |core| {
            Ok(core.registry.ordered_set(&self.name)?.len())
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    /// Smallest member
    pub fn first(&self) -> Result<Option<String>> {
        with_core(&self.shared, |core| {
            Ok(core.registry.ordered_set(&self.name)?.first().cloned())
        })
    }

    /// Largest member
    pub fn last(&self) -> Result<Option<String>> {
        with_core(&self.shared, |core| {
            Ok(core.registry.ordered_set(&self.name)?.last().cloned())
        })
    }

    /// Iterate all members in ascending order
    ///
    /// Each call starts a fresh pass over the current contents. See
    /// [`OrderedSetIter`] for behaviour under concurrent mutation.
    pub fn iter(&self) -> OrderedSetIter {
        OrderedSetIter::new(self.clone(), Bound::Unbounded)
    }

    /// Iterate members `>= start` in ascending order
    pub fn iter_from(&self, start: &str) -> OrderedSetIter {
        OrderedSetIter::new(self.clone(), Bound::Included(start.to_string()))
    }

    /// Up to `limit` members above `lower`
    fn page(&self, lower: Bound<&str>, limit: usize) -> Result<Vec<String>> {
        with_core(&self.shared, |core| {
            Ok(core
                .registry
                .ordered_set(&self.name)?
                .range::<str, _>((lower, Bound::Unbounded))
                .take(limit)
                .cloned()
                .collect())
        })
    }
}

impl fmt::Debug for OrderedSetCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedSetCollection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Lazy ascending iterator over an ordered set
///
/// Members are fetched in pages, each page reflecting the set at fetch time
/// and resuming strictly after the last member already yielded. Output is
/// therefore always strictly ascending without duplicates. If the set is
/// mutated mid-iteration, members inserted past the cursor may or may not be
/// seen and members removed after their page was fetched may still be
/// yielded; that interleaving is implementation-defined.
///
/// Yields `Err(Closed)` once if the store is closed mid-iteration.
pub struct OrderedSetIter {
    set: OrderedSetCollection,
    /// Lower bound of the next page
    lower: Bound<String>,
    buffer: VecDeque<String>,
    exhausted: bool,
}

impl OrderedSetIter {
    fn new(set: OrderedSetCollection, lower: Bound<String>) -> Self {
        Self {
            set,
            lower,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let lower = match &self.lower {
            Bound::Included(s) => Bound::Included(s.as_str()),
            Bound::Excluded(s) => Bound::Excluded(s.as_str()),
            Bound::Unbounded => Bound::Unbounded,
        };
        let page = self.set.page(lower, ITER_PAGE_SIZE)?;

        if page.len() < ITER_PAGE_SIZE {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.lower = Bound::Excluded(last.clone());
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for OrderedSetIter {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.refill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
