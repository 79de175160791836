//! Copy-on-write sorted collection of trie children.
//!
//! [`ChildSet`] keeps its elements in a vector sorted by [`Keyed::key`]. The
//! vector is never modified after it is published: every structural change
//! builds a new vector and swaps the shared handle, so a reader that cloned
//! the handle keeps a consistent snapshot for as long as it likes.
//!
//! # Locking
//!
//! The handle lives in an `arc_swap::ArcSwap`. Readers load it without
//! taking any lock, so they never wait on a writer.
//!
//! Writers serialise on a `parking_lot::Mutex`, build the new vector and
//! store it. Because writers are serialised, check-then-insert sequences
//! such as [`ChildSet::get_or_insert_with`] create at most one element per
//! key.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use pathtrie::collections::{ChildSet, Keyed};
//!
//! struct Child(u64);
//!
//! impl Keyed for Child {
//!     fn key(&self) -> u64 {
//!         self.0
//!     }
//! }
//!
//! let children = ChildSet::new();
//! children.upsert(Arc::new(Child(3)));
//! children.upsert(Arc::new(Child(1)));
//!
//! let (child, inserted) = children.get_or_insert_with(3, || Arc::new(Child(3)));
//! assert!(!inserted);
//! assert_eq!(child.key(), 3);
//!
//! let found = children.probe_any([7, 1, 3]);
//! assert_eq!(found.map(|child| child.key()), Some(1));
//! ```

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Elements stored in a [`ChildSet`] expose the key they are sorted by.
pub trait Keyed {
    /// The key of this element. Must not change once the element is stored.
    fn key(&self) -> u64;
}

/// An immutable, sorted view of a [`ChildSet`].
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

#[inline]
fn search<T: Keyed>(items: &[Arc<T>], key: u64) -> Result<usize, usize> {
    items.binary_search_by_key(&key, |item| item.key())
}

#[inline]
fn lower_bound<T: Keyed>(items: &[Arc<T>], key: u64) -> usize {
    items.partition_point(|item| item.key() < key)
}

fn first_match<T, I>(items: &[Arc<T>], candidates: I) -> Option<Arc<T>>
where
    T: Keyed,
    I: IntoIterator<Item = u64>,
{
    if items.is_empty() {
        return None;
    }
    candidates
        .into_iter()
        .find_map(|key| search(items, key).ok().map(|index| Arc::clone(&items[index])))
}

fn with_inserted<T>(items: &[Arc<T>], index: usize, element: Arc<T>) -> Vec<Arc<T>> {
    let mut next = Vec::with_capacity(items.len() + 1);
    next.extend_from_slice(&items[..index]);
    next.push(element);
    next.extend_from_slice(&items[index..]);
    next
}

fn with_removed<T>(items: &[Arc<T>], index: usize) -> Vec<Arc<T>> {
    let mut next = Vec::with_capacity(items.len() - 1);
    next.extend_from_slice(&items[..index]);
    next.extend_from_slice(&items[index + 1..]);
    next
}

/// A concurrent sorted collection of `Arc<T>` keyed by a `u64`.
pub struct ChildSet<T> {
    items: ArcSwap<Vec<Arc<T>>>,
    writer: Mutex<()>,
}

impl<T: Keyed> ChildSet<T> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    /// Returns the current snapshot.
    #[inline]
    pub fn snapshot(&self) -> Snapshot<T> {
        self.items.load_full()
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.load().len()
    }

    /// Returns `true` if there are no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.load().is_empty()
    }

    /// Returns `true` if an element with `key` exists.
    pub fn has(&self, key: u64) -> bool {
        search(self.items.load().as_slice(), key).is_ok()
    }

    /// Returns the element with `key`.
    pub fn get(&self, key: u64) -> Option<Arc<T>> {
        let items = self.snapshot();
        search(items.as_slice(), key)
            .ok()
            .map(|index| Arc::clone(&items[index]))
    }

    /// Stores `element`, replacing the element with the same key.
    ///
    /// Returns the replaced element.
    pub fn upsert(&self, element: Arc<T>) -> Option<Arc<T>> {
        let _writer = self.writer.lock();
        let items = self.items.load_full();
        let (next, previous) = match search(items.as_slice(), element.key()) {
            Ok(index) => {
                let mut next = (*items).clone();
                let previous = std::mem::replace(&mut next[index], element);
                (next, Some(previous))
            }
            Err(index) => (with_inserted(items.as_slice(), index, element), None),
        };
        self.items.store(Arc::new(next));
        previous
    }

    /// Returns the element with `key`, creating it with `factory` if absent.
    ///
    /// The boolean is `true` if this call created the element. Concurrent
    /// callers for the same key all receive the one element that was stored.
    ///
    /// # Panics
    ///
    /// Panics if `factory` returns an element whose key is not `key`.
    pub fn get_or_insert_with<F>(&self, key: u64, factory: F) -> (Arc<T>, bool)
    where
        F: FnOnce() -> Arc<T>,
    {
        if let Some(existing) = self.get(key) {
            return (existing, false);
        }
        let _writer = self.writer.lock();
        let items = self.items.load_full();
        let index = match search(items.as_slice(), key) {
            Ok(index) => return (Arc::clone(&items[index]), false),
            Err(index) => index,
        };
        let element = factory();
        assert_eq!(element.key(), key, "factory produced an element with a different key");
        self.items
            .store(Arc::new(with_inserted(items.as_slice(), index, Arc::clone(&element))));
        (element, true)
    }

    /// Removes and returns the element with `key`.
    pub fn delete(&self, key: u64) -> Option<Arc<T>> {
        self.delete_if(key, |_| true)
    }

    /// Removes the element with `key` only if `predicate` holds for it.
    ///
    /// The predicate runs while other writers are excluded, so the element
    /// cannot be replaced between the check and the removal. Readers are
    /// not excluded and keep seeing the element until it is removed.
    pub fn delete_if<P>(&self, key: u64, predicate: P) -> Option<Arc<T>>
    where
        P: FnOnce(&T) -> bool,
    {
        if !self.has(key) {
            return None;
        }
        let _writer = self.writer.lock();
        let items = self.items.load_full();
        let index = search(items.as_slice(), key).ok()?;
        if !predicate(&*items[index]) {
            return None;
        }
        let removed = Arc::clone(&items[index]);
        self.items.store(Arc::new(with_removed(items.as_slice(), index)));
        Some(removed)
    }

    /// Calls `function` on every element in ascending key order.
    ///
    /// Iterates a snapshot; changes made meanwhile are not observed. Returns
    /// `true` if every element was visited.
    pub fn ascend<F>(&self, mut function: F) -> bool
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        self.snapshot().iter().all(|item| function(item))
    }

    /// Calls `function` on every element with `low <= key <= high`.
    pub fn ascend_range<F>(&self, low: u64, high: u64, mut function: F) -> bool
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        let items = self.snapshot();
        let start = lower_bound(items.as_slice(), low);
        items[start..]
            .iter()
            .take_while(|item| item.key() <= high)
            .all(|item| function(item))
    }

    /// Returns the first element whose key appears in `candidates`.
    ///
    /// Candidates are tried in the order given.
    pub fn probe_any<I>(&self, candidates: I) -> Option<Arc<T>>
    where
        I: IntoIterator<Item = u64>,
    {
        first_match(self.snapshot().as_slice(), candidates)
    }

    /// Like [`ChildSet::probe_any`], but stores the element built by
    /// `factory` when no candidate matches.
    ///
    /// The probe is repeated from the first candidate once writers are
    /// excluded, so of several callers racing to insert, only the first one
    /// runs its factory; the rest receive its element. The boolean is `true`
    /// if this call inserted.
    ///
    /// # Panics
    ///
    /// Panics if the factory's element collides with an existing key.
    pub fn probe_or_insert_with<I, F>(&self, candidates: I, factory: F) -> (Arc<T>, bool)
    where
        I: IntoIterator<Item = u64> + Clone,
        F: FnOnce() -> Arc<T>,
    {
        if let Some(existing) = self.probe_any(candidates.clone()) {
            return (existing, false);
        }
        let _writer = self.writer.lock();
        let items = self.items.load_full();
        if let Some(existing) = first_match(items.as_slice(), candidates) {
            return (existing, false);
        }
        let element = factory();
        let Err(index) = search(items.as_slice(), element.key()) else {
            panic!("child with key {} is already attached", element.key());
        };
        self.items
            .store(Arc::new(with_inserted(items.as_slice(), index, Arc::clone(&element))));
        (element, true)
    }
}

impl<T: Keyed> Default for ChildSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> fmt::Debug for ChildSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.snapshot().iter().map(|item| item.key()))
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
