//! Adaptive set of identifiers attached to a leaf.
//!
//! This module provides [`ValueSet`], which stores small sets in a sorted
//! fixed-capacity array and promotes itself to an [`IdTree`] once the array
//! is full.
//!
//! # State Transitions
//!
//! ```text
//!                  append (array full)
//!     Array ─────────────────────────────► Tree
//!       ▲                                    │
//!       │        remove (tree empty)         │
//!       └────────────────────────────────────┘
//!         (fresh empty array, no demotion)
//! ```
//!
//! Promotion is one-way: a tree that shrinks stays a tree until it is empty,
//! at which point it is dropped in favour of a fresh empty array.
//!
//! Both representations are persistent. Cloning a `ValueSet` is O(1) and the
//! clone is never affected by later mutations of the original, so the owning
//! leaf can hand out snapshots and iterate them without holding its lock.
//!
//! # Examples
//!
//! ```rust
//! use pathtrie::collections::{ValueSet, DEGREE};
//!
//! let mut set = ValueSet::new();
//! for id in 0..=DEGREE as u64 {
//!     assert!(set.append(id).unwrap());
//! }
//! assert!(set.is_promoted());
//! assert_eq!(set.len(), DEGREE + 1);
//! ```

use arrayvec::ArrayVec;
use std::fmt;
use std::sync::Arc;

use super::IdTree;
use crate::error::TrieError;
use crate::tracing_helpers::{debug_log, trace_log};

/// Capacity of the array representation and minimum degree of the tree.
pub const DEGREE: usize = 128;

type IdArray = ArrayVec<u64, DEGREE>;

#[derive(Clone)]
enum Representation {
    Array(Arc<IdArray>),
    Tree(IdTree),
}

/// A sorted set of ids that switches from an array to a B-tree under load.
#[derive(Clone)]
pub struct ValueSet {
    inner: Representation,
}

impl ValueSet {
    /// Creates an empty set in array form.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Representation::Array(Arc::new(IdArray::new())),
        }
    }

    /// Creates an array-form set holding a single id.
    #[must_use]
    pub fn singleton(id: u64) -> Self {
        let mut array = IdArray::new();
        array.push(id);
        Self {
            inner: Representation::Array(Arc::new(array)),
        }
    }

    /// Collects `ids` into a set, promoting it as needed.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::CapacityExhausted`] if promotion could not
    /// allocate.
    pub fn try_from_ids<I>(ids: I) -> Result<Self, TrieError>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut set = Self::new();
        for id in ids {
            set.append(id)?;
        }
        Ok(set)
    }

    /// Returns the number of ids.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.inner {
            Representation::Array(array) => array.len(),
            Representation::Tree(tree) => tree.len(),
        }
    }

    /// Returns `true` if the set holds no ids.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once the set has been promoted to its tree form.
    #[inline]
    #[must_use]
    pub const fn is_promoted(&self) -> bool {
        matches!(self.inner, Representation::Tree(_))
    }

    /// Returns `true` if `id` is in the set.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        match &self.inner {
            Representation::Array(array) => array.binary_search(&id).is_ok(),
            Representation::Tree(tree) => tree.contains(id),
        }
    }

    /// Adds `id`. Returns `true` if it was not present.
    ///
    /// When the array is full the set is promoted first: the tree is built
    /// completely from the array contents and only then swapped in, after
    /// which `id` is inserted into the tree.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::CapacityExhausted`] if the tree cannot be
    /// allocated. The set is unchanged in that case.
    pub fn append(&mut self, id: u64) -> Result<bool, TrieError> {
        if let Representation::Array(array) = &self.inner
            && array.is_full()
        {
            self.promote()?;
        }
        match &mut self.inner {
            Representation::Tree(tree) => Ok(tree.insert(id)),
            Representation::Array(array) => match array.binary_search(&id) {
                Ok(_) => Ok(false),
                Err(position) => {
                    Arc::make_mut(array).insert(position, id);
                    Ok(true)
                }
            },
        }
    }

    fn promote(&mut self) -> Result<(), TrieError> {
        let Representation::Array(array) = &self.inner else {
            return Ok(());
        };
        let tree = IdTree::try_from_sorted(array.as_slice(), DEGREE).map_err(|source| {
            TrieError::CapacityExhausted {
                requested: array.len(),
                source,
            }
        })?;
        debug_log!(ids = tree.len(), "value set promoted to tree");
        self.inner = Representation::Tree(tree);
        Ok(())
    }

    /// Removes `id`. Returns `true` if it was present.
    pub fn remove(&mut self, id: u64) -> bool {
        match &mut self.inner {
            Representation::Array(array) => match array.binary_search(&id) {
                Ok(position) => {
                    Arc::make_mut(array).remove(position);
                    true
                }
                Err(_) => false,
            },
            Representation::Tree(tree) => {
                let removed = tree.remove(id);
                if tree.is_empty() {
                    trace_log!("emptied value tree replaced by array");
                    *self = Self::new();
                }
                removed
            }
        }
    }

    /// Calls `function` on every id in ascending order.
    ///
    /// Stops as soon as `function` returns `false`. Returns `true` if every
    /// id was visited.
    pub fn ascend<F>(&self, mut function: F) -> bool
    where
        F: FnMut(u64) -> bool,
    {
        match &self.inner {
            Representation::Array(array) => array.iter().all(|&id| function(id)),
            Representation::Tree(tree) => tree.ascend(function),
        }
    }

    /// Appends every id to `output` in ascending order.
    pub fn append_to(&self, output: &mut Vec<u64>) {
        match &self.inner {
            Representation::Array(array) => output.extend_from_slice(array.as_slice()),
            Representation::Tree(tree) => tree.append_to(output),
        }
    }

    /// Returns the ids as a sorted vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u64> {
        let mut output = Vec::with_capacity(self.len());
        self.append_to(&mut output);
        output
    }

    /// Approximate heap bytes held by the representation.
    pub(crate) fn heap_size(&self) -> usize {
        match &self.inner {
            Representation::Array(_) => std::mem::size_of::<IdArray>(),
            Representation::Tree(tree) => {
                tree.len() * std::mem::size_of::<u64>()
                    + tree.node_count() * std::mem::size_of::<Vec<u64>>() * 2
            }
        }
    }
}

impl Default for ValueSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValueSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.to_vec()).finish()
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.to_vec() == other.to_vec()
    }
}

impl Eq for ValueSet {}

impl FromIterator<u64> for ValueSet {
    /// Collects ids into a set.
    ///
    /// # Panics
    ///
    /// Panics if promotion runs out of memory. Use
    /// [`ValueSet::try_from_ids`] to handle that case.
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        match Self::try_from_ids(iter) {
            Ok(set) => set,
            Err(error) => panic!("{error}"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_degree_constant() {
        assert_eq!(DEGREE, 128);
    }

    #[rstest]
    fn test_new_is_empty_array() {
        let set = ValueSet::new();
        assert!(set.is_empty());
        assert!(!set.is_promoted());
    }

    #[rstest]
    #[case(0, false)]
    #[case(DEGREE as u64, false)]
    #[case(DEGREE as u64 + 1, true)]
    fn test_try_from_ids(#[case] count: u64, #[case] promoted: bool) {
        let set = ValueSet::try_from_ids((0..count).rev()).unwrap();
        assert_eq!(set.len(), count as usize);
        assert_eq!(set.is_promoted(), promoted);
        assert_eq!(set.to_vec(), (0..count).collect::<Vec<_>>());
        assert_eq!(set, (0..count).collect::<ValueSet>());
    }

    #[rstest]
    fn test_full_array_stays_array() {
        let set: ValueSet = (0..DEGREE as u64).collect();
        assert_eq!(set.len(), DEGREE);
        assert!(!set.is_promoted());
    }

    #[rstest]
    fn test_append_to_full_array_promotes() {
        let mut set: ValueSet = (0..DEGREE as u64).rev().collect();
        assert!(set.append(1_000).unwrap());
        assert!(set.is_promoted());
        let mut expected: Vec<u64> = (0..DEGREE as u64).collect();
        expected.push(1_000);
        assert_eq!(set.to_vec(), expected);
    }

    #[rstest]
    fn test_duplicate_on_full_array_still_promotes() {
        let mut set: ValueSet = (0..DEGREE as u64).collect();
        assert!(!set.append(5).unwrap());
        assert!(set.is_promoted());
        assert_eq!(set.len(), DEGREE);
    }

    #[rstest]
    fn test_shrinking_tree_is_not_demoted() {
        let mut set: ValueSet = (0..=DEGREE as u64).collect();
        for id in 1..=DEGREE as u64 {
            assert!(set.remove(id));
        }
        assert_eq!(set.len(), 1);
        assert!(set.is_promoted());
    }

    #[rstest]
    fn test_emptied_tree_resets_to_array() {
        let mut set: ValueSet = (0..=DEGREE as u64).collect();
        for id in 0..=DEGREE as u64 {
            set.remove(id);
        }
        assert!(set.is_empty());
        assert!(!set.is_promoted());
    }

    #[rstest]
    fn test_clone_is_snapshot() {
        let mut set: ValueSet = [3, 1, 2].into_iter().collect();
        let snapshot = set.clone();
        set.remove(2);
        set.append(9).unwrap();
        assert_eq!(snapshot.to_vec(), vec![1, 2, 3]);
        assert_eq!(set.to_vec(), vec![1, 3, 9]);
    }

    #[rstest]
    fn test_ascend_reports_early_stop() {
        let set: ValueSet = (0..10).collect();
        let mut count = 0;
        assert!(!set.ascend(|_| {
            count += 1;
            count < 3
        }));
        assert_eq!(count, 3);
        assert!(set.ascend(|_| true));
    }

    #[rstest]
    fn test_remove_missing() {
        let mut set = ValueSet::singleton(4);
        assert!(!set.remove(5));
        assert!(set.remove(4));
        assert!(set.is_empty());
    }
}
