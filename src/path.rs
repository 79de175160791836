//! Multi-key paths.
//!
//! A [`Path`] is a set of `(key, value)` [`Pair`]s where every key appears at
//! most once. Pairs are kept sorted by key so lookups are binary searches and
//! traversal order is deterministic regardless of the order the caller
//! supplied them in.
//!
//! # Examples
//!
//! ```rust
//! use pathtrie::{Pair, Path};
//!
//! let path = Path::from([(3, 30), (1, 10), (2, 20)]);
//! assert_eq!(path.get(2), Some(20));
//! assert_eq!(path.min(), Some(Pair::new(1, 10)));
//!
//! // Removal returns a new path, the original is untouched
//! let shorter = path.without(1);
//! assert_eq!(shorter.len(), 2);
//! assert_eq!(path.len(), 3);
//! ```

use smallvec::SmallVec;

/// Number of pairs stored inline before a path spills to the heap.
const INLINE_PAIRS: usize = 8;

/// A single `(dimension key, dimension value)` pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pair {
    /// The dimension key.
    pub key: u64,
    /// The value of the dimension.
    pub value: u64,
}

impl Pair {
    /// Creates a new pair.
    #[inline]
    #[must_use]
    pub const fn new(key: u64, value: u64) -> Self {
        Self { key, value }
    }
}

impl From<(u64, u64)> for Pair {
    #[inline]
    fn from((key, value): (u64, u64)) -> Self {
        Self::new(key, value)
    }
}

/// Position inside a [`Path`], used for ordered traversal.
///
/// A cursor is only meaningful for the path that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(usize);

/// An immutable set of pairs, sorted by key.
///
/// Constructing a path from pairs with a repeated key keeps the value that
/// came last.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "Vec<Pair>", into = "Vec<Pair>")
)]
pub struct Path {
    pairs: SmallVec<[Pair; INLINE_PAIRS]>,
}

impl Path {
    /// Creates an empty path.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            pairs: SmallVec::new(),
        }
    }

    fn from_unsorted(mut pairs: SmallVec<[Pair; INLINE_PAIRS]>) -> Self {
        pairs.sort_by_key(|pair| pair.key);
        // `dedup_by` hands us (later, retained); copy the later value back so
        // the last occurrence of a key wins.
        pairs.dedup_by(|later, retained| {
            if later.key == retained.key {
                retained.value = later.value;
                true
            } else {
                false
            }
        });
        Self { pairs }
    }

    /// Returns the number of pairs.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the path has no pairs.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[inline]
    fn search(&self, key: u64) -> Result<usize, usize> {
        self.pairs.binary_search_by_key(&key, |pair| pair.key)
    }

    /// Returns the value stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pathtrie::Path;
    ///
    /// let path = Path::from([(1, 10)]);
    /// assert_eq!(path.get(1), Some(10));
    /// assert_eq!(path.get(2), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn get(&self, key: u64) -> Option<u64> {
        self.search(key).ok().map(|index| self.pairs[index].value)
    }

    /// Returns `true` if the path has a pair for `key`.
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: u64) -> bool {
        self.search(key).is_ok()
    }

    /// Returns a path without the pair for `key`.
    ///
    /// If there is no such pair the result equals `self`.
    #[must_use]
    pub fn without(&self, key: u64) -> Self {
        let mut pairs = self.pairs.clone();
        if let Ok(index) = self.search(key) {
            pairs.remove(index);
        }
        Self { pairs }
    }

    /// Returns a path with `pair` added, replacing any pair with the same key.
    #[must_use]
    pub fn with(&self, pair: Pair) -> Self {
        let mut pairs = self.pairs.clone();
        match self.search(pair.key) {
            Ok(index) => pairs[index] = pair,
            Err(index) => pairs.insert(index, pair),
        }
        Self { pairs }
    }

    /// Returns the pair with the smallest key.
    #[inline]
    #[must_use]
    pub fn min(&self) -> Option<Pair> {
        self.pairs.first().copied()
    }

    /// Returns the pair with the largest key.
    #[inline]
    #[must_use]
    pub fn max(&self) -> Option<Pair> {
        self.pairs.last().copied()
    }

    /// Returns a cursor at the first pair.
    #[inline]
    #[must_use]
    pub const fn begin(&self) -> Cursor {
        Cursor(0)
    }

    /// Returns a cursor at the last pair together with that pair.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<(Cursor, Pair)> {
        self.pairs
            .len()
            .checked_sub(1)
            .map(|index| (Cursor(index), self.pairs[index]))
    }

    /// Returns the key under `cursor` and the cursor of the following pair.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pathtrie::Path;
    ///
    /// let path = Path::from([(2, 0), (1, 0)]);
    /// let (cursor, first) = path.next_key(path.begin()).unwrap();
    /// let (cursor, second) = path.next_key(cursor).unwrap();
    /// assert_eq!((first, second), (1, 2));
    /// assert!(path.next_key(cursor).is_none());
    /// ```
    #[inline]
    #[must_use]
    pub fn next_key(&self, cursor: Cursor) -> Option<(Cursor, u64)> {
        self.pairs
            .get(cursor.0)
            .map(|pair| (Cursor(cursor.0 + 1), pair.key))
    }

    /// Walks the pairs before `cursor` from back to front.
    ///
    /// The walk stops as soon as `function` returns `false`. Returns `true` if
    /// every pair was visited.
    pub fn descend<F>(&self, cursor: Cursor, mut function: F) -> bool
    where
        F: FnMut(Pair) -> bool,
    {
        let end = cursor.0.min(self.pairs.len());
        self.pairs[..end].iter().rev().all(|&pair| function(pair))
    }

    /// Returns a restartable iterator over the keys in ascending order.
    #[inline]
    #[must_use]
    pub const fn keys(&self) -> Keys<'_> {
        Keys {
            path: self,
            cursor: Some(self.begin()),
        }
    }

    /// Returns an iterator over the pairs in ascending key order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Pair> {
        self.pairs.iter()
    }

    /// Returns the pairs as a slice sorted by key.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Pair] {
        &self.pairs
    }
}

/// Iterator over the keys of a [`Path`], driven by [`Path::next_key`].
///
/// Cloning the iterator before it is advanced gives a fresh pass over the
/// same keys.
#[derive(Clone, Debug)]
pub struct Keys<'a> {
    path: &'a Path,
    cursor: Option<Cursor>,
}

impl Iterator for Keys<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        let (next, key) = self.path.next_key(self.cursor?)?;
        self.cursor = Some(next);
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .cursor
            .map_or(0, |cursor| self.path.len().saturating_sub(cursor.0));
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Keys<'_> {}

impl FromIterator<Pair> for Path {
    fn from_iter<I: IntoIterator<Item = Pair>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(u64, u64); N]> for Path {
    fn from(pairs: [(u64, u64); N]) -> Self {
        pairs.into_iter().map(Pair::from).collect()
    }
}

impl From<&[Pair]> for Path {
    fn from(pairs: &[Pair]) -> Self {
        pairs.iter().copied().collect()
    }
}

impl From<Vec<Pair>> for Path {
    fn from(pairs: Vec<Pair>) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<Path> for Vec<Pair> {
    fn from(path: Path) -> Self {
        path.pairs.into_vec()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Pair;
    type IntoIter = std::slice::Iter<'a, Pair>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
