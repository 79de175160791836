//! The owning handle of a trie.

use std::sync::Arc;

use super::{Inserter, InserterConfig, Leaf};
use crate::error::TrieError;
use crate::path::{Pair, Path};
use crate::tracing_helpers::trace_log;

/// A root leaf together with the inserter used to grow it.
///
/// `Trie` is `Send + Sync`; share it behind an `Arc` and call every method
/// from as many threads as needed.
///
/// # Examples
///
/// ```rust
/// use pathtrie::{Path, Trie};
///
/// let trie = Trie::new();
/// let path = Path::from([(1, 4), (2, 8)]);
///
/// trie.insert(&path, 10).unwrap();
/// trie.insert(&path, 11).unwrap();
///
/// let mut ids = Vec::new();
/// trie.find_leaf(&path).unwrap().append_to(&mut ids);
/// assert_eq!(ids, vec![10, 11]);
///
/// assert!(trie.remove(&path, 10));
/// assert!(trie.remove(&path, 11));
/// let leaf = trie.find_leaf(&path).unwrap();
/// assert_eq!(trie.prune(&leaf), 2);
/// assert!(trie.is_empty());
/// ```
#[derive(Debug)]
pub struct Trie {
    root: Arc<Leaf>,
    inserter: Inserter,
}

impl Trie {
    /// An empty trie with a default inserter.
    #[must_use]
    pub fn new() -> Self {
        Self::with_inserter(Inserter::new())
    }

    /// An empty trie whose inserter is built from `config`.
    #[must_use]
    pub fn with_config(config: &InserterConfig) -> Self {
        Self::with_inserter(Inserter::from_config(config))
    }

    /// An empty trie grown by `inserter`.
    #[must_use]
    pub fn with_inserter(inserter: Inserter) -> Self {
        Self {
            root: Leaf::root(),
            inserter,
        }
    }

    /// The root leaf.
    #[inline]
    pub const fn root(&self) -> &Arc<Leaf> {
        &self.root
    }

    /// The inserter.
    #[inline]
    pub const fn inserter(&self) -> &Inserter {
        &self.inserter
    }

    /// See [`Inserter::insert`].
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::CapacityExhausted`] if the target leaf's value set
    /// could not be promoted.
    pub fn insert(&self, path: &Path, id: u64) -> Result<bool, TrieError> {
        self.inserter.insert(&self.root, path, id)
    }

    /// See [`Inserter::force_insert`].
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::CapacityExhausted`] if the target leaf's value set
    /// could not be promoted.
    pub fn force_insert(&self, pairs: &[Pair], id: u64) -> Result<bool, TrieError> {
        self.inserter.force_insert(&self.root, pairs, id)
    }

    /// See [`Inserter::get_leaf`].
    pub fn get_leaf(&self, path: &Path) -> Arc<Leaf> {
        self.inserter.get_leaf(&self.root, path)
    }

    /// See [`Inserter::find_leaf`].
    pub fn find_leaf(&self, path: &Path) -> Option<Arc<Leaf>> {
        self.inserter.find_leaf(&self.root, path)
    }

    /// Detaches `id` from the leaf for `path`.
    ///
    /// Returns `false` if the leaf does not exist or did not hold `id`.
    /// Emptied structure stays in place until [`Trie::prune`] is called.
    pub fn remove(&self, path: &Path, id: u64) -> bool {
        self.find_leaf(path).is_some_and(|leaf| leaf.remove(id))
    }

    /// Detaches `leaf` and its ancestors for as long as they are empty.
    ///
    /// Stops at the first non-empty level or at the root, which is never
    /// removed. Returns the number of leaves detached.
    ///
    /// An insert racing with a prune along the same branch may attach its id
    /// to a leaf that is being detached; callers that prune must not insert
    /// into that branch concurrently.
    pub fn prune(&self, leaf: &Arc<Leaf>) -> usize {
        let mut removed = 0;
        let mut current = Arc::clone(leaf);
        while let Some(node) = current.parent() {
            if node.remove_empty_leaf(current.value()).is_none() {
                break;
            }
            removed += 1;
            let Some(owner) = node.parent() else {
                break;
            };
            if owner.remove_empty_child(node.key()).is_none() {
                break;
            }
            trace_log!(key = node.key(), "pruned empty node");
            current = owner;
        }
        removed
    }

    /// Returns `true` if nothing is attached anywhere.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}
