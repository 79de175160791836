//! Trie level for one dimension key.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use super::Leaf;
use crate::collections::{ChildSet, Keyed};

/// One dimension of the trie.
///
/// A node maps every observed value of its key to the [`Leaf`] reached by
/// taking that value. It is owned by the child collection of exactly one
/// leaf and points back to it without owning it.
pub struct Node {
    key: u64,
    parent: OnceLock<Weak<Leaf>>,
    leaves: ChildSet<Leaf>,
}

impl Node {
    /// A node that is not attached anywhere yet.
    pub(crate) fn detached(key: u64) -> Arc<Self> {
        Arc::new(Self {
            key,
            parent: OnceLock::new(),
            leaves: ChildSet::new(),
        })
    }

    pub(crate) fn attached(key: u64, parent: &Arc<Leaf>) -> Arc<Self> {
        let node = Self::detached(key);
        node.set_parent(parent);
        node
    }

    /// Records the leaf that owns this node.
    ///
    /// # Panics
    ///
    /// Panics if the node was already attached: a node has exactly one owner.
    pub(crate) fn set_parent(&self, parent: &Arc<Leaf>) {
        assert!(
            self.parent.set(Arc::downgrade(parent)).is_ok(),
            "node with key {} is already attached",
            self.key
        );
    }

    /// The dimension key.
    #[inline]
    pub const fn key(&self) -> u64 {
        self.key
    }

    /// The leaf owning this node, if it is attached and still alive.
    pub fn parent(&self) -> Option<Arc<Leaf>> {
        self.parent.get().and_then(Weak::upgrade)
    }

    /// Returns `true` if a leaf exists for `value`.
    pub fn has_leaf(&self, value: u64) -> bool {
        self.leaves.has(value)
    }

    /// Returns the leaf for `value`.
    pub fn get_leaf(&self, value: u64) -> Option<Arc<Leaf>> {
        self.leaves.get(value)
    }

    /// Returns the leaf for `value`, creating it if needed.
    pub fn getsert_leaf(self: &Arc<Self>, value: u64) -> Arc<Leaf> {
        self.leaves
            .get_or_insert_with(value, || Arc::new(Leaf::new(self, value)))
            .0
    }

    /// Attaches `leaf`, which must have been created for this node.
    ///
    /// # Panics
    ///
    /// Panics if a leaf for the same value is already attached.
    pub(crate) fn add_leaf(&self, leaf: Arc<Leaf>) {
        let value = leaf.value();
        if self.leaves.upsert(leaf).is_some() {
            panic!("node {} already has a leaf for value {value}", self.key);
        }
    }

    /// Detaches and returns the leaf for `value`.
    pub fn remove_leaf(&self, value: u64) -> Option<Arc<Leaf>> {
        self.leaves.delete(value)
    }

    /// Detaches the leaf for `value` if it is empty.
    pub fn remove_empty_leaf(&self, value: u64) -> Option<Arc<Leaf>> {
        self.leaves.delete_if(value, Leaf::is_empty)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// A node is empty when it has no leaves left.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Calls `function` on every leaf in ascending value order.
    pub fn ascend_children<F>(&self, function: F) -> bool
    where
        F: FnMut(&Arc<Leaf>) -> bool,
    {
        self.leaves.ascend(function)
    }

    /// Calls `function` on every leaf with `low <= value <= high`.
    pub fn ascend_children_range<F>(&self, low: u64, high: u64, function: F) -> bool
    where
        F: FnMut(&Arc<Leaf>) -> bool,
    {
        self.leaves.ascend_range(low, high, function)
    }
}

impl Keyed for Node {
    #[inline]
    fn key(&self) -> u64 {
        self.key
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Node")
            .field("key", &self.key)
            .field("values", &self.leaves)
            .finish()
    }
}
