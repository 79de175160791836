//! Trie level reached by a path prefix.

use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

use super::Node;
use crate::collections::{ChildSet, Keyed, ValueSet};
use crate::error::TrieError;

/// A point in the trie reached by the pairs consumed so far.
///
/// A leaf holds the ids attached exactly at this point and the [`Node`]s
/// for dimension keys not yet consumed. The ids are guarded by the leaf's own
/// reader/writer lock, independent from the lock of its child collection, so
/// attaching ids here never contends with structural inserts below.
///
/// Readers clone the value set under the read lock and iterate the clone
/// after releasing it; the value set is persistent, so the clone stays valid
/// and unchanged whatever writers do meanwhile.
pub struct Leaf {
    value: u64,
    parent: Weak<Node>,
    values: RwLock<ValueSet>,
    children: ChildSet<Node>,
}

impl Leaf {
    /// Creates a root leaf. A root has no parent and value `0`.
    #[must_use]
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            value: 0,
            parent: Weak::new(),
            values: RwLock::new(ValueSet::new()),
            children: ChildSet::new(),
        })
    }

    pub(crate) fn new(parent: &Arc<Node>, value: u64) -> Self {
        Self::with_values(parent, value, ValueSet::new())
    }

    pub(crate) fn with_values(parent: &Arc<Node>, value: u64, values: ValueSet) -> Self {
        Self {
            value,
            parent: Arc::downgrade(parent),
            values: RwLock::new(values),
            children: ChildSet::new(),
        }
    }

    /// The value of the parent node's key that selects this leaf.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// The owning node; `None` for a root or once the owner is gone.
    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.upgrade()
    }

    /// Returns `true` if this leaf was created as a root.
    pub fn is_root(&self) -> bool {
        self.parent.ptr_eq(&Weak::new())
    }

    // -------------------------------------------------------------------------
    // Children
    // -------------------------------------------------------------------------

    /// Returns `true` if a child node exists for `key`.
    pub fn has_child(&self, key: u64) -> bool {
        self.children.has(key)
    }

    /// Returns the child node for `key`.
    pub fn get_child(&self, key: u64) -> Option<Arc<Node>> {
        self.children.get(key)
    }

    /// Attaches a detached `node` below this leaf.
    ///
    /// # Panics
    ///
    /// Panics if a node with the same key is already attached or if `node`
    /// already has a parent.
    pub(crate) fn add_child(self: &Arc<Self>, node: Arc<Node>) {
        node.set_parent(self);
        let key = node.key();
        if self.children.upsert(node).is_some() {
            panic!("leaf already has child with key {key}");
        }
    }

    /// Returns the child node for `key`, creating it if needed.
    ///
    /// The boolean is `true` if this call created the node.
    pub fn getsert_child(self: &Arc<Self>, key: u64) -> (Arc<Node>, bool) {
        self.children
            .get_or_insert_with(key, || Node::attached(key, self))
    }

    /// Detaches and returns the child node for `key`.
    pub fn remove_child(&self, key: u64) -> Option<Arc<Node>> {
        self.children.delete(key)
    }

    /// Detaches the child node for `key` if it has no leaves.
    pub fn remove_empty_child(&self, key: u64) -> Option<Arc<Node>> {
        self.children.delete_if(key, Node::is_empty)
    }

    /// Number of child nodes.
    pub fn children_count(&self) -> usize {
        self.children.len()
    }

    /// Calls `function` on every child node in ascending key order.
    pub fn ascend_children<F>(&self, function: F) -> bool
    where
        F: FnMut(&Arc<Node>) -> bool,
    {
        self.children.ascend(function)
    }

    /// Calls `function` on every child node with `low <= key <= high`.
    pub fn ascend_children_range<F>(&self, low: u64, high: u64, function: F) -> bool
    where
        F: FnMut(&Arc<Node>) -> bool,
    {
        self.children.ascend_range(low, high, function)
    }

    /// Returns the first child node whose key is among `candidates`.
    pub fn get_any<I>(&self, candidates: I) -> Option<Arc<Node>>
    where
        I: IntoIterator<Item = u64>,
    {
        self.children.probe_any(candidates)
    }

    /// Returns the first child node whose key is among `candidates`, or
    /// attaches the node built by `factory` if none is.
    ///
    /// The factory runs only if this call ends up inserting. Its node must
    /// be detached; it is attached to this leaf here.
    pub(crate) fn getsert_any<I, F>(self: &Arc<Self>, candidates: I, factory: F) -> (Arc<Node>, bool)
    where
        I: IntoIterator<Item = u64> + Clone,
        F: FnOnce() -> Arc<Node>,
    {
        self.children.probe_or_insert_with(candidates, || {
            let node = factory();
            node.set_parent(self);
            node
        })
    }

    // -------------------------------------------------------------------------
    // Attached ids
    // -------------------------------------------------------------------------

    /// Attaches `id`. Returns `true` if it was not attached before.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::CapacityExhausted`] if the value set could not be
    /// promoted; the leaf is unchanged.
    pub fn append(&self, id: u64) -> Result<bool, TrieError> {
        self.values.write().append(id)
    }

    /// Detaches `id`. Returns `true` if it was attached.
    ///
    /// Empty leaves are not removed from their node; see
    /// [`Node::remove_empty_leaf`].
    pub fn remove(&self, id: u64) -> bool {
        self.values.write().remove(id)
    }

    /// Returns `true` if `id` is attached here.
    pub fn contains(&self, id: u64) -> bool {
        self.values.read().contains(id)
    }

    /// A point-in-time copy of the attached ids.
    pub fn values(&self) -> ValueSet {
        self.values.read().clone()
    }

    /// Calls `function` on every attached id in ascending order.
    ///
    /// Iterates a snapshot taken when the call starts. Returns `true` if
    /// every id was visited.
    pub fn ascend<F>(&self, function: F) -> bool
    where
        F: FnMut(u64) -> bool,
    {
        self.values().ascend(function)
    }

    /// Appends the attached ids to `output` in ascending order.
    pub fn append_to(&self, output: &mut Vec<u64>) {
        self.values().append_to(output);
    }

    /// Number of attached ids.
    pub fn item_count(&self) -> usize {
        self.values.read().len()
    }

    /// A leaf is empty when it has neither attached ids nor child nodes.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.item_count() == 0
    }
}

impl Keyed for Leaf {
    #[inline]
    fn key(&self) -> u64 {
        self.value
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Leaf")
            .field("value", &self.value)
            .field("ids", &*self.values.read())
            .field("keys", &self.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_root_has_no_parent() {
        let root = Leaf::root();
        assert!(root.parent().is_none());
        assert!(root.is_root());
        assert!(root.is_empty());
    }

    #[rstest]
    fn test_child_leaf_is_not_root() {
        let root = Leaf::root();
        let (node, created) = root.getsert_child(1);
        assert!(created);
        let leaf = node.getsert_leaf(2);
        assert!(!leaf.is_root());
        assert_eq!(leaf.parent().map(|parent| parent.key()), Some(1));
    }

    #[rstest]
    fn test_append_and_remove() {
        let root = Leaf::root();
        assert!(root.append(3).unwrap());
        assert!(!root.append(3).unwrap());
        assert!(root.contains(3));
        assert_eq!(root.item_count(), 1);
        assert!(root.remove(3));
        assert!(!root.remove(3));
        assert!(root.is_empty());
    }

    #[rstest]
    fn test_leaf_with_child_is_not_empty() {
        let root = Leaf::root();
        root.getsert_child(1);
        assert!(!root.is_empty());
        assert!(root.remove_empty_child(1).is_some());
        assert!(root.is_empty());
    }

    #[rstest]
    #[should_panic(expected = "already has child with key 4")]
    fn test_add_duplicate_child_panics() {
        let root = Leaf::root();
        root.getsert_child(4);
        root.add_child(Node::detached(4));
    }

    #[rstest]
    fn test_getsert_any_attaches_factory_node() {
        let root = Leaf::root();
        let (node, created) = root.getsert_any([2, 5], || Node::detached(5));
        assert!(created);
        assert!(Arc::ptr_eq(&node.parent().unwrap(), &root));
        let (found, created) = root.getsert_any([5], || Node::detached(9));
        assert!(!created);
        assert!(Arc::ptr_eq(&found, &node));
        assert!(root.get_any([1, 5]).is_some());
    }

    #[rstest]
    fn test_ascend_uses_snapshot() {
        let root = Leaf::root();
        for id in [5, 1, 3] {
            root.append(id).unwrap();
        }
        let mut seen = Vec::new();
        root.ascend(|id| {
            root.remove(id);
            seen.push(id);
            true
        });
        assert_eq!(seen, vec![1, 3, 5]);
        assert_eq!(root.item_count(), 0);
    }
}
