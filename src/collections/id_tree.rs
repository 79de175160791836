//! Persistent B-tree of identifiers.
//!
//! This module provides [`IdTree`], an ordered set of `u64` ids stored in a
//! copy-on-write B-tree.
//!
//! # Overview
//!
//! Nodes are shared through [`Arc`]. Cloning a tree is O(1); a mutation copies
//! only the nodes on the path it touches, and only when they are shared with
//! another clone. A clone taken before a mutation therefore keeps observing
//! the old contents, which is what lets a leaf hand out snapshots of its ids
//! without holding its lock during iteration.
//!
//! - O(log N) `insert`, `remove`, `contains`
//! - O(log N) `min` / `max`
//! - O(N) ordered ascent with early exit
//! - O(1) `len`, `is_empty` and `clone`
//!
//! # Examples
//!
//! ```rust
//! use pathtrie::collections::IdTree;
//!
//! let mut tree = IdTree::new(2);
//! for id in [5, 1, 4, 2, 3] {
//!     tree.insert(id);
//! }
//! let snapshot = tree.clone();
//! tree.remove(3);
//!
//! let mut ids = Vec::new();
//! snapshot.ascend(|id| {
//!     ids.push(id);
//!     true
//! });
//! assert_eq!(ids, vec![1, 2, 3, 4, 5]);
//! assert!(!tree.contains(3));
//! ```
//!
//! # Internal Structure
//!
//! With minimum degree `t`:
//! 1. Every node holds at most `2t - 1` ids
//! 2. Every node except the root holds at least `t - 1` ids
//! 3. An internal node with `k` ids has `k + 1` children
//! 4. All leaves are at the same depth
//!
//! Insertion splits full nodes on the way down and removal tops up thin
//! children on the way down, so neither ever has to walk back up.

use std::collections::TryReserveError;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Node Definition
// =============================================================================

#[derive(Clone, Default)]
struct TreeNode {
    ids: Vec<u64>,
    /// Empty for leaves.
    children: Vec<Arc<TreeNode>>,
}

impl TreeNode {
    const fn leaf(ids: Vec<u64>) -> Self {
        Self {
            ids,
            children: Vec::new(),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn min_id(&self) -> Option<u64> {
        let mut node = self;
        while let Some(first) = node.children.first() {
            node = first;
        }
        node.ids.first().copied()
    }

    fn max_id(&self) -> Option<u64> {
        let mut node = self;
        while let Some(last) = node.children.last() {
            node = last;
        }
        node.ids.last().copied()
    }

    /// Splits the full child at `index` around its median, which moves up here.
    fn split_child(&mut self, index: usize) {
        let child = Arc::make_mut(&mut self.children[index]);
        let middle = child.ids.len() / 2;
        let right = Self {
            ids: child.ids.split_off(middle + 1),
            children: if child.is_leaf() {
                Vec::new()
            } else {
                child.children.split_off(middle + 1)
            },
        };
        let Some(median) = child.ids.pop() else {
            return;
        };
        self.ids.insert(index, median);
        self.children.insert(index + 1, Arc::new(right));
    }

    /// Merges the child at `index + 1` and the separator at `index` into the
    /// child at `index`.
    fn merge_children(&mut self, index: usize) {
        let separator = self.ids.remove(index);
        let right = self.children.remove(index + 1);
        let right = Arc::try_unwrap(right).unwrap_or_else(|shared| (*shared).clone());
        let child = Arc::make_mut(&mut self.children[index]);
        child.ids.push(separator);
        child.ids.extend(right.ids);
        child.children.extend(right.children);
    }

    fn borrow_from_left(&mut self, index: usize) {
        let (before, after) = self.children.split_at_mut(index);
        let left = Arc::make_mut(&mut before[index - 1]);
        let child = Arc::make_mut(&mut after[0]);
        let Some(borrowed) = left.ids.pop() else {
            return;
        };
        let separator = std::mem::replace(&mut self.ids[index - 1], borrowed);
        child.ids.insert(0, separator);
        if let Some(grandchild) = left.children.pop() {
            child.children.insert(0, grandchild);
        }
    }

    fn borrow_from_right(&mut self, index: usize) {
        let (before, after) = self.children.split_at_mut(index + 1);
        let child = Arc::make_mut(&mut before[index]);
        let right = Arc::make_mut(&mut after[0]);
        if right.ids.is_empty() {
            return;
        }
        let borrowed = right.ids.remove(0);
        let separator = std::mem::replace(&mut self.ids[index], borrowed);
        child.ids.push(separator);
        if !right.children.is_empty() {
            child.children.push(right.children.remove(0));
        }
    }

    /// Makes sure the child at `index` holds at least `degree` ids before the
    /// removal descends into it. Returns the index to descend into, which
    /// moves left by one when the child is merged into its left sibling.
    fn fill_child(&mut self, index: usize, degree: usize) -> usize {
        if index > 0 && self.children[index - 1].ids.len() >= degree {
            self.borrow_from_left(index);
            index
        } else if index < self.ids.len() && self.children[index + 1].ids.len() >= degree {
            self.borrow_from_right(index);
            index
        } else if index < self.ids.len() {
            self.merge_children(index);
            index
        } else {
            self.merge_children(index - 1);
            index - 1
        }
    }
}

fn insert_non_full(node: &mut Arc<TreeNode>, id: u64, max_ids: usize) {
    let node = Arc::make_mut(node);
    let mut index = node.ids.partition_point(|&existing| existing < id);
    if node.is_leaf() {
        node.ids.insert(index, id);
        return;
    }
    if node.children[index].ids.len() == max_ids {
        node.split_child(index);
        if id > node.ids[index] {
            index += 1;
        }
    }
    insert_non_full(&mut node.children[index], id, max_ids);
}

/// Removes `id`, which must be present in the subtree.
fn remove_present(node: &mut Arc<TreeNode>, id: u64, degree: usize) {
    let node = Arc::make_mut(node);
    match node.ids.binary_search(&id) {
        Ok(index) if node.is_leaf() => {
            node.ids.remove(index);
        }
        Ok(index) => {
            if node.children[index].ids.len() >= degree {
                if let Some(predecessor) = node.children[index].max_id() {
                    node.ids[index] = predecessor;
                    remove_present(&mut node.children[index], predecessor, degree);
                }
            } else if node.children[index + 1].ids.len() >= degree {
                if let Some(successor) = node.children[index + 1].min_id() {
                    node.ids[index] = successor;
                    remove_present(&mut node.children[index + 1], successor, degree);
                }
            } else {
                node.merge_children(index);
                remove_present(&mut node.children[index], id, degree);
            }
        }
        Err(_) if node.is_leaf() => {}
        Err(index) => {
            let index = if node.children[index].ids.len() < degree {
                node.fill_child(index, degree)
            } else {
                index
            };
            remove_present(&mut node.children[index], id, degree);
        }
    }
}

fn ascend_node<F>(node: &TreeNode, function: &mut F) -> bool
where
    F: FnMut(u64) -> bool,
{
    if node.is_leaf() {
        return node.ids.iter().all(|&id| function(id));
    }
    for (index, &id) in node.ids.iter().enumerate() {
        if !ascend_node(&node.children[index], function) || !function(id) {
            return false;
        }
    }
    node.children
        .last()
        .is_none_or(|last| ascend_node(last, function))
}

// =============================================================================
// IdTree Definition
// =============================================================================

/// A copy-on-write B-tree holding a set of `u64` ids.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `insert`       | O(t log_t N)      |
/// | `remove`       | O(t log_t N)      |
/// | `contains`     | O(log N)          |
/// | `min`/`max`    | O(log_t N)        |
/// | `ascend`       | O(N)              |
/// | `len`          | O(1)              |
/// | `clone`        | O(1)              |
#[derive(Clone)]
pub struct IdTree {
    root: Option<Arc<TreeNode>>,
    length: usize,
    degree: usize,
}

impl IdTree {
    /// Creates an empty tree with the given minimum degree.
    ///
    /// # Panics
    ///
    /// Panics if `degree < 2`.
    #[must_use]
    pub const fn new(degree: usize) -> Self {
        assert!(degree >= 2, "B-tree degree must be at least 2");
        Self {
            root: None,
            length: 0,
            degree,
        }
    }

    /// Builds a tree from ids sorted in strictly ascending order.
    ///
    /// When the ids fit in a single node, that node is allocated up front
    /// with room for a full node, and an allocation failure is reported
    /// instead of aborting. Nothing is observable on failure.
    ///
    /// # Errors
    ///
    /// Returns the allocation failure if the node storage cannot be reserved.
    ///
    /// # Panics
    ///
    /// Panics if `degree < 2`.
    pub fn try_from_sorted(ids: &[u64], degree: usize) -> Result<Self, TryReserveError> {
        debug_assert!(
            ids.windows(2).all(|pair| pair[0] < pair[1]),
            "ids must be strictly ascending"
        );
        let mut tree = Self::new(degree);
        if ids.len() <= tree.max_ids() {
            let mut storage = Vec::new();
            storage.try_reserve_exact(tree.max_ids())?;
            storage.extend_from_slice(ids);
            if !storage.is_empty() {
                tree.root = Some(Arc::new(TreeNode::leaf(storage)));
            }
            tree.length = ids.len();
        } else {
            for &id in ids {
                tree.insert(id);
            }
        }
        Ok(tree)
    }

    #[inline]
    const fn max_ids(&self) -> usize {
        2 * self.degree - 1
    }

    /// Returns the minimum degree.
    #[inline]
    #[must_use]
    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the number of ids.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the tree holds no ids.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns `true` if `id` is in the tree.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match node.ids.binary_search(&id) {
                Ok(_) => return true,
                Err(index) => current = node.children.get(index).map(Arc::as_ref),
            }
        }
        false
    }

    /// Returns the smallest id.
    #[must_use]
    pub fn min(&self) -> Option<u64> {
        self.root.as_deref().and_then(TreeNode::min_id)
    }

    /// Returns the largest id.
    #[must_use]
    pub fn max(&self) -> Option<u64> {
        self.root.as_deref().and_then(TreeNode::max_id)
    }

    /// Inserts `id`. Returns `true` if it was not present.
    pub fn insert(&mut self, id: u64) -> bool {
        if self.contains(id) {
            return false;
        }
        let max_ids = self.max_ids();
        let root = match self.root.take() {
            None => Arc::new(TreeNode::leaf(vec![id])),
            Some(root) => {
                let mut root = if root.ids.len() == max_ids {
                    let mut grown = TreeNode {
                        ids: Vec::new(),
                        children: vec![root],
                    };
                    grown.split_child(0);
                    Arc::new(grown)
                } else {
                    root
                };
                insert_non_full(&mut root, id, max_ids);
                root
            }
        };
        self.root = Some(root);
        self.length += 1;
        true
    }

    /// Removes `id`. Returns `true` if it was present.
    pub fn remove(&mut self, id: u64) -> bool {
        if !self.contains(id) {
            return false;
        }
        let degree = self.degree;
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        remove_present(root, id, degree);
        if root.ids.is_empty() {
            self.root = root.children.first().cloned();
        }
        self.length -= 1;
        true
    }

    /// Calls `function` on every id in ascending order.
    ///
    /// Stops as soon as `function` returns `false`. Returns `true` if every
    /// id was visited.
    pub fn ascend<F>(&self, mut function: F) -> bool
    where
        F: FnMut(u64) -> bool,
    {
        self.root
            .as_deref()
            .is_none_or(|root| ascend_node(root, &mut function))
    }

    /// Appends every id to `output` in ascending order.
    pub fn append_to(&self, output: &mut Vec<u64>) {
        output.reserve(self.length);
        self.ascend(|id| {
            output.push(id);
            true
        });
    }

    /// Returns the number of tree nodes.
    pub(crate) fn node_count(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            1 + node.children.iter().map(|child| count(child)).sum::<usize>()
        }
        self.root.as_deref().map_or(0, count)
    }

    /// Checks the B-tree invariants, returning the height.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> usize {
        fn check(node: &TreeNode, degree: usize, is_root: bool, depth: usize) -> usize {
            assert!(node.ids.len() < 2 * degree);
            if !is_root {
                assert!(node.ids.len() >= degree - 1, "node under-full");
            }
            assert!(node.ids.windows(2).all(|pair| pair[0] < pair[1]));
            if node.is_leaf() {
                return depth;
            }
            assert_eq!(node.children.len(), node.ids.len() + 1);
            let depths: Vec<usize> = node
                .children
                .iter()
                .map(|child| check(child, degree, false, depth + 1))
                .collect();
            assert!(depths.windows(2).all(|pair| pair[0] == pair[1]));
            depths[0]
        }
        let mut visited = 0;
        let mut previous: Option<u64> = None;
        self.ascend(|id| {
            assert!(previous.is_none_or(|before| before < id));
            previous = Some(id);
            visited += 1;
            true
        });
        assert_eq!(visited, self.length);
        self.root
            .as_deref()
            .map_or(0, |root| check(root, self.degree, true, 1))
    }
}

impl fmt::Debug for IdTree {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids = Vec::with_capacity(self.length);
        self.append_to(&mut ids);
        formatter.debug_set().entries(ids).finish()
    }
}

impl PartialEq for IdTree {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }
        let mut left = Vec::with_capacity(self.length);
        let mut right = Vec::with_capacity(other.length);
        self.append_to(&mut left);
        other.append_to(&mut right);
        left == right
    }
}

impl Eq for IdTree {}

// =============================================================================
// Tests
// =============================================================================
