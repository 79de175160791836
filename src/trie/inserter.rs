//! Path insertion with structural reuse.
//!
//! An [`Inserter`] places ids into the trie below a given leaf. A path is an
//! unordered set of pairs, so the same path can be stored along many
//! different orders of its keys. To keep the trie small, insertion reuses
//! whatever structure already exists:
//!
//! 1. If a leaf for exactly this path already exists along any order of its
//!    keys, that leaf is the target.
//! 2. Otherwise keys from the configured node order are consumed first, in
//!    that order.
//! 3. Then, at every level, a remaining pair whose leaf already exists is
//!    followed, wherever in the trie that leaf sits. Failing that, the
//!    remaining keys are probed in ascending order and the first key that
//!    already has a child node is consumed.
//! 4. When no remaining key has a child, the remaining suffix is built off
//!    to the side as one chain and attached in a single step. The chain
//!    stops short of the first pair set that already has a leaf elsewhere,
//!    and descent resumes there.
//!
//! Every set of pairs below the starting leaf therefore has at most one
//! leaf, whatever order the pairs were inserted in.
//!
//! Building the suffix off to the side means that racing inserters never
//! observe a half-built chain: one of them attaches its chain, the others
//! see it on their re-probe and follow it.

use std::fmt;
use std::sync::Arc;

use super::{InserterConfig, Leaf, Node};
use crate::collections::ValueSet;
use crate::error::TrieError;
use crate::path::{Pair, Path};
use crate::tracing_helpers::{debug_log, trace_log};

/// Callback invoked with every node the inserter attaches to the trie.
pub type IndexNode = Arc<dyn Fn(&Arc<Node>) + Send + Sync>;

/// A freshly built suffix, not yet attached.
struct Chain {
    top: Arc<Node>,
    bottom: Arc<Leaf>,
    nodes: Vec<Arc<Node>>,
}

/// Inserts paths into a trie.
///
/// # Examples
///
/// ```rust
/// use pathtrie::{Inserter, Leaf, Path};
///
/// let root = Leaf::root();
/// let inserter = Inserter::new().with_node_order([2]);
///
/// let path = Path::from([(1, 10), (2, 20)]);
/// assert!(inserter.insert(&root, &path, 7).unwrap());
/// assert!(!inserter.insert(&root, &path, 7).unwrap());
///
/// // the fixed key sits at the top
/// assert!(root.has_child(2));
/// assert!(!root.has_child(1));
///
/// let leaf = inserter.find_leaf(&root, &path).unwrap();
/// assert!(leaf.contains(7));
/// ```
#[derive(Clone, Default)]
pub struct Inserter {
    node_order: Vec<u64>,
    index_node: Option<IndexNode>,
}

impl Inserter {
    /// An inserter with no node order and no index callback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An inserter configured from `config`.
    #[must_use]
    pub fn from_config(config: &InserterConfig) -> Self {
        Self::new().with_node_order(config.node_order.iter().copied())
    }

    /// Sets the keys that are consumed first, in the given order.
    #[must_use]
    pub fn with_node_order<I>(mut self, node_order: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        self.node_order = node_order.into_iter().collect();
        self
    }

    /// Sets a callback that sees every node this inserter attaches.
    ///
    /// The callback runs once per node, after the node is reachable from the
    /// trie and with no trie lock held. Work discarded after losing an
    /// insertion race is never reported.
    #[must_use]
    pub fn with_index_node<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Arc<Node>) + Send + Sync + 'static,
    {
        self.index_node = Some(Arc::new(callback));
        self
    }

    /// The fixed node order.
    #[inline]
    pub fn node_order(&self) -> &[u64] {
        &self.node_order
    }

    fn index(&self, node: &Arc<Node>) {
        if let Some(callback) = &self.index_node {
            callback(node);
        }
    }

    /// Attaches `id` to the leaf reached by `path` below `leaf`, creating
    /// missing structure.
    ///
    /// Returns `true` if `id` was not attached to that leaf before.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::CapacityExhausted`] if the target leaf's value set
    /// could not be promoted. Structure created on the way stays in place.
    ///
    /// # Panics
    ///
    /// Panics if the trie's structural invariants are broken.
    pub fn insert(&self, leaf: &Arc<Leaf>, path: &Path, id: u64) -> Result<bool, TrieError> {
        if let Some(target) = self.find_leaf(leaf, path) {
            return target.append(id);
        }
        let (target, attached) = self.descend(leaf, path, Some(id));
        if attached {
            return Ok(true);
        }
        target.append(id)
    }

    /// Returns the leaf reached by `path` below `leaf`, creating missing
    /// structure. An empty path yields `leaf` itself.
    ///
    /// # Panics
    ///
    /// Panics if the trie's structural invariants are broken.
    pub fn get_leaf(&self, leaf: &Arc<Leaf>, path: &Path) -> Arc<Leaf> {
        self.find_leaf(leaf, path)
            .unwrap_or_else(|| self.descend(leaf, path, None).0)
    }

    /// Returns the existing leaf for `path` below `leaf` without creating
    /// anything.
    ///
    /// Node-order keys are followed first, as on insertion. The remaining
    /// keys may sit in any order the structure allows: keys are tried in
    /// ascending order and the search backtracks when a branch dead-ends.
    pub fn find_leaf(&self, leaf: &Arc<Leaf>, path: &Path) -> Option<Arc<Leaf>> {
        let mut current = Arc::clone(leaf);
        let mut remaining = path.clone();

        for &key in &self.node_order {
            let Some(value) = remaining.get(key) else {
                continue;
            };
            current = current.get_child(key)?.get_leaf(value)?;
            remaining = remaining.without(key);
        }

        search(&current, &remaining)
    }

    /// Attaches `id` below `leaf` along `pairs` in exactly the given order.
    ///
    /// No structure is reused except nodes and leaves that already sit on
    /// this very order, so two orders of the same pairs give two chains.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::CapacityExhausted`] if the target leaf's value set
    /// could not be promoted.
    pub fn force_insert(&self, leaf: &Arc<Leaf>, pairs: &[Pair], id: u64) -> Result<bool, TrieError> {
        let mut current = Arc::clone(leaf);
        for pair in pairs {
            let (node, created) = current.getsert_child(pair.key);
            if created {
                self.index(&node);
            }
            current = node.getsert_leaf(pair.value);
        }
        current.append(id)
    }

    /// Walks down to the leaf for `path`, creating what is missing.
    ///
    /// The flag is `true` if `id` was attached while building the chain.
    fn descend(&self, leaf: &Arc<Leaf>, path: &Path, id: Option<u64>) -> (Arc<Leaf>, bool) {
        let mut current = Arc::clone(leaf);
        let mut remaining = path.clone();

        for &key in &self.node_order {
            let Some(value) = remaining.get(key) else {
                continue;
            };
            let (node, created) = current.getsert_child(key);
            if created {
                self.index(&node);
            }
            current = node.getsert_leaf(value);
            remaining = remaining.without(key);
        }

        let start = Arc::clone(&current);
        let mut consumed = Path::new();
        while !remaining.is_empty() {
            if let Some((pair, next)) = existing_step(&start, &current, &consumed, &remaining) {
                current = next;
                consumed = consumed.with(pair);
                remaining = remaining.without(pair.key);
                continue;
            }

            let node = match current.get_any(remaining.keys()) {
                Some(node) => node,
                None => {
                    let span = chain_span(&start, &consumed, &remaining);
                    let complete = span.len() == remaining.len();
                    let mut built = None;
                    let (node, created) = current.getsert_any(remaining.keys(), || {
                        let chain = make_chain(&span, id.filter(|_| complete));
                        let top = Arc::clone(&chain.top);
                        built = Some(chain);
                        top
                    });
                    if created && let Some(chain) = built {
                        trace_log!(nodes = chain.nodes.len(), complete, "attached new chain");
                        for node in &chain.nodes {
                            self.index(node);
                        }
                        if complete {
                            return (chain.bottom, id.is_some());
                        }
                        current = chain.bottom;
                        for pair in &span {
                            consumed = consumed.with(*pair);
                            remaining = remaining.without(pair.key);
                        }
                        continue;
                    }
                    debug_log!(key = node.key(), "lost chain race, following winner");
                    node
                }
            };

            let pair = Pair::new(node.key(), value_of(&remaining, node.key()));
            current = node.getsert_leaf(pair.value);
            consumed = consumed.with(pair);
            remaining = remaining.without(pair.key);
        }
        (current, false)
    }
}

/// The first remaining pair whose extension of `consumed` already has a
/// leaf, with that leaf.
///
/// Children of `current` are checked before the rest of the trie below
/// `start`.
fn existing_step(
    start: &Arc<Leaf>,
    current: &Arc<Leaf>,
    consumed: &Path,
    remaining: &Path,
) -> Option<(Pair, Arc<Leaf>)> {
    remaining
        .iter()
        .find_map(|pair| {
            let leaf = current.get_child(pair.key)?.get_leaf(pair.value)?;
            Some((*pair, leaf))
        })
        .or_else(|| {
            remaining
                .iter()
                .find_map(|pair| search(start, &consumed.with(*pair)).map(|leaf| (*pair, leaf)))
        })
}

/// The ascending prefix of `remaining` that can be built as one chain
/// without creating a second leaf for a pair set that already has one.
///
/// Never empty: the caller has checked that the first step is new.
fn chain_span(start: &Arc<Leaf>, consumed: &Path, remaining: &Path) -> Path {
    let mut span = Path::new();
    let mut covered = consumed.clone();
    for pair in remaining {
        covered = covered.with(*pair);
        if !span.is_empty() && search(start, &covered).is_some() {
            break;
        }
        span = span.with(*pair);
    }
    span
}

fn search(leaf: &Arc<Leaf>, path: &Path) -> Option<Arc<Leaf>> {
    if path.is_empty() {
        return Some(Arc::clone(leaf));
    }
    path.iter().find_map(|pair| {
        let next = leaf.get_child(pair.key)?.get_leaf(pair.value)?;
        search(&next, &path.without(pair.key))
    })
}

/// The value of `key` in `path`, which the caller just probed for.
fn value_of(path: &Path, key: u64) -> u64 {
    path.get(key)
        .unwrap_or_else(|| panic!("inconsistent path state: probed key {key} is not in the path"))
}

/// Builds `path` as a detached chain, bottom first.
///
/// The bottom leaf holds `id` when one is given.
fn make_chain(path: &Path, id: Option<u64>) -> Chain {
    let Some((cursor, last)) = path.last() else {
        panic!("cannot build a chain for an empty path");
    };

    let node = Node::detached(last.key);
    let values = id.map_or_else(ValueSet::new, ValueSet::singleton);
    let bottom = Arc::new(Leaf::with_values(&node, last.value, values));
    node.add_leaf(Arc::clone(&bottom));

    let mut nodes = Vec::with_capacity(path.len());
    nodes.push(Arc::clone(&node));
    let mut top = node;
    path.descend(cursor, |pair| {
        let node = Node::detached(pair.key);
        let leaf = Arc::new(Leaf::new(&node, pair.value));
        leaf.add_child(Arc::clone(&top));
        node.add_leaf(leaf);
        nodes.push(Arc::clone(&node));
        top = node;
        true
    });

    Chain { top, bottom, nodes }
}

impl fmt::Debug for Inserter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Inserter")
            .field("node_order", &self.node_order)
            .field("index_node", &self.index_node.is_some())
            .finish()
    }
}
