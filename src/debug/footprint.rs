use std::mem::size_of;
use std::sync::Arc;

use crate::trie::{Leaf, Node};

/// Approximate number of bytes held by the trie below `root`, `root`
/// included.
///
/// Counts the structs themselves, the child handles and the value sets.
/// Allocator overhead and `Arc` headers are not counted.
pub fn footprint(root: &Arc<Leaf>) -> usize {
    leaf_size(root)
}

fn leaf_size(leaf: &Arc<Leaf>) -> usize {
    let mut size = size_of::<Leaf>() + leaf.values().heap_size();
    size += leaf.children_count() * size_of::<Arc<Node>>();
    leaf.ascend_children(|node| {
        size += node_size(node);
        true
    });
    size
}

fn node_size(node: &Arc<Node>) -> usize {
    let mut size = size_of::<Node>() + node.leaf_count() * size_of::<Arc<Leaf>>();
    node.ascend_children(|leaf| {
        size += leaf_size(leaf);
        true
    });
    size
}
