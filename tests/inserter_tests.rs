//! Integration tests for path insertion and lookup.

mod common;

use common::{ids, init_tracing};
use pathtrie::collections::DEGREE;
use pathtrie::{Inserter, Leaf, Pair, Path, Trie};
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[fixture]
fn trie() -> Trie {
    init_tracing();
    Trie::new()
}

fn child_keys(leaf: &Leaf) -> Vec<u64> {
    let mut keys = Vec::new();
    leaf.ascend_children(|node| {
        keys.push(node.key());
        true
    });
    keys
}

// =============================================================================
// Lookup
// =============================================================================

#[rstest]
fn test_exact_lookup_returns_only_that_path(trie: Trie) {
    let both = Path::from([(1, 1), (2, 2)]);
    let first = Path::from([(1, 1)]);
    let other_value = Path::from([(1, 1), (2, 3)]);

    trie.insert(&both, 10).unwrap();
    trie.insert(&both, 11).unwrap();
    trie.insert(&first, 20).unwrap();
    trie.insert(&other_value, 30).unwrap();

    assert_eq!(ids(&trie.find_leaf(&both).unwrap()), vec![10, 11]);
    assert_eq!(ids(&trie.find_leaf(&first).unwrap()), vec![20]);
    assert_eq!(ids(&trie.find_leaf(&other_value).unwrap()), vec![30]);
    assert!(trie.find_leaf(&Path::from([(2, 2)])).is_none());
}

#[rstest]
fn test_get_leaf_creates_and_find_leaf_agrees(trie: Trie) {
    let path = Path::from([(4, 1), (5, 2)]);
    assert!(trie.find_leaf(&path).is_none());
    let created = trie.get_leaf(&path);
    assert_eq!(created.item_count(), 0);
    let found = trie.find_leaf(&path).unwrap();
    assert!(Arc::ptr_eq(&created, &found));
    assert!(Arc::ptr_eq(&trie.get_leaf(&path), &created));
}

#[rstest]
fn test_insert_is_idempotent(trie: Trie) {
    let path = Path::from([(1, 1), (2, 2)]);
    assert!(trie.insert(&path, 7).unwrap());
    assert!(!trie.insert(&path, 7).unwrap());
    assert_eq!(trie.find_leaf(&path).unwrap().item_count(), 1);
}

#[rstest]
fn test_insert_then_remove_leaves_empty_leaf(trie: Trie) {
    let path = Path::from([(1, 1), (2, 2)]);
    trie.insert(&path, 7).unwrap();
    assert!(trie.remove(&path, 7));
    let leaf = trie.find_leaf(&path).unwrap();
    assert!(leaf.is_empty());
    assert!(!trie.remove(&path, 7));
}

#[rstest]
#[case(vec![(1, 1), (2, 2), (3, 3)])]
#[case(vec![(3, 3), (1, 1), (2, 2)])]
#[case(vec![(2, 2), (3, 3), (1, 1)])]
#[case(vec![(3, 3), (2, 2), (1, 1)])]
fn test_permutations_converge(trie: Trie, #[case] pairs: Vec<(u64, u64)>) {
    let reference = Path::from([(1, 1), (2, 2), (3, 3)]);
    trie.insert(&reference, 1).unwrap();

    let permuted: Path = pairs.into_iter().map(Pair::from).collect();
    trie.insert(&permuted, 2).unwrap();

    assert_eq!(ids(&trie.find_leaf(&reference).unwrap()), vec![1, 2]);
    assert_eq!(trie.root().children_count(), 1);
}

#[rstest]
fn test_extending_a_reordered_path_keeps_one_leaf_per_path(trie: Trie) {
    let shared = Path::from([(0, 1), (3, 2)]);
    trie.insert(&Path::from([(3, 0)]), 0).unwrap();
    trie.insert(&shared, 0).unwrap();
    trie.insert(&Path::from([(0, 0)]), 0).unwrap();
    trie.insert(&Path::from([(0, 1), (3, 2), (4, 0)]), 0).unwrap();

    assert_eq!(ids(&trie.find_leaf(&shared).unwrap()), vec![0]);
    assert!(!trie.insert(&shared, 0).unwrap());
    assert!(trie.insert(&shared, 7).unwrap());
    assert_eq!(ids(&trie.find_leaf(&shared).unwrap()), vec![0, 7]);
    assert!(trie.root().get_child(0).unwrap().get_leaf(1).is_none());
}

#[rstest]
fn test_chain_stops_at_pair_set_stored_elsewhere(trie: Trie) {
    let forced = [Pair::new(2, 1), Pair::new(3, 1), Pair::new(1, 1)];
    trie.force_insert(&forced, 1).unwrap();
    trie.insert(&Path::from([(1, 1)]), 2).unwrap();

    let triple = Path::from([(1, 1), (2, 1), (3, 1)]);
    let existing = trie.find_leaf(&triple).unwrap();
    trie.insert(&Path::from([(1, 1), (2, 1), (3, 1), (4, 1)]), 3).unwrap();

    let found = trie.find_leaf(&triple).unwrap();
    assert!(Arc::ptr_eq(&found, &existing));
    assert_eq!(ids(&found), vec![1]);

    let extended = trie
        .find_leaf(&Path::from([(1, 1), (2, 1), (3, 1), (4, 1)]))
        .unwrap();
    let grandparent = extended.parent().and_then(|node| node.parent()).unwrap();
    assert!(Arc::ptr_eq(&grandparent, &existing));
    assert_eq!(ids(&extended), vec![3]);
}

// =============================================================================
// Structure
// =============================================================================

#[rstest]
fn test_node_order_puts_key_on_top() {
    init_tracing();
    let trie = Trie::with_inserter(Inserter::new().with_node_order([2]));
    trie.insert(&Path::from([(1, 1), (2, 2)]), 1).unwrap();
    trie.insert(&Path::from([(2, 5), (3, 1)]), 2).unwrap();
    trie.insert(&Path::from([(1, 4), (2, 2), (3, 3)]), 3).unwrap();

    assert_eq!(child_keys(trie.root()), vec![2]);
    let node = trie.root().get_child(2).unwrap();
    assert_eq!(node.leaf_count(), 2);
}

#[rstest]
fn test_node_order_skips_absent_keys() {
    let trie = Trie::with_inserter(Inserter::new().with_node_order([9, 2]));
    let path = Path::from([(2, 1), (4, 4)]);
    trie.insert(&path, 1).unwrap();
    assert_eq!(child_keys(trie.root()), vec![2]);
    assert_eq!(ids(&trie.find_leaf(&path).unwrap()), vec![1]);
}

#[rstest]
fn test_existing_branch_is_reused(trie: Trie) {
    trie.insert(&Path::from([(1, 1)]), 1).unwrap();
    trie.insert(&Path::from([(1, 1), (2, 2), (3, 3)]), 2).unwrap();

    let first = trie.find_leaf(&Path::from([(1, 1)])).unwrap();
    assert_eq!(child_keys(&first), vec![2]);
    assert_eq!(trie.root().children_count(), 1);
}

#[rstest]
fn test_probe_prefers_lowest_existing_key(trie: Trie) {
    trie.force_insert(&[Pair::new(3, 9)], 1).unwrap();
    trie.force_insert(&[Pair::new(2, 9)], 2).unwrap();

    let path = Path::from([(2, 1), (3, 1)]);
    trie.insert(&path, 5).unwrap();

    let via_two = trie
        .root()
        .get_child(2)
        .and_then(|node| node.get_leaf(1))
        .and_then(|leaf| leaf.get_child(3))
        .and_then(|node| node.get_leaf(1))
        .unwrap();
    assert!(via_two.contains(5));
    assert!(trie.root().get_child(3).unwrap().get_leaf(1).is_none());
    assert!(Arc::ptr_eq(&trie.find_leaf(&path).unwrap(), &via_two));
}

#[rstest]
fn test_many_ids_promote_leaf(trie: Trie) {
    let path = Path::from([(1, 1)]);
    let count = DEGREE as u64 + 1;
    for id in (0..count).rev() {
        assert!(trie.insert(&path, id).unwrap());
    }
    let leaf = trie.find_leaf(&path).unwrap();
    assert!(leaf.values().is_promoted());
    assert_eq!(ids(&leaf), (0..count).collect::<Vec<_>>());
}

// =============================================================================
// Force insert
// =============================================================================

#[rstest]
fn test_force_insert_orders_give_distinct_chains(trie: Trie) {
    let forward = [Pair::new(1, 1), Pair::new(2, 2)];
    let backward = [Pair::new(2, 2), Pair::new(1, 1)];
    trie.force_insert(&forward, 1).unwrap();
    trie.force_insert(&backward, 2).unwrap();

    assert_eq!(child_keys(trie.root()), vec![1, 2]);
    let first = trie.root().get_child(1).unwrap().get_leaf(1).unwrap();
    let first = first.get_child(2).unwrap().get_leaf(2).unwrap();
    let second = trie.root().get_child(2).unwrap().get_leaf(2).unwrap();
    let second = second.get_child(1).unwrap().get_leaf(1).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(ids(&first), vec![1]);
    assert_eq!(ids(&second), vec![2]);
}

#[rstest]
fn test_insert_follows_forced_chain(trie: Trie) {
    trie.force_insert(&[Pair::new(2, 2), Pair::new(1, 1)], 1).unwrap();
    trie.insert(&Path::from([(1, 1), (2, 2)]), 2).unwrap();

    assert_eq!(child_keys(trie.root()), vec![2]);
    let leaf = trie.find_leaf(&Path::from([(1, 1), (2, 2)])).unwrap();
    assert_eq!(ids(&leaf), vec![1, 2]);
}

#[rstest]
fn test_force_insert_empty_pairs_targets_root(trie: Trie) {
    assert!(trie.force_insert(&[], 4).unwrap());
    assert!(trie.root().contains(4));
}

// =============================================================================
// Index callback
// =============================================================================

#[rstest]
fn test_index_node_sees_every_new_node_once() {
    init_tracing();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let trie = Trie::with_inserter(Inserter::new().with_index_node(move |node| {
        assert!(node.parent().is_some());
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    trie.insert(&Path::from([(1, 1), (2, 2), (3, 3)]), 1).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 3);

    trie.insert(&Path::from([(1, 1), (2, 2), (3, 3), (4, 4)]), 2).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 4);

    trie.insert(&Path::from([(1, 2), (2, 2)]), 3).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 5);

    trie.get_leaf(&Path::from([(1, 2), (2, 2)]));
    assert_eq!(seen.load(Ordering::SeqCst), 5);
}
