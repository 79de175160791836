//! Multi-threaded insertion tests.
//!
//! Threads are released together through a `Barrier` so that they race on
//! the same child collections as often as possible.

mod common;

use common::{ids, init_tracing};
use pathtrie::{Inserter, Pair, Path, Trie};
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

fn race<F>(threads: usize, work: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads));
    let work = Arc::new(work);
    let handles: Vec<_> = (0..threads)
        .map(|index| {
            let barrier = Arc::clone(&barrier);
            let work = Arc::clone(&work);
            thread::spawn(move || {
                barrier.wait();
                work(index);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(6)]
fn test_racing_inserts_build_one_chain(#[case] depth: u64) {
    init_tracing();
    for _ in 0..50 {
        let indexed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&indexed);
        let trie = Arc::new(Trie::with_inserter(Inserter::new().with_index_node(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )));
        let path: Path = (0..depth).map(|key| Pair::new(key, key * 10)).collect();

        let shared = Arc::clone(&trie);
        let shared_path = path.clone();
        race(THREADS, move |index| {
            assert!(shared.insert(&shared_path, index as u64).unwrap());
        });

        assert_eq!(trie.root().children_count(), 1);
        assert_eq!(indexed.load(Ordering::SeqCst), depth as usize);
        let leaf = trie.find_leaf(&path).unwrap();
        assert_eq!(ids(&leaf), (0..THREADS as u64).collect::<Vec<_>>());
    }
}

#[rstest]
fn test_racing_inserts_on_overlapping_paths() {
    init_tracing();
    let trie = Arc::new(Trie::new());
    let shared = Arc::clone(&trie);
    race(THREADS, move |index| {
        for round in 0..200_u64 {
            let value = round % 4;
            let path = Path::from([(1, value), (2, index as u64 % 2), (3, round % 3)]);
            shared.insert(&path, round * 100 + index as u64).unwrap();
        }
    });

    let mut total = 0;
    for value in 0..4 {
        for second in 0..2 {
            for third in 0..3 {
                let path = Path::from([(1, value), (2, second), (3, third)]);
                let leaf = trie.find_leaf(&path).unwrap();
                let found = ids(&leaf);
                assert!(found.windows(2).all(|pair| pair[0] < pair[1]));
                total += found.len();
            }
        }
    }
    assert_eq!(total, THREADS * 200);
    assert_eq!(trie.root().children_count(), 1);
}

#[rstest]
fn test_readers_see_consistent_snapshots() {
    init_tracing();
    let trie = Arc::new(Trie::new());
    let path = Path::from([(1, 1), (2, 2)]);
    trie.insert(&path, 0).unwrap();
    let leaf = trie.find_leaf(&path).unwrap();

    let writer_leaf = Arc::clone(&leaf);
    let writer = thread::spawn(move || {
        for id in 1..2_000_u64 {
            writer_leaf.append(id).unwrap();
            if id % 3 == 0 {
                writer_leaf.remove(id - 1);
            }
        }
    });

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let leaf = Arc::clone(&leaf);
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut previous = None;
                    let mut count = 0;
                    let snapshot = leaf.values();
                    leaf.ascend(|id| {
                        assert!(previous.is_none_or(|last| last < id));
                        previous = Some(id);
                        count += 1;
                        true
                    });
                    assert!(!snapshot.is_empty());
                    assert!(count > 0);
                }
            })
        })
        .collect();

    writer.join().expect("Thread panicked");
    for reader in readers {
        reader.join().expect("Thread panicked");
    }
    assert!(leaf.values().is_promoted());
}

#[rstest]
fn test_concurrent_force_insert_creates_one_branch() {
    init_tracing();
    let trie = Arc::new(Trie::new());
    let shared = Arc::clone(&trie);
    race(THREADS, move |index| {
        let pairs = [Pair::new(5, 1), Pair::new(4, 1), Pair::new(3, 1)];
        shared.force_insert(&pairs, index as u64).unwrap();
    });

    let leaf = trie
        .root()
        .get_child(5)
        .and_then(|node| node.get_leaf(1))
        .and_then(|leaf| leaf.get_child(4))
        .and_then(|node| node.get_leaf(1))
        .and_then(|leaf| leaf.get_child(3))
        .and_then(|node| node.get_leaf(1))
        .unwrap();
    assert_eq!(leaf.item_count(), THREADS);
    assert_eq!(trie.root().children_count(), 1);
}
