use itertools::Itertools;
use rand::{thread_rng, Rng};
use rbtree::RedBlackTree;
use std::collections::BTreeMap;

fn walk_keys<K: Ord + Copy, V>(tree: &RedBlackTree<K, V>) -> Vec<K> {
    tree.iter().map(|(k, _)| *k).collect()
}

#[test]
fn new_tree_is_empty() {
    let tree: RedBlackTree<u64, u64> = RedBlackTree::new();
    assert_eq!(tree.len(), 0);
    assert!(tree.is_empty());
    assert_eq!(tree.get(&1), None);
    assert_eq!(tree.get_min(), None);
    assert_eq!(tree.get_max(), None);
}

#[test]
fn insert_into_empty_tree_is_single_black_root() {
    let mut tree = RedBlackTree::new();
    tree.insert(10, "ten");
    assert!(tree.is_valid());
    assert_eq!(walk_keys(&tree), vec![10]);
}

// Ascending insert promotes a new root.
#[test]
fn insert_ascending_triggers_root_promotion() {
    let mut tree = RedBlackTree::new();
    for k in [10, 20, 30] {
        tree.insert(k, k);
    }
    assert!(tree.is_valid());
    assert_eq!(walk_keys(&tree), vec![10, 20, 30]);
}

// Inner-child insert triggers a rotate-then-recolor rebalance.
#[test]
fn insert_with_inner_case_rebalance() {
    let mut tree = RedBlackTree::new();
    for k in [10, 20, 30, 15] {
        tree.insert(k, k);
    }
    assert!(tree.is_valid());
    assert_eq!(walk_keys(&tree), vec![10, 15, 20, 30]);
}

// A longer ascending run stays sorted and balanced.
#[test]
fn ascending_run_stays_sorted_and_balanced() {
    let mut tree = RedBlackTree::new();
    for k in 1..=7 {
        tree.insert(k, k);
    }
    assert!(tree.is_valid());
    assert_eq!(walk_keys(&tree), (1..=7).collect::<Vec<_>>());
}

// Removing an interior key from a balanced tree keeps it sorted and valid.
#[test]
fn remove_interior_key() {
    let mut tree = RedBlackTree::new();
    for k in 1..=7 {
        tree.insert(k, k);
    }
    assert_eq!(tree.remove(&4), Some(4));
    assert!(tree.is_valid());
    assert_eq!(walk_keys(&tree), vec![1, 2, 3, 5, 6, 7]);
    assert_eq!(tree.get(&4), None);
}

// Removing a red leaf needs no fixup.
#[test]
fn remove_red_leaf_needs_no_fixup() {
    let mut tree = RedBlackTree::new();
    for k in [5, 3, 8, 1, 4] {
        tree.insert(k, k);
    }
    assert_eq!(tree.remove(&8), Some(8));
    assert!(tree.is_valid());
    assert_eq!(walk_keys(&tree), vec![1, 3, 4, 5]);
}

#[test]
fn remove_only_node_empties_tree() {
    let mut tree = RedBlackTree::new();
    tree.insert(1, "one");
    assert_eq!(tree.remove(&1), Some("one"));
    assert!(tree.is_empty());
    assert_eq!(walk_keys(&tree), Vec::<i32>::new());
}

#[test]
fn remove_of_absent_key_is_idempotent() {
    let mut tree = RedBlackTree::new();
    for k in [1, 2, 3] {
        tree.insert(k, k);
    }
    let before = walk_keys(&tree);
    assert_eq!(tree.remove(&99), None);
    assert_eq!(walk_keys(&tree), before);
}

#[test]
fn remove_root_with_two_children_preserves_slot_color() {
    let mut tree = RedBlackTree::new();
    for k in [20, 10, 30, 5, 15, 25, 35] {
        tree.insert(k, k);
    }
    assert!(tree.is_valid());
    assert_eq!(tree.remove(&20), Some(20));
    assert!(tree.is_valid());
    assert_eq!(walk_keys(&tree), vec![5, 10, 15, 25, 30, 35]);
}

#[test]
fn insert_overwrites_value_on_duplicate_key() {
    let mut tree = RedBlackTree::new();
    assert_eq!(tree.insert(1, "first"), None);
    assert_eq!(tree.insert(1, "second"), Some("first"));
    assert_eq!(tree.get(&1), Some(&"second"));
    assert_eq!(tree.len(), 1);
}

#[test]
fn insert_strict_rejects_duplicate_without_mutating() {
    let mut tree = RedBlackTree::new();
    tree.insert_strict(1, "first").unwrap();
    let err = tree.insert_strict(1, "second").unwrap_err();
    match err {
        rbtree::TreeError::DuplicateKey { key, value } => {
            assert_eq!(key, 1);
            assert_eq!(value, "second");
        }
    }
    assert_eq!(tree.get(&1), Some(&"first"));
    assert_eq!(tree.len(), 1);
}

#[test]
fn iter_mut_allows_updating_values_in_place() {
    let mut tree = RedBlackTree::new();
    for k in 1..=5 {
        tree.insert(k, k * 10);
    }
    for (_, v) in tree.iter_mut() {
        *v += 1;
    }
    assert_eq!(
        tree.values().copied().collect::<Vec<_>>(),
        vec![11, 21, 31, 41, 51]
    );
}

#[test]
fn double_ended_iteration_matches_reverse_sorted_order() {
    let mut tree = RedBlackTree::new();
    for k in [3, 1, 4, 1, 5, 9, 2, 6] {
        tree.insert(k, ());
    }
    let forward: Vec<_> = tree.keys().copied().collect();
    let mut backward: Vec<_> = tree.keys().rev().copied().collect();
    backward.reverse();
    assert_eq!(forward, backward);
}

#[test]
fn from_iterator_and_extend_build_a_valid_tree() {
    let mut tree: RedBlackTree<i32, i32> = (0..20).map(|k| (k, k * k)).collect();
    assert!(tree.is_valid());
    assert_eq!(tree.len(), 20);
    tree.extend((20..30).map(|k| (k, k * k)));
    assert!(tree.is_valid());
    assert_eq!(tree.len(), 30);
    assert_eq!(tree.get(&25), Some(&625));
}

#[test]
fn clear_drops_everything_and_tree_is_reusable() {
    let mut tree = RedBlackTree::new();
    for k in 1..=50 {
        tree.insert(k, k);
    }
    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.get_min(), None);
    tree.insert(1, 1);
    assert_eq!(tree.len(), 1);
    assert!(tree.is_valid());
}

#[test]
fn fixup_cases_are_exercised_by_every_permutation_of_three_keys() {
    // Any order of three distinct keys must produce a valid, balanced tree with
    // the median as a black root and the other two as red leaves.
    for perm in [10, 20, 30].into_iter().permutations(3) {
        let mut tree = RedBlackTree::new();
        for &k in &perm {
            tree.insert(k, k);
        }
        assert!(tree.is_valid(), "permutation {perm:?} violated invariants");
        assert_eq!(walk_keys(&tree), vec![10, 20, 30]);
    }
}

// Randomized cross-check against a BTreeMap oracle.
#[test]
fn randomized_insert_and_remove_matches_btreemap_oracle() {
    let mut rng = thread_rng();
    let mut tree = RedBlackTree::new();
    let mut oracle = BTreeMap::new();

    let mut keys = Vec::new();
    for _ in 0..1000 {
        let k: i64 = rng.gen_range(0..5000);
        let v: i64 = rng.gen();
        tree.insert(k, v);
        oracle.insert(k, v);
        keys.push(k);
    }
    assert!(tree.is_valid());
    assert_eq!(tree.len(), oracle.len());
    assert_eq!(walk_keys(&tree), oracle.keys().copied().collect::<Vec<_>>());

    keys.sort_unstable();
    keys.dedup();
    let (to_remove, _) = keys.split_at(keys.len() * 3 / 4);
    for k in to_remove {
        assert_eq!(tree.remove(k), oracle.remove(k));
    }

    assert!(tree.is_valid());
    assert_eq!(tree.len(), oracle.len());
    assert_eq!(walk_keys(&tree), oracle.keys().copied().collect::<Vec<_>>());
    for (k, v) in oracle.iter() {
        assert_eq!(tree.get(k), Some(v));
    }
}

#[test]
fn sequence_number_tracks_structural_mutations() {
    let mut tree = RedBlackTree::new();
    assert_eq!(tree.sequence_number(), 0);
    tree.insert(1, 1);
    tree.insert(2, 2);
    assert_eq!(tree.sequence_number(), 2);
    tree.remove(&1);
    assert_eq!(tree.sequence_number(), 3);
    // Overwriting an existing key is not a structural mutation.
    tree.insert(2, 20);
    assert_eq!(tree.sequence_number(), 3);
}
