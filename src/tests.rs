use std::{cmp::Ordering, ops::Range};

use proptest::prelude::*;

use crate::model;

use super::*;

fn insert_find_all(keys: &[u32]) {
    let mut tree: RedBlackTree<u32> = RedBlackTree::new();

    for &key in keys {
        assert!(tree.insert(key, ()).0);
        tree.assert_invariants();
    }

    assert_eq!(tree.len(), keys.len());

    for key in keys {
        let it = tree.find(key);
        assert_eq!(it.key(&tree), Ok(key), "item not found");
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

// Calls `f` with every permutation of `0..n`.
fn for_each_permutation(n: u32, f: impl Fn(&[u32])) {
    fn go(prefix: &mut Vec<u32>, rest: &mut Vec<u32>, f: &dyn Fn(&[u32])) {
        if rest.is_empty() {
            f(prefix);
            return;
        }

        for i in 0..rest.len() {
            let key = rest.remove(i);
            prefix.push(key);
            go(prefix, rest, f);
            prefix.pop();
            rest.insert(i, key);
        }
    }

    go(&mut Vec::new(), &mut (0..n).collect(), &f);
}

#[test]
fn four_elems_find() {
    for_each_permutation(4, insert_find_all);
}

#[test]
fn six_elems_find() {
    for_each_permutation(6, insert_find_all);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: RedBlackTree<u32> = RedBlackTree::new();

    for &key in keys {
        tree.insert(key, ());
        tree.assert_invariants();
    }

    for key in keys {
        let len = tree.len();
        assert_eq!(tree.remove(key), Ok((*key, ())));
        assert_eq!(tree.len(), len - 1);
        assert!(tree.find(key).is_end());
        tree.assert_invariants();
    }

    for &key in keys {
        tree.insert(key, ());
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        assert!(tree.remove(key).is_ok());
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_four() {
    for_each_permutation(4, insert_remove_all);
}

#[test]
fn remove_six() {
    for_each_permutation(6, insert_remove_all);
}

#[test]
fn remove_every_key_from_every_shape() {
    // Removing each key from trees of every insertion order exercises every delete fix-up case.
    for_each_permutation(7, |keys| {
        let mut tree: RedBlackTree<u32> = keys.iter().map(|&k| (k, ())).collect();

        for victim in 0..7 {
            assert_eq!(tree.remove(&victim), Ok((victim, ())));
            tree.assert_invariants();
            assert!(tree.keys().copied().eq((0..7).filter(|&k| k != victim)));
            tree.insert(victim, ());
            tree.assert_invariants();
        }
    });
}

fn sample_tree() -> RedBlackTree<u32, &'static str> {
    let mut tree = RedBlackTree::new();

    for (key, value) in [(10, "a"), (20, "b"), (30, "c"), (15, "d"), (25, "e")] {
        let (inserted, it) = tree.insert(key, value);
        assert!(inserted);
        assert_eq!(it.get(&tree), Ok((&key, &value)));
        tree.assert_invariants();
    }

    tree
}

#[test]
fn sample_shape() {
    let tree = sample_tree();

    let root = tree.root.expect("tree is not empty");
    assert_eq!(tree.color(Some(root)), Color::Black);
    assert_eq!(tree.node(root).key, 20);
    assert!(tree.keys().copied().eq([10, 15, 20, 25, 30]));

    // Equal black height on every root-to-leaf path: two black levels plus the null leaves.
    assert_eq!(tree.assert_invariants_at(root), 3);
}

#[test]
fn sample_remove_root_key() {
    let mut tree = sample_tree();

    assert_eq!(tree.remove(&20), Ok((20, "b")));
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.find(&20), tree.end());
    tree.assert_invariants();
    assert!(tree.keys().copied().eq([10, 15, 25, 30]));
}

#[test]
fn sample_remove_in_reverse() {
    let mut tree = sample_tree();

    for key in [25, 15, 30, 20, 10] {
        assert!(tree.remove(&key).is_ok());
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.begin(), tree.end());
}

#[test]
fn duplicates_rejected() {
    let mut tree = sample_tree();

    let (inserted, it) = tree.insert(15, "z");
    assert!(!inserted);
    assert_eq!(it, tree.find(&15));
    assert_eq!(it.value(&tree), Ok(&"d"));
    assert_eq!(tree.len(), 5);

    assert_eq!(tree.try_insert(30, "z"), Err(Error::DuplicateKey));
    assert_eq!(tree.get(&30), Some(&"c"));
    tree.assert_invariants();

    assert!(tree.try_insert(35, "f").is_ok());
    assert_eq!(tree.len(), 6);
}

#[test]
fn duplicates_allowed_keep_insertion_order() {
    let mut tree = RedBlackTree::with_policy(DuplicatePolicy::Allow);

    for (i, key) in [5, 3, 5, 8, 5, 3].into_iter().enumerate() {
        let (inserted, _) = tree.insert(key, i);
        assert!(inserted);
        tree.assert_invariants();
    }

    let pairs: Vec<(u32, usize)> = tree.iter().map(|(&k, &v)| (k, v)).collect();
    assert_eq!(pairs, [(3, 1), (3, 5), (5, 0), (5, 2), (5, 4), (8, 3)]);

    // Lookups and removals act on the first equal key.
    assert_eq!(tree.get(&5), Some(&0));
    assert_eq!(tree.remove(&5), Ok((5, 0)));
    assert_eq!(tree.get(&5), Some(&2));
    tree.assert_invariants();

    assert_eq!(tree.try_insert(8, 9).map(|it| it.is_end()), Ok(false));
    assert_eq!(tree.len(), 6);
}

#[test]
fn remove_missing_key() {
    let mut tree = sample_tree();

    assert_eq!(tree.remove(&11), Err(Error::NotFound));
    assert_eq!(tree.len(), 5);
    tree.assert_invariants();

    let mut empty: RedBlackTree<u32> = RedBlackTree::new();
    assert_eq!(empty.remove(&0), Err(Error::NotFound));
}

#[test]
fn iterator_walk_matches_in_order() {
    let tree: RedBlackTree<u32, u32> = (0..100).map(|k| ((k * 37) % 100, k)).collect();

    let mut walked = Vec::new();
    let mut it = tree.begin();
    while it != tree.end() {
        walked.push(*it.key(&tree).unwrap());
        it.increment(&tree).unwrap();
    }

    assert_eq!(walked, (0..100).collect::<Vec<_>>());
    assert!(walked.iter().eq(tree.keys()));

    // And back again from the end.
    let mut walked_back = Vec::new();
    let mut it = tree.end();
    it.decrement(&tree).unwrap();
    while !it.is_before_begin() {
        walked_back.push(*it.key(&tree).unwrap());
        it.decrement(&tree).unwrap();
    }

    walked_back.reverse();
    assert_eq!(walked, walked_back);
}

#[test]
fn sentinels() {
    let empty: RedBlackTree<u32> = RedBlackTree::new();
    assert_eq!(empty.begin(), empty.end());
    assert!(empty.begin().is_sentinel());

    let mut it = empty.end();
    assert_eq!(it.get(&empty), Err(Error::InvalidIterator));
    assert_eq!(it.increment(&empty), Err(Error::InvalidIterator));
    assert!(it.is_end());

    it.decrement(&empty).unwrap();
    assert!(it.is_before_begin());
    assert_eq!(it.key(&empty), Err(Error::InvalidIterator));
    assert_eq!(it.decrement(&empty), Err(Error::InvalidIterator));
    assert!(it.is_before_begin());

    it.increment(&empty).unwrap();
    assert!(it.is_end());

    let tree = sample_tree();
    let mut it = tree.begin();
    it.decrement(&tree).unwrap();
    assert!(it.is_before_begin());
    it.increment(&tree).unwrap();
    assert_eq!(it, tree.begin());
    assert_eq!(it.key(&tree), Ok(&10));
}

#[test]
fn stale_iterators_fail() {
    let mut tree = sample_tree();

    let fifteen = tree.find(&15);
    let twenty = tree.find(&20);
    assert_eq!(tree.remove(&20), Ok((20, "b")));

    // Removal of a node with two children does not disturb the other elements.
    assert_eq!(fifteen.key(&tree), Ok(&15));

    let mut stale = twenty;
    assert_eq!(stale.get(&tree), Err(Error::InvalidIterator));
    assert_eq!(stale.increment(&tree), Err(Error::InvalidIterator));
    assert_eq!(stale.decrement(&tree), Err(Error::InvalidIterator));
    assert_eq!(stale, twenty);
    assert_eq!(tree.remove_at(stale), Err(Error::NotFound));

    // The freed slot is reused, but the old iterator still does not resolve.
    let (_, reinserted) = tree.insert(20, "b2");
    assert_ne!(reinserted, twenty);
    assert_eq!(twenty.get(&tree), Err(Error::InvalidIterator));
    assert_eq!(reinserted.value(&tree), Ok(&"b2"));
}

#[test]
fn foreign_iterators_fail() {
    let a = sample_tree();
    let b = sample_tree();

    let it = a.find(&10);
    assert_eq!(it.get(&b), Err(Error::InvalidIterator));
    assert_ne!(a.end(), b.end());
    assert!(b.cursor_at(a.end()).is_err());
}

#[test]
fn remove_at_iterator() {
    let mut tree = sample_tree();

    let it = tree.find(&25);
    assert_eq!(tree.remove_at(it), Ok((25, "e")));
    assert_eq!(tree.remove_at(it), Err(Error::NotFound));
    assert_eq!(tree.remove_at(tree.end()), Err(Error::NotFound));
    assert_eq!(tree.len(), 4);
    tree.assert_invariants();
}

#[test]
fn get_at_mut_updates_value() {
    let mut tree = sample_tree();

    let it = tree.find(&30);
    *tree.get_at_mut(it).unwrap().1 = "updated";
    assert_eq!(tree.get(&30), Some(&"updated"));

    *tree.get_mut(&10).unwrap() = "ten";
    assert_eq!(tree.first_key_value(), Some((&10, &"ten")));
}

#[test]
fn custom_comparator() {
    let mut tree: RedBlackTree<u32, (), _> =
        RedBlackTree::with_comparator(|a: &u32, b: &u32| b.cmp(a));

    for key in [3, 1, 4, 1, 5, 9, 2, 6] {
        tree.insert(key, ());
        tree.assert_invariants();
    }

    assert!(tree.keys().copied().eq([9, 6, 5, 4, 3, 2, 1]));
    assert_eq!(tree.first_key_value(), Some((&9, &())));
}

#[test]
fn case_insensitive_comparator() {
    fn ignore_case(a: &String, b: &String) -> Ordering {
        a.to_lowercase().cmp(&b.to_lowercase())
    }

    let mut tree = RedBlackTree::with_comparator(ignore_case as fn(&String, &String) -> Ordering);

    assert!(tree.insert("Apple".to_string(), 1).0);
    assert!(!tree.insert("APPLE".to_string(), 2).0);
    assert!(tree.insert("banana".to_string(), 3).0);

    assert_eq!(tree.get(&"apple".to_string()), Some(&1));
    assert_eq!(tree.len(), 2);
}

#[test]
fn borrowed_lookups() {
    let mut tree: RedBlackTree<String, usize> = RedBlackTree::new();
    tree.insert("b".to_string(), 2);
    tree.insert("a".to_string(), 1);

    assert_eq!(tree.get("a"), Some(&1));
    assert!(tree.contains_key("b"));
    assert!(!tree.contains_key("c"));
    assert_eq!(tree.remove("a"), Ok(("a".to_string(), 1)));
}

#[test]
fn bounds() {
    let tree = sample_tree();

    assert_eq!(tree.lower_bound(&15).key(&tree), Ok(&15));
    assert_eq!(tree.lower_bound(&16).key(&tree), Ok(&20));
    assert_eq!(tree.upper_bound(&15).key(&tree), Ok(&20));
    assert_eq!(tree.lower_bound(&0), tree.begin());
    assert!(tree.lower_bound(&31).is_end());
    assert!(tree.upper_bound(&30).is_end());
}

#[test]
fn rotations_preserve_order() {
    let mut tree = sample_tree();
    let root = tree.root.unwrap();

    tree.rotate_left(root);
    assert_eq!(tree.node(tree.root.unwrap()).key, 30);
    assert_eq!(tree.parent(root), tree.root);
    assert!(tree.keys().copied().eq([10, 15, 20, 25, 30]));

    tree.rotate_right(tree.root.unwrap());
    assert_eq!(tree.root, Some(root));
    assert!(tree.keys().copied().eq([10, 15, 20, 25, 30]));
    tree.assert_invariants();
}

#[test]
fn iter_both_ends() {
    let tree = sample_tree();

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 5);
    assert_eq!(iter.next(), Some((&10, &"a")));
    assert_eq!(iter.next_back(), Some((&30, &"c")));
    assert_eq!(iter.len(), 3);
    assert!(iter.map(|(&k, _)| k).eq([15, 20, 25]));

    assert!(tree.values().rev().copied().eq(["c", "e", "b", "d", "a"]));

    let owned: Vec<_> = tree.into_iter().collect();
    assert_eq!(owned[0], (10, "a"));
    assert_eq!(owned.len(), 5);
}

#[test]
fn pop_both_ends() {
    let mut tree = sample_tree();

    assert_eq!(tree.pop_first(), Some((10, "a")));
    assert_eq!(tree.pop_last(), Some((30, "c")));
    tree.assert_invariants();
    assert_eq!(tree.last_key_value(), Some((&25, &"e")));
}

#[test]
fn entry_api() {
    let mut tree: RedBlackTree<&str, u32> = RedBlackTree::new();

    for word in ["a", "b", "a", "c", "a", "b"] {
        *tree.entry(word).or_insert(0) += 1;
        tree.assert_invariants();
    }

    assert_eq!(tree.get("a"), Some(&3));
    assert_eq!(tree.get("b"), Some(&2));
    assert_eq!(tree.get("c"), Some(&1));

    match tree.entry("b") {
        Entry::Occupied(mut entry) => {
            assert_eq!(entry.insert(10), 2);
            assert_eq!(entry.remove(), ("b", 10));
        }
        Entry::Vacant(_) => panic!("entry should be occupied"),
    }

    tree.entry("d").and_modify(|v| *v += 1).or_default();
    assert_eq!(tree.get("d"), Some(&0));
    assert_eq!(tree.entry("z").key(), &"z");
    assert_eq!(tree.len(), 3);
    tree.assert_invariants();
}

#[test]
fn entry_picks_first_equal_key() {
    let mut tree = RedBlackTree::with_policy(DuplicatePolicy::Allow);

    for (i, key) in [5u32, 5, 5, 3, 5, 8].into_iter().enumerate() {
        tree.insert(key, i);
    }

    let first = tree.find(&5);
    assert_eq!(tree.get(&5), Some(&0));

    match tree.entry(5) {
        Entry::Occupied(mut entry) => {
            assert_eq!(entry.get(), &0);
            assert_eq!(entry.position(), first);
            *entry.get_mut() = 10;
        }
        Entry::Vacant(_) => panic!("entry should be occupied"),
    }
    assert_eq!(first.value(&tree), Ok(&10));

    match tree.entry(5) {
        Entry::Occupied(entry) => assert_eq!(entry.remove(), (5, 10)),
        Entry::Vacant(_) => panic!("entry should be occupied"),
    }
    assert_eq!(tree.get(&5), Some(&1));
    tree.assert_invariants();

    // A vacant entry in a tree of duplicates still links at the right position.
    *tree.entry(4).or_insert(0) += 7;
    let pairs: Vec<(u32, usize)> = tree.iter().map(|(&k, &v)| (k, v)).collect();
    assert_eq!(pairs, [(3, 3), (4, 7), (5, 1), (5, 2), (5, 4), (8, 5)]);
    tree.assert_invariants();
}

#[test]
fn cursor_walk_and_remove() {
    let mut tree = sample_tree();

    let it = tree.find(&20);
    let mut curs = tree.cursor_at_mut(it).unwrap();
    assert_eq!(curs.peek_prev(), Some((&15, &"d")));
    assert_eq!(curs.remove_current(), Some((20, "b")));
    assert_eq!(curs.get(), Some((&25, &"e")));
    *curs.get_value_mut().unwrap() = "E";
    assert_eq!(curs.remove_current_and_move_prev(), Some((25, "E")));
    assert_eq!(curs.get(), Some((&15, &"d")));
    drop(curs);

    tree.assert_invariants();
    assert!(tree.keys().copied().eq([10, 15, 30]));

    let mut curs = tree.cursor_last();
    curs.move_next();
    assert_eq!(curs.get(), None);
    assert!(curs.position().is_end());
    curs.move_next();
    assert_eq!(curs.get(), Some((&10, &"a")));
}

#[test]
fn clear_and_reuse() {
    let mut tree = sample_tree();
    let old = tree.find(&10);

    tree.clear();
    tree.assert_invariants();
    assert!(tree.is_empty());
    assert_eq!(old.get(&tree), Err(Error::InvalidIterator));

    tree.insert(1, "one");
    assert_eq!(tree.len(), 1);
    tree.assert_invariants();
}

#[test]
fn large_tree_teardown() {
    let mut tree: RedBlackTree<u32, Box<u32>> = RedBlackTree::new();

    for key in 0..100_000 {
        tree.insert(key, Box::new(key));
    }

    tree.assert_invariants();
    assert_eq!(tree.len(), 100_000);
    drop(tree);
}

#[test]
fn dotgraph_lists_every_node() {
    let tree = sample_tree();

    let mut out = String::new();
    tree.dotgraph("sample", &mut out).unwrap();

    assert!(out.starts_with("digraph \"graph-sample\""));
    for key in [10, 15, 20, 25, 30] {
        assert!(out.contains(&format!("label=\"{key}\"")));
    }

    let mut empty = String::new();
    RedBlackTree::<u32>::new()
        .dotgraph("empty", &mut empty)
        .unwrap();
    assert_eq!(empty, "digraph \"graph-empty\" {}");
}

#[test]
fn debug_formats_as_map() {
    let tree: RedBlackTree<u32, char> = [(2, 'b'), (1, 'a')].into_iter().collect();
    assert_eq!(format!("{tree:?}"), "{1: 'a', 2: 'b'}");
}

#[test]
fn error_messages() {
    assert_eq!(Error::NotFound.to_string(), "no matching element in the tree");
    assert_eq!(
        Error::DuplicateKey.to_string(),
        "key is already present in the tree"
    );
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn multiset_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_multiset_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        values in proptest::collection::vec(0u32..1000, 0..100),
        ops in proptest::collection::vec(model::walk_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(values, ops);
    }

    #[test]
    fn iterator_equivalence(
        values in proptest::collection::vec(0u32..1000, 0..100),
        ops in proptest::collection::vec(model::walk_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_iterator_equivalence(values, ops);
    }
}
