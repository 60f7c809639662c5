//! Reference-model equivalence checks, shared by the property tests and the fuzz targets.

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::{DuplicatePolicy, Error, RedBlackTree, TreeIterator};

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Find(ItemValue),
    Remove(ItemValue),
    LowerBound(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
}

impl Op {
    // Resolves index-based values against the keys currently present, so that lookups and
    // removals mostly hit.
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(sorted, item)),
            Op::Find(item) => FinalOp::Find(get_value(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(sorted, item)),
            Op::LowerBound(item) => FinalOp::LowerBound(get_value(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Find(u32),
    Remove(u32),
    LowerBound(u32),
    First,
    PopFirst,
    Last,
    PopLast,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        value_strategy().prop_map(Op::Insert),
        value_strategy().prop_map(Op::Find),
        value_strategy().prop_map(Op::Remove),
        value_strategy().prop_map(Op::LowerBound),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
    ]
}

/// Runs `ops` against a duplicate-rejecting tree and a `BTreeMap`, asserting identical results
/// and the tree's invariants after every operation.
///
/// Each inserted value is tagged with the index of its operation, so rejected duplicates that
/// overwrote the stored value would be caught.
pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut btree = BTreeMap::new();
    let mut rb: RedBlackTree<u32, usize> = RedBlackTree::new();

    fn pair<'a>((k, v): (&'a u32, &'a usize)) -> (u32, usize) {
        (*k, *v)
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let sorted_keys: Vec<u32> = btree.keys().copied().collect();
        let final_op = op.finalize(&sorted_keys);

        match final_op {
            FinalOp::Insert(key) => {
                let from_btree = !btree.contains_key(&key);
                if from_btree {
                    btree.insert(key, op_id);
                }

                let (from_rb, it) = rb.insert(key, op_id);

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(
                    it.get(&rb).map(pair).ok(),
                    btree.get_key_value(&key).map(pair),
                    "FinalOp #{op_id}: {final_op:?}"
                );
            }

            FinalOp::Find(key) => {
                let from_btree = btree.get_key_value(&key).map(pair);
                let it = rb.find(&key);
                let from_rb = it.get(&rb).map(pair).ok();

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(from_btree.is_none(), it == rb.end());
            }

            FinalOp::Remove(key) => {
                let from_btree = btree.remove_entry(&key);
                let from_rb = rb.remove(&key).ok();

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
                assert!(rb.find(&key).is_end());
            }

            FinalOp::LowerBound(key) => {
                let from_btree = btree.range(key..).next().map(pair);
                let from_rb = rb.get_at(rb.lower_bound(&key)).map(pair).ok();

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first_key_value().map(pair);
                let from_rb = rb.first_key_value().map(pair);

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_rb = rb.pop_first();

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last_key_value().map(pair);
                let from_rb = rb.last_key_value().map(pair);

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_rb = rb.pop_last();

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }
        }

        rb.assert_invariants();
        assert_eq!(btree.len(), rb.len());
        assert!(btree.iter().map(pair).eq(rb.iter().map(pair)));
    }
}

/// Runs `ops` against a duplicate-allowing tree and a sorted `Vec`, asserting identical results
/// and the tree's invariants after every operation.
///
/// Equal keys must keep their insertion order, and lookups and removals must act on the first of
/// them.
pub fn run_multiset_equivalence(ops: Vec<Op>) {
    let mut vec: Vec<(u32, usize)> = Vec::new();
    let mut rb: RedBlackTree<u32, usize> = RedBlackTree::with_policy(DuplicatePolicy::Allow);

    fn pair<'a>((k, v): (&'a u32, &'a usize)) -> (u32, usize) {
        (*k, *v)
    }

    // Index of the first element not less than `key`.
    fn lower(v: &[(u32, usize)], key: u32) -> usize {
        v.partition_point(|&(k, _)| k < key)
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let sorted_keys: Vec<u32> = vec.iter().map(|&(k, _)| k).collect();
        let final_op = op.finalize(&sorted_keys);

        match final_op {
            FinalOp::Insert(key) => {
                let idx = vec.partition_point(|&(k, _)| k <= key);
                vec.insert(idx, (key, op_id));

                let (inserted, it) = rb.insert(key, op_id);

                assert!(inserted, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(it.get(&rb).map(pair), Ok((key, op_id)));
            }

            FinalOp::Find(key) => {
                let from_vec = vec.get(lower(&vec, key)).copied().filter(|&(k, _)| k == key);
                let from_rb = rb.get_at(rb.find(&key)).map(pair).ok();

                assert_eq!(from_vec, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(key) => {
                let idx = lower(&vec, key);
                let from_vec = vec
                    .get(idx)
                    .filter(|&&(k, _)| k == key)
                    .is_some()
                    .then(|| vec.remove(idx));
                let from_rb = rb.remove(&key).ok();

                assert_eq!(from_vec, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::LowerBound(key) => {
                let from_vec = vec.get(lower(&vec, key)).copied();
                let from_rb = rb.get_at(rb.lower_bound(&key)).map(pair).ok();

                assert_eq!(from_vec, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                assert_eq!(vec.first().copied(), rb.first_key_value().map(pair));
            }

            FinalOp::PopFirst => {
                let from_vec = (!vec.is_empty()).then(|| vec.remove(0));
                assert_eq!(from_vec, rb.pop_first(), "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                assert_eq!(vec.last().copied(), rb.last_key_value().map(pair));
            }

            FinalOp::PopLast => {
                assert_eq!(vec.pop(), rb.pop_last(), "FinalOp #{op_id}: {final_op:?}");
            }
        }

        rb.assert_invariants();
        assert_eq!(vec.len(), rb.len());
        assert!(vec.iter().copied().eq(rb.iter().map(pair)));
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum WalkOp {
    // Reading the current element is checked after every step, so it is not an op.
    MovePrev,
    MoveNext,
    PeekNext,
    PeekPrev,
    RemoveCurrent,
    RemoveCurrentMovePrev,
}

pub fn walk_op_strategy() -> impl Strategy<Value = WalkOp> {
    proptest::prop_oneof![
        Just(WalkOp::MovePrev),
        Just(WalkOp::MoveNext),
        Just(WalkOp::PeekNext),
        Just(WalkOp::PeekPrev),
        Just(WalkOp::RemoveCurrent),
        Just(WalkOp::RemoveCurrentMovePrev),
    ]
}

#[derive(Clone, Debug)]
pub struct WalkInput {
    pub values: Vec<u32>,
    pub ops: Vec<WalkOp>,
}

impl<'a> arbitrary::Arbitrary<'a> for WalkInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn value(u: &mut arbitrary::Unstructured<'_>) -> u32 {
            u32::arbitrary(u).unwrap_or(0)
        }

        fn op(u: &mut arbitrary::Unstructured<'_>) -> WalkOp {
            WalkOp::arbitrary(u).unwrap_or(WalkOp::MoveNext)
        }

        let num_values = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let values = core::iter::repeat_with(|| value(u))
            .take(num_values.into())
            .collect();

        let ops = core::iter::repeat_with(|| op(u))
            .take(num_ops.into())
            .collect();

        Ok(WalkInput { values, ops })
    }
}

/// Drives a [`CursorMut`](crate::CursorMut) and an index into a sorted `Vec` through `ops`,
/// asserting they point at the same element after every step.
pub fn run_cursor_equivalence(mut values: Vec<u32>, ops: Vec<WalkOp>) {
    values.sort_unstable();
    values.dedup();

    let mut vec = Vec::new();
    let mut rb: RedBlackTree<u32> = RedBlackTree::new();

    for val in values {
        vec.push(val);
        rb.insert(val, ());
    }

    fn vec_curs_prev(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_sub(1),
            None => v.len().checked_sub(1),
        }
    }

    fn vec_curs_next(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_add(1).filter(|&i| i < v.len()),
            None => (!v.is_empty()).then_some(0),
        }
    }

    fn key<'a>((k, _): (&'a u32, &'a ())) -> &'a u32 {
        k
    }

    let mut vec_curs = vec_curs_next(&vec, None);
    let mut rb_curs = rb.cursor_first_mut();

    // Check that the initial states are equivalent.
    {
        let v = vec_curs.map(|i| &vec[i]);
        let w = rb_curs.get().map(key);

        assert_eq!(v, w);
    }

    for op in ops {
        match op {
            WalkOp::MoveNext => {
                vec_curs = vec_curs_next(&vec, vec_curs);
                rb_curs.move_next();
            }

            WalkOp::MovePrev => {
                vec_curs = vec_curs_prev(&vec, vec_curs);
                rb_curs.move_prev();
            }

            WalkOp::PeekNext => {
                let v = vec_curs_next(&vec, vec_curs).map(|i| &vec[i]);
                let w = rb_curs.peek_next().map(key);

                assert_eq!(v, w);
            }

            WalkOp::PeekPrev => {
                let v = vec_curs_prev(&vec, vec_curs).map(|i| &vec[i]);
                let w = rb_curs.peek_prev().map(key);

                assert_eq!(v, w);
            }

            WalkOp::RemoveCurrent => {
                let v = vec_curs.map(|i| vec.remove(i));

                if vec_curs == Some(vec.len()) {
                    vec_curs = None;
                }

                let w = rb_curs.remove_current().map(|(k, _)| k);

                assert_eq!(v, w);
            }

            WalkOp::RemoveCurrentMovePrev => {
                let new_v_curs = vec_curs.is_some().then(|| vec_curs_prev(&vec, vec_curs));
                let v = vec_curs.map(|i| vec.remove(i));

                if let Some(vc) = new_v_curs {
                    vec_curs = vc;
                }

                let w = rb_curs.remove_current_and_move_prev().map(|(k, _)| k);

                assert_eq!(v, w);
            }
        }

        let v = vec_curs.map(|i| &vec[i]);
        let w = rb_curs.get().map(key);

        assert_eq!(v, w);
    }

    drop(rb_curs);
    rb.assert_invariants();
    assert!(vec.iter().eq(rb.keys()));
}

// A position in the sorted reference `Vec`, mirroring a `TreeIterator`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum VecPos {
    BeforeBegin,
    At(usize),
    End,
}

impl VecPos {
    fn first(len: usize) -> VecPos {
        if len == 0 {
            VecPos::End
        } else {
            VecPos::At(0)
        }
    }

    fn next(self, len: usize) -> Option<VecPos> {
        match self {
            VecPos::BeforeBegin => Some(VecPos::first(len)),
            VecPos::At(i) if i + 1 < len => Some(VecPos::At(i + 1)),
            VecPos::At(_) => Some(VecPos::End),
            VecPos::End => None,
        }
    }

    fn prev(self, len: usize) -> Option<VecPos> {
        match self {
            VecPos::BeforeBegin => None,
            VecPos::At(0) => Some(VecPos::BeforeBegin),
            VecPos::At(i) => Some(VecPos::At(i - 1)),
            VecPos::End if len == 0 => Some(VecPos::BeforeBegin),
            VecPos::End => Some(VecPos::At(len - 1)),
        }
    }

    fn get(self, v: &[u32]) -> Result<&u32, Error> {
        match self {
            VecPos::At(i) => Ok(&v[i]),
            _ => Err(Error::InvalidIterator),
        }
    }
}

/// Drives a detached [`TreeIterator`] and a position in a sorted `Vec` through `ops`, asserting
/// they agree after every step.
///
/// Removals go through [`RedBlackTree::remove_at`]; the removed position must become stale
/// while the neighbor taken beforehand stays valid.
pub fn run_iterator_equivalence(mut values: Vec<u32>, ops: Vec<WalkOp>) {
    values.sort_unstable();
    values.dedup();

    let mut rb: RedBlackTree<u32> = values.iter().map(|&v| (v, ())).collect();
    let mut vec = values;

    let mut pos = VecPos::first(vec.len());
    let mut it = rb.begin();

    fn stepped(
        rb: &RedBlackTree<u32>,
        it: TreeIterator,
        step: fn(&mut TreeIterator, &RedBlackTree<u32>) -> Result<(), Error>,
    ) -> Result<TreeIterator, Error> {
        let mut next = it;
        step(&mut next, rb)?;
        Ok(next)
    }

    for op in ops {
        match op {
            WalkOp::MoveNext => {
                let expected = pos.next(vec.len());
                let result = it.increment(&rb);
                assert_eq!(result.is_ok(), expected.is_some(), "increment at {pos:?}");
                pos = expected.unwrap_or(pos);
            }

            WalkOp::MovePrev => {
                let expected = pos.prev(vec.len());
                let result = it.decrement(&rb);
                assert_eq!(result.is_ok(), expected.is_some(), "decrement at {pos:?}");
                pos = expected.unwrap_or(pos);
            }

            WalkOp::PeekNext => {
                let v = pos.next(vec.len()).map(|p| p.get(&vec).ok());
                let w = stepped(&rb, it, TreeIterator::increment)
                    .ok()
                    .map(|next| next.key(&rb).ok());
                assert_eq!(v, w);
            }

            WalkOp::PeekPrev => {
                let v = pos.prev(vec.len()).map(|p| p.get(&vec).ok());
                let w = stepped(&rb, it, TreeIterator::decrement)
                    .ok()
                    .map(|prev| prev.key(&rb).ok());
                assert_eq!(v, w);
            }

            WalkOp::RemoveCurrent | WalkOp::RemoveCurrentMovePrev => {
                let VecPos::At(i) = pos else {
                    assert_eq!(rb.remove_at(it), Err(Error::NotFound));
                    continue;
                };

                let (new_pos, neighbor) = if let WalkOp::RemoveCurrent = op {
                    let new_pos = if i + 1 < vec.len() { VecPos::At(i) } else { VecPos::End };
                    (new_pos, stepped(&rb, it, TreeIterator::increment))
                } else {
                    let new_pos = if i == 0 { VecPos::BeforeBegin } else { VecPos::At(i - 1) };
                    (new_pos, stepped(&rb, it, TreeIterator::decrement))
                };

                let removed = vec.remove(i);
                assert_eq!(rb.remove_at(it), Ok((removed, ())));
                assert_eq!(it.get(&rb), Err(Error::InvalidIterator));

                pos = new_pos;
                it = neighbor.expect("stepping from an element never fails");
            }
        }

        assert_eq!(pos.get(&vec), it.key(&rb), "position {pos:?}");
        assert_eq!(it.is_end(), pos == VecPos::End);
        assert_eq!(it.is_before_begin(), pos == VecPos::BeforeBegin);
    }

    rb.assert_invariants();
    assert!(vec.iter().eq(rb.keys()));
}
