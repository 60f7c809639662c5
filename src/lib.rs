//! An arena-backed red-black tree.

// Conventions used in comments follow Cormen et al.:
// - The parent of a node `x` is denoted `p(x)`, its grandparent `p(p(x))`.
// - The sibling of `x` is the other child of `p(x)`; the uncle of `x` is the sibling of `p(x)`.
// - Missing children are black "null leaves". They are never materialized.
//
// The invariants of a red-black tree are:
// 1. An in-order walk visits keys in comparator order.
// 2. Every node is red or black; null leaves are black.
// 3. The root is black.
// 4. No red node has a red child.
// 5. Every path from a node to a descendant null leaf crosses the same number of black nodes.
//
// Nodes live in `slots`. Child links are the owning edges of the tree and parent links are plain
// back-references; both are slot indices. A vacated slot keeps a bumped generation so detached
// `TreeIterator`s naming it can be rejected.

use core::{
    borrow::Borrow,
    cmp::Ordering,
    fmt, mem,
    sync::atomic::{self, AtomicUsize},
};

use log::{debug, trace};

mod compare;
mod cursor;
mod debug;
mod entry;
mod error;
mod iter;
mod node;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use compare::{Comparator, NaturalOrder};
pub use cursor::{Cursor, CursorMut, TreeIterator};
pub use entry::{Entry, OccupiedEntry, VacantEntry};
pub use error::Error;
pub use iter::{IntoIter, Iter, Keys, Values};

use cursor::Position;
use node::{Color, Dir, Link, Node, NodeId, Slot};

/// What [`RedBlackTree::insert`] does with a key that compares equal to one already stored.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DuplicatePolicy {
    /// The insertion is rejected and the tree is left unchanged (set semantics).
    #[default]
    Reject,
    /// The key is stored after every equal key already present (multiset semantics).
    Allow,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TreeId(usize);

static NEXT_TREE_ID: AtomicUsize = AtomicUsize::new(0);

impl TreeId {
    fn next() -> TreeId {
        TreeId(NEXT_TREE_ID.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

/// An ordered associative container based on a [red-black tree].
///
/// Keys are ordered by a [`Comparator`], [`NaturalOrder`] unless one is supplied. Whether equal
/// keys may coexist is decided once, at construction, by a [`DuplicatePolicy`].
///
/// [red-black tree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
pub struct RedBlackTree<K, V = (), C = NaturalOrder> {
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    root: Link,
    len: usize,
    cmp: C,
    policy: DuplicatePolicy,
    id: TreeId,
}

impl<K, V> RedBlackTree<K, V> {
    /// Returns a new empty tree ordered by [`Ord`] that rejects duplicate keys.
    pub fn new() -> Self {
        Self::with_comparator_and_policy(NaturalOrder, DuplicatePolicy::Reject)
    }

    /// Returns a new empty tree ordered by [`Ord`] with the given duplicate-key policy.
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self::with_comparator_and_policy(NaturalOrder, policy)
    }
}

impl<K, V> Default for RedBlackTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> RedBlackTree<K, V, C> {
    /// Returns a new empty tree ordered by `cmp` that rejects duplicate keys.
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_comparator_and_policy(cmp, DuplicatePolicy::Reject)
    }

    pub fn with_comparator_and_policy(cmp: C, policy: DuplicatePolicy) -> Self {
        RedBlackTree {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            cmp,
            policy,
            id: TreeId::next(),
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        let empty = self.len == 0;
        debug_assert_eq!(empty, self.root.is_none());
        empty
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Returns an iterator positioned at the minimum element, or [`end`](Self::end) if the tree
    /// is empty.
    pub fn begin(&self) -> TreeIterator {
        match self.extreme(Dir::Left) {
            Some(first) => self.iter_at(first),
            None => self.end(),
        }
    }

    /// Returns the past-the-last sentinel.
    pub fn end(&self) -> TreeIterator {
        TreeIterator::new(self.id, Position::End)
    }

    /// Returns the first key-value pair in the tree.
    ///
    /// The returned key is the minimum key in the tree.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.extreme(Dir::Left).map(|first| self.key_value(first))
    }

    /// Returns the last key-value pair in the tree.
    ///
    /// The returned key is the maximum key in the tree.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.extreme(Dir::Right).map(|last| self.key_value(last))
    }

    /// Removes and returns the first key-value pair in the tree.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let first = self.extreme(Dir::Left)?;
        Some(self.remove_node(first))
    }

    /// Removes and returns the last key-value pair in the tree.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let last = self.extreme(Dir::Right)?;
        Some(self.remove_node(last))
    }

    /// Returns the key-value pair referenced by `it`.
    ///
    /// Fails with [`Error::InvalidIterator`] if `it` is a sentinel, belongs to another tree, or
    /// refers to an element that has since been removed.
    pub fn get_at(&self, it: TreeIterator) -> Result<(&K, &V), Error> {
        let index = self.resolve(it).ok_or(Error::InvalidIterator)?;
        Ok(self.key_value(index))
    }

    /// Returns the key and a mutable reference to the value referenced by `it`.
    pub fn get_at_mut(&mut self, it: TreeIterator) -> Result<(&K, &mut V), Error> {
        let index = self.resolve(it).ok_or(Error::InvalidIterator)?;
        let node = self.node_mut(index);
        Ok((&node.key, &mut node.value))
    }

    /// Removes the element referenced by `it`.
    ///
    /// Iterators referring to other elements remain valid.
    pub fn remove_at(&mut self, it: TreeIterator) -> Result<(K, V), Error> {
        let index = self.resolve(it).ok_or(Error::NotFound)?;
        Ok(self.remove_node(index))
    }

    /// Returns an iterator over the elements of the tree, in order.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter::new(self)
    }

    /// Returns an iterator over the keys of the tree, in order.
    pub fn keys(&self) -> Keys<'_, K, V, C> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the tree, in key order.
    pub fn values(&self) -> Values<'_, K, V, C> {
        Values { inner: self.iter() }
    }

    /// Returns a cursor pointing at the first element, or at the ghost non-element if the tree is
    /// empty.
    pub fn cursor_first(&self) -> Cursor<'_, K, V, C> {
        Cursor::new(self, self.extreme(Dir::Left))
    }

    /// Returns a cursor pointing at the last element, or at the ghost non-element if the tree is
    /// empty.
    pub fn cursor_last(&self) -> Cursor<'_, K, V, C> {
        Cursor::new(self, self.extreme(Dir::Right))
    }

    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, K, V, C> {
        let first = self.extreme(Dir::Left);
        CursorMut::new(self, first)
    }

    pub fn cursor_last_mut(&mut self) -> CursorMut<'_, K, V, C> {
        let last = self.extreme(Dir::Right);
        CursorMut::new(self, last)
    }

    /// Returns a cursor pointing at the element referenced by `it`.
    ///
    /// Both sentinels map to the ghost non-element.
    pub fn cursor_at(&self, it: TreeIterator) -> Result<Cursor<'_, K, V, C>, Error> {
        let link = self.resolve_position(it)?;
        Ok(Cursor::new(self, link))
    }

    pub fn cursor_at_mut(&mut self, it: TreeIterator) -> Result<CursorMut<'_, K, V, C>, Error> {
        let link = self.resolve_position(it)?;
        Ok(CursorMut::new(self, link))
    }

    /// Clears the tree, removing all elements.
    ///
    /// Nodes are released bottom-up without recursion, so arbitrarily deep trees are safe to
    /// drop.
    pub fn clear(&mut self) {
        if self.len > 0 {
            debug!("clearing tree of {} nodes", self.len);
        }

        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            // Descend to the minimum node.
            let (cur, parent) = self.min_in_subtree(cur);
            let parent = parent.or_else(|| self.parent(cur));

            let right = self.right(cur);

            // Elevate the node's right child (which may be None).
            self.replace_child_or_set_root(parent, cur, right);
            self.maybe_set_parent(right, parent);

            drop(self.dealloc(cur));
            self.len -= 1;

            // If the node had no right child, climb to the parent. If the node had no parent,
            // the tree is empty.
            opt_cur = right.or(parent);
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len, 0);
    }

    // Arena ==================================================================

    #[inline]
    fn node(&self, index: usize) -> &Node<K, V> {
        match &self.slots[index].node {
            Some(node) => node,
            None => unreachable!("link to vacant slot {index}"),
        }
    }

    #[inline]
    fn node_mut(&mut self, index: usize) -> &mut Node<K, V> {
        match &mut self.slots[index].node {
            Some(node) => node,
            None => unreachable!("link to vacant slot {index}"),
        }
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                debug_assert!(slot.node.is_none());
                slot.node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    fn dealloc(&mut self, index: usize) -> Node<K, V> {
        let slot = &mut self.slots[index];
        let Some(node) = slot.node.take() else {
            unreachable!("double free of slot {index}");
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        node
    }

    fn key_value(&self, index: usize) -> (&K, &V) {
        let node = self.node(index);
        (&node.key, &node.value)
    }

    pub(crate) fn iter_at(&self, index: usize) -> TreeIterator {
        let id = NodeId {
            index,
            generation: self.slots[index].generation,
        };
        TreeIterator::new(self.id, Position::At(id))
    }

    // Returns the slot referenced by `it`, if it is a live element of this tree.
    fn resolve(&self, it: TreeIterator) -> Option<usize> {
        match it.pos {
            Position::At(id) if it.tree == self.id => {
                let slot = self.slots.get(id.index)?;
                (slot.generation == id.generation && slot.node.is_some()).then_some(id.index)
            }
            _ => None,
        }
    }

    // Like `resolve`, but maps both sentinels of this tree to `None`.
    fn resolve_position(&self, it: TreeIterator) -> Result<Link, Error> {
        if it.tree != self.id {
            return Err(Error::InvalidIterator);
        }

        match it.pos {
            Position::At(_) => self.resolve(it).map(Some).ok_or(Error::InvalidIterator),
            Position::BeforeBegin | Position::End => Ok(None),
        }
    }

    // Links ==================================================================

    #[inline]
    fn parent(&self, node: usize) -> Link {
        self.node(node).parent
    }

    #[inline]
    fn child(&self, node: usize, dir: Dir) -> Link {
        self.node(node).children[dir as usize]
    }

    #[inline]
    fn left(&self, node: usize) -> Link {
        self.child(node, Dir::Left)
    }

    #[inline]
    fn right(&self, node: usize) -> Link {
        self.child(node, Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, node: usize, parent: Link) -> Link {
        mem::replace(&mut self.node_mut(node).parent, parent)
    }

    #[inline]
    fn set_child(&mut self, node: usize, dir: Dir, child: Link) -> Link {
        mem::replace(&mut self.node_mut(node).children[dir as usize], child)
    }

    fn maybe_set_parent(&mut self, opt_node: Link, parent: Link) {
        let Some(node) = opt_node else {
            return;
        };

        self.set_parent(node, parent);
    }

    /// Returns the color of the pointed-to node. Null leaves are black.
    #[inline]
    fn color(&self, node: Link) -> Color {
        node.map_or(Color::Black, |n| self.node(n).color)
    }

    #[inline]
    fn is_red(&self, node: Link) -> bool {
        self.color(node) == Color::Red
    }

    #[inline]
    fn set_color(&mut self, node: usize, color: Color) {
        self.node_mut(node).color = color;
    }

    fn which_child(&self, parent: usize, child: usize) -> Dir {
        if self.left(parent) == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }

    #[inline]
    fn replace_child_or_set_root(&mut self, parent: Link, old_child: usize, new_child: Link) {
        match parent {
            Some(parent) => self.replace_child(parent, old_child, new_child),
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    fn replace_child(&mut self, parent: usize, old_child: usize, new_child: Link) {
        let dir = self.which_child(parent, old_child);
        debug_assert_eq!(self.child(parent, dir), Some(old_child));
        self.set_child(parent, dir, new_child);
    }

    // Returns the node at the `dir` end of the subtree rooted at `root`.
    fn extreme_in_subtree(&self, root: usize, dir: Dir) -> usize {
        let mut cur = root;

        while let Some(next) = self.child(cur, dir) {
            cur = next;
        }

        cur
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    #[inline]
    fn min_in_subtree(&self, root: usize) -> (usize, Link) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = self.left(cur) {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    // Returns the first (`Dir::Left`) or last (`Dir::Right`) node of the tree.
    pub(crate) fn extreme(&self, dir: Dir) -> Link {
        self.root.map(|root| self.extreme_in_subtree(root, dir))
    }

    // Returns the in-order neighbor of `node`: the successor for `Dir::Right`, the predecessor
    // for `Dir::Left`.
    pub(crate) fn neighbor(&self, node: usize, dir: Dir) -> Link {
        if let Some(child) = self.child(node, dir) {
            return Some(self.extreme_in_subtree(child, !dir));
        }

        // Ascend until arriving from the opposite side.
        let mut cur = node;
        while let Some(parent) = self.parent(cur) {
            if self.which_child(parent, cur) == !dir {
                return Some(parent);
            }

            cur = parent;
        }

        None
    }

    // Moves a cursor position one step toward `dir`. `None` is the ghost between last and first.
    pub(crate) fn step(&self, cur: Link, dir: Dir) -> Link {
        match cur {
            Some(node) => self.neighbor(node, dir),
            None => self.extreme(!dir),
        }
    }

    pub(crate) fn next_position(&self, it: TreeIterator) -> Result<TreeIterator, Error> {
        self.step_position(it, Dir::Right)
    }

    pub(crate) fn prev_position(&self, it: TreeIterator) -> Result<TreeIterator, Error> {
        self.step_position(it, Dir::Left)
    }

    fn step_position(&self, it: TreeIterator, dir: Dir) -> Result<TreeIterator, Error> {
        if it.tree != self.id {
            return Err(Error::InvalidIterator);
        }

        // `from` is the sentinel stepping toward `dir` may start at, `to` the one it ends at.
        let (from, to) = match dir {
            Dir::Right => (Position::BeforeBegin, Position::End),
            Dir::Left => (Position::End, Position::BeforeBegin),
        };

        let next = match it.pos {
            Position::At(_) => {
                let node = self.resolve(it).ok_or(Error::InvalidIterator)?;
                self.neighbor(node, dir)
            }
            pos if pos == from => self.extreme(!dir),
            _ => return Err(Error::InvalidIterator),
        };

        Ok(match next {
            Some(node) => self.iter_at(node),
            None => TreeIterator::new(self.id, to),
        })
    }

    // Rotations ==============================================================

    // Performs a rotation, moving `up` up and its parent `down` down.
    fn rotate_at(&mut self, down: usize, up: usize) {
        // - `down` becomes the `dir` child of `up`.
        // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
        let dir = if self.right(down) == Some(up) {
            Dir::Left
        } else {
            Dir::Right
        };

        trace!("rotating {dir:?} at {down}");

        let across = self.child(up, dir);
        self.set_child(down, !dir, across);
        self.maybe_set_parent(across, Some(down));

        self.set_child(up, dir, Some(down));
        let parent = self.set_parent(down, Some(up));
        self.set_parent(up, parent);

        self.replace_child_or_set_root(parent, down, Some(up));
    }

    // Rotates `node` toward `dir`: its `!dir` child takes its place.
    fn rotate(&mut self, node: usize, dir: Dir) {
        match dir {
            Dir::Left => self.rotate_left(node),
            Dir::Right => self.rotate_right(node),
        }
    }

    fn rotate_left(&mut self, node: usize) {
        let up = self
            .right(node)
            .expect("left rotation requires a right child");
        self.rotate_at(node, up);
    }

    fn rotate_right(&mut self, node: usize) {
        let up = self
            .left(node)
            .expect("right rotation requires a left child");
        self.rotate_at(node, up);
    }

    // Insertion ==============================================================

    // Links a new red node as the `dir` child of `parent` (or as the root) and rebalances.
    //
    // `parent`'s `dir` child must be empty.
    fn link_new(&mut self, parent: Link, dir: Dir, key: K, value: V) -> usize {
        let node = self.alloc(Node::new(key, value));
        self.set_parent(node, parent);

        match parent {
            Some(parent) => {
                debug_assert!(self.child(parent, dir).is_none());
                self.set_child(parent, dir, Some(node));
            }
            None => self.root = Some(node),
        }

        self.len += 1;
        self.rebalance_inserted(node);

        node
    }

    // Performs a bottom-up rebalance of the tree after the insertion of the red node `node`.
    fn rebalance_inserted(&mut self, node: usize) {
        let mut x = node;

        loop {
            // `x` is red. If it is the root, recoloring the root below is enough.
            let Some(mut parent) = self.parent(x) else {
                break;
            };

            // Case 1: black parent, no violation.
            if !self.is_red(Some(parent)) {
                break;
            }

            // A red parent is never the root, so the grandparent exists.
            let grandparent = self.parent(parent).expect("red node must not be the root");
            let parent_dir = self.which_child(grandparent, parent);
            let uncle = self.child(grandparent, !parent_dir);

            // Case 2: red uncle. Push the blackness of the grandparent down and continue above.
            if let Some(uncle) = uncle.filter(|&u| self.is_red(Some(u))) {
                trace!("insert fix-up: recolor at {grandparent}");
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                x = grandparent;
                continue;
            }

            // Case 3: black uncle, `x` is an inner child. Rotate it to the outside.
            if self.which_child(parent, x) != parent_dir {
                trace!("insert fix-up: inner child at {x}");
                self.rotate(parent, parent_dir);
                parent = x;
            }

            // Case 4: black uncle, outer child.
            trace!("insert fix-up: outer child under {grandparent}");
            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            self.rotate(grandparent, !parent_dir);
            break;
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    // Removal ================================================================

    // Unlinks `node` from the tree, rebalances, and frees its slot.
    fn remove_node(&mut self, node: usize) -> (K, V) {
        // There are three possible cases:
        //
        // 1. `node` has two children.
        //
        //    Its successor (the least node of its right subtree) takes over its position and
        //    color. The successor has no left child; its right child moves up into the
        //    successor's old position, which is where black height may have been lost.
        //
        // 2. `node` has one child.
        //
        //    The child moves up into `node`'s position.
        //
        // 3. `node` is a leaf.
        //
        //    The position becomes a null leaf.
        //
        // If the node that vanished from the vacated position was black, that position is
        // "doubly black" and the delete fix-up runs on it.
        let parent = self.parent(node);
        let left = self.left(node);
        let right = self.right(node);

        let (x, x_parent, x_dir, removed_color) = match (left, right) {
            (Some(left), Some(right)) => {
                let (successor, successor_parent) = self.min_in_subtree(right);
                let successor_color = self.color(Some(successor));
                let successor_right = self.right(successor);

                let (x_parent, x_dir) = match successor_parent {
                    Some(successor_parent) => {
                        // Elevate the successor's right child to replace it.
                        self.set_child(successor_parent, Dir::Left, successor_right);
                        self.maybe_set_parent(successor_right, Some(successor_parent));

                        self.set_child(successor, Dir::Right, Some(right));
                        self.set_parent(right, Some(successor));

                        (successor_parent, Dir::Left)
                    }
                    // The successor is `right` itself and keeps its right subtree.
                    None => (successor, Dir::Right),
                };

                self.replace_child_or_set_root(parent, node, Some(successor));
                self.set_parent(successor, parent);
                self.set_child(successor, Dir::Left, Some(left));
                self.set_parent(left, Some(successor));

                let node_color = self.color(Some(node));
                self.set_color(successor, node_color);

                (successor_right, Some(x_parent), x_dir, successor_color)
            }

            (Some(child), None) | (None, Some(child)) => {
                let dir = parent.map_or(Dir::Left, |p| self.which_child(p, node));
                self.replace_child_or_set_root(parent, node, Some(child));
                self.set_parent(child, parent);

                (Some(child), parent, dir, self.color(Some(node)))
            }

            (None, None) => {
                let dir = parent.map_or(Dir::Left, |p| self.which_child(p, node));
                self.replace_child_or_set_root(parent, node, None);

                (None, parent, dir, self.color(Some(node)))
            }
        };

        if removed_color == Color::Black {
            self.rebalance_removed(x, x_parent, x_dir);
        }

        self.len -= 1;

        let Node { key, value, .. } = self.dealloc(node);
        (key, value)
    }

    // Restores black height at the doubly black position `x`, the `dir` child of `parent`.
    //
    // `x` may be a null leaf, in which case only `parent` and `dir` identify the position.
    fn rebalance_removed(&mut self, mut x: Link, mut parent: Link, mut dir: Dir) {
        while x != self.root && !self.is_red(x) {
            let Some(p) = parent else {
                break;
            };

            // `x` carries one less black than its sibling's side, so the sibling is never a null
            // leaf.
            let mut sibling = self
                .child(p, !dir)
                .expect("doubly black position must have a sibling");

            // Case 1: red sibling. Rotate it above the parent so the new sibling is black.
            if self.is_red(Some(sibling)) {
                trace!("delete fix-up: red sibling under {p}");
                self.set_color(sibling, Color::Black);
                self.set_color(p, Color::Red);
                self.rotate(p, dir);
                sibling = self
                    .child(p, !dir)
                    .expect("doubly black position must have a sibling");
            }

            let near = self.child(sibling, dir);
            let mut far = self.child(sibling, !dir);

            // Case 2: black sibling with black children. Move the extra black up one level; a
            // red parent absorbs it when the loop exits.
            if !self.is_red(near) && !self.is_red(far) {
                trace!("delete fix-up: recolor sibling {sibling}");
                self.set_color(sibling, Color::Red);
                x = Some(p);
                parent = self.parent(p);
                dir = parent.map_or(Dir::Left, |pp| self.which_child(pp, p));
                continue;
            }

            // Case 3: black sibling, black far child, red near child. Rotate the near child up so
            // that the sibling has a red far child.
            if !self.is_red(far) {
                let near = near.expect("red child must exist");
                trace!("delete fix-up: red near child {near}");
                self.set_color(near, Color::Black);
                self.set_color(sibling, Color::Red);
                self.rotate(sibling, !dir);
                far = Some(sibling);
                sibling = near;
            }

            // Case 4: black sibling with red far child.
            trace!("delete fix-up: red far child under {sibling}");
            let parent_color = self.color(Some(p));
            self.set_color(sibling, parent_color);
            self.set_color(p, Color::Black);
            if let Some(far) = far {
                self.set_color(far, Color::Black);
            }
            self.rotate(p, dir);

            x = self.root;
            break;
        }

        if let Some(x) = x {
            self.set_color(x, Color::Black);
        }
    }
}

impl<K, V, C> RedBlackTree<K, V, C>
where
    C: Comparator<K>,
{
    /// Inserts `key` with `value`.
    ///
    /// Returns whether a new element was created together with an iterator to the element with
    /// that key. If the key is present and the tree rejects duplicates, the returned iterator
    /// refers to the existing element and the tree is unchanged.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, key: K, value: V) -> (bool, TreeIterator) {
        match self.insertion_point(&key) {
            Ok(existing) => (false, self.iter_at(existing)),
            Err((parent, dir)) => {
                let node = self.link_new(parent, dir, key, value);
                (true, self.iter_at(node))
            }
        }
    }

    /// Inserts `key` with `value`, failing with [`Error::DuplicateKey`] if the tree rejects
    /// duplicates and already contains an equal key.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<TreeIterator, Error> {
        match self.insert(key, value) {
            (true, it) => Ok(it),
            (false, _) => Err(Error::DuplicateKey),
        }
    }

    /// Returns the entry for `key`, for in-place insertion or modification.
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, C> {
        match self.search(&key) {
            Ok(node) => Entry::Occupied(OccupiedEntry { tree: self, node }),
            Err((parent, dir)) => Entry::Vacant(VacantEntry {
                tree: self,
                key,
                parent,
                dir,
            }),
        }
    }

    // Returns the existing node rejecting an insertion of `key`, or the position to link it at.
    fn insertion_point(&self, key: &K) -> Result<usize, (Link, Dir)> {
        let mut parent = None;
        let mut dir = Dir::Left;
        let mut opt_cur = self.root;

        // Descend the tree, looking for a suitable leaf.
        while let Some(cur) = opt_cur {
            dir = match self.cmp.compare(key, &self.node(cur).key) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => match self.policy {
                    DuplicatePolicy::Reject => return Ok(cur),
                    // Equal keys go after the ones already present.
                    DuplicatePolicy::Allow => Dir::Right,
                },
                Ordering::Greater => Dir::Right,
            };

            parent = Some(cur);
            opt_cur = self.child(cur, dir);
        }

        Err((parent, dir))
    }

    // Returns the first node equal to `key` in order, or the position a new node for `key` would
    // occupy. Agrees with `find_raw` on which equal node is meant.
    fn search(&self, key: &K) -> Result<usize, (Link, Dir)> {
        let mut found = None;
        let mut parent = None;
        let mut dir = Dir::Left;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            dir = match self.cmp.compare(key, &self.node(cur).key) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => {
                    if self.policy == DuplicatePolicy::Reject {
                        return Ok(cur);
                    }

                    // Keep looking for an earlier equal key.
                    found = Some(cur);
                    Dir::Left
                }
                Ordering::Greater => Dir::Right,
            };

            parent = Some(cur);
            opt_cur = self.child(cur, dir);
        }

        found.ok_or((parent, dir))
    }

    /// Checks every structural and red-black invariant, panicking on the first violation.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        assert_eq!(
            self.len + self.free.len(),
            self.slots.len(),
            "every slot must be either live or free"
        );

        let Some(root) = self.root else {
            assert_eq!(self.len, 0);
            return;
        };

        assert_eq!(self.parent(root), None, "root must not have a parent");
        assert_eq!(self.color(Some(root)), Color::Black, "root must be black");

        self.assert_invariants_at(root);

        let mut count = 0;
        let mut prev: Option<&K> = None;
        for (key, _) in self.iter() {
            if let Some(prev) = prev {
                let ordering = self.cmp.compare(prev, key);
                let in_order = match self.policy {
                    DuplicatePolicy::Reject => ordering == Ordering::Less,
                    DuplicatePolicy::Allow => ordering != Ordering::Greater,
                };
                assert!(in_order, "keys out of order after element {count}");
            }

            prev = Some(key);
            count += 1;
        }

        assert_eq!(count, self.len, "length does not match reachable nodes");
    }

    // Returns the number of black nodes on every path from `node` down to a null leaf, counting
    // `node` and the leaf.
    fn assert_invariants_at(&self, node: usize) -> usize {
        let mut heights = [0; 2];

        for dir in [Dir::Left, Dir::Right] {
            heights[dir as usize] = match self.child(node, dir) {
                Some(child) => {
                    // Ensure child's parent link points to this node.
                    assert_eq!(self.parent(child), Some(node), "broken parent link at {child}");

                    if self.is_red(Some(node)) {
                        assert!(!self.is_red(Some(child)), "red node {node} has a red child");
                    }

                    self.assert_invariants_at(child)
                }
                None => 1,
            };
        }

        assert_eq!(heights[0], heights[1], "black height differs below {node}");

        heights[0] + usize::from(self.color(Some(node)) == Color::Black)
    }
}

impl<K, V, C> RedBlackTree<K, V, C> {
    /// Returns an iterator positioned at the element matching `key`, or [`end`](Self::end) if
    /// there is none.
    ///
    /// If the tree holds several equal keys, the first of them is returned.
    pub fn find<Q>(&self, key: &Q) -> TreeIterator
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        match self.find_raw(key) {
            Some(node) => self.iter_at(node),
            None => self.end(),
        }
    }

    /// Returns an iterator at the first element whose key is not less than `key`.
    pub fn lower_bound<Q>(&self, key: &Q) -> TreeIterator
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.bound(|ordering| ordering != Ordering::Greater, key)
    }

    /// Returns an iterator at the first element whose key is greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> TreeIterator
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.bound(|ordering| ordering == Ordering::Less, key)
    }

    /// Returns a reference to the value associated with `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.find_raw(key).map(|node| &self.node(node).value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.find_raw(key).map(|node| self.key_value(node))
    }

    /// Returns a mutable reference to the value associated with `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let node = self.find_raw(key)?;
        Some(&mut self.node_mut(node).value)
    }

    /// Returns `true` if the tree contains an element with the given key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        self.find_raw(key).is_some()
    }

    /// Removes the element associated with `key`, returning it.
    ///
    /// If the tree holds several equal keys, the first of them is removed. Fails with
    /// [`Error::NotFound`] if no key compares equal.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<(K, V), Error>
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let node = self.find_raw(key).ok_or(Error::NotFound)?;
        Ok(self.remove_node(node))
    }

    fn find_raw<Q>(&self, key: &Q) -> Link
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
    {
        let mut found = None;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            match self.cmp.compare(key, self.node(cur).key.borrow()) {
                Ordering::Less => opt_cur = self.left(cur),
                Ordering::Equal => {
                    if self.policy == DuplicatePolicy::Reject {
                        return Some(cur);
                    }

                    // Keep looking for an earlier equal key.
                    found = Some(cur);
                    opt_cur = self.left(cur);
                }
                Ordering::Greater => opt_cur = self.right(cur),
            }
        }

        found
    }

    // Returns the first node for which `goes_left(cmp(key, node.key))` holds.
    fn bound<Q, F>(&self, goes_left: F, key: &Q) -> TreeIterator
    where
        K: Borrow<Q>,
        C: Comparator<Q>,
        Q: ?Sized,
        F: Fn(Ordering) -> bool,
    {
        let mut found = None;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            if goes_left(self.cmp.compare(key, self.node(cur).key.borrow())) {
                found = Some(cur);
                opt_cur = self.left(cur);
            } else {
                opt_cur = self.right(cur);
            }
        }

        match found {
            Some(node) => self.iter_at(node),
            None => self.end(),
        }
    }
}

impl<K, V, C> Drop for RedBlackTree<K, V, C> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for RedBlackTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RedBlackTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = RedBlackTree::new();
        tree.extend(iter);
        tree
    }
}

impl<K, V, C: Comparator<K>> Extend<(K, V)> for RedBlackTree<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
