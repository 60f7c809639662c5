use crate::{
    node::{Dir, Link, NodeId},
    Error, RedBlackTree, TreeId,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Position {
    BeforeBegin,
    At(NodeId),
    End,
}

/// A detached position in a [`RedBlackTree`].
///
/// A `TreeIterator` refers either to an element or to one of two sentinels: past-the-last
/// ([`RedBlackTree::end`]) and before-the-first (reached by stepping back from the first
/// element). It does not borrow the tree; every access goes through the tree and is checked, so
/// using an iterator whose element has been removed, or one taken from another tree, fails with
/// [`Error::InvalidIterator`] instead of reading the wrong element.
///
/// Two iterators are equal if they refer to the same element, or to the same sentinel of the
/// same tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TreeIterator {
    pub(crate) tree: TreeId,
    pub(crate) pos: Position,
}

impl TreeIterator {
    pub(crate) fn new(tree: TreeId, pos: Position) -> TreeIterator {
        TreeIterator { tree, pos }
    }

    /// Returns `true` if this is the past-the-last sentinel.
    pub fn is_end(&self) -> bool {
        self.pos == Position::End
    }

    /// Returns `true` if this is the before-the-first sentinel.
    pub fn is_before_begin(&self) -> bool {
        self.pos == Position::BeforeBegin
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self.pos, Position::At(_))
    }

    /// Returns the key-value pair this iterator refers to.
    pub fn get<'tree, K, V, C>(
        &self,
        tree: &'tree RedBlackTree<K, V, C>,
    ) -> Result<(&'tree K, &'tree V), Error> {
        tree.get_at(*self)
    }

    pub fn key<'tree, K, V, C>(
        &self,
        tree: &'tree RedBlackTree<K, V, C>,
    ) -> Result<&'tree K, Error> {
        self.get(tree).map(|(key, _)| key)
    }

    pub fn value<'tree, K, V, C>(
        &self,
        tree: &'tree RedBlackTree<K, V, C>,
    ) -> Result<&'tree V, Error> {
        self.get(tree).map(|(_, value)| value)
    }

    /// Moves to the in-order successor.
    ///
    /// Stepping past the last element yields the past-the-last sentinel; stepping from the
    /// before-the-first sentinel yields the first element. Fails on the past-the-last sentinel
    /// and on invalid iterators, leaving `self` unchanged.
    pub fn increment<K, V, C>(&mut self, tree: &RedBlackTree<K, V, C>) -> Result<(), Error> {
        *self = tree.next_position(*self)?;
        Ok(())
    }

    /// Moves to the in-order predecessor.
    ///
    /// Stepping before the first element yields the before-the-first sentinel; stepping from the
    /// past-the-last sentinel yields the last element. Fails on the before-the-first sentinel and
    /// on invalid iterators, leaving `self` unchanged.
    pub fn decrement<K, V, C>(&mut self, tree: &RedBlackTree<K, V, C>) -> Result<(), Error> {
        *self = tree.prev_position(*self)?;
        Ok(())
    }
}

/// A cursor over a [`RedBlackTree`].
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first.
pub struct Cursor<'tree, K, V, C> {
    tree: &'tree RedBlackTree<K, V, C>,
    cur: Link,
}

impl<K, V, C> Clone for Cursor<'_, K, V, C> {
    fn clone(&self) -> Self {
        Cursor {
            tree: self.tree,
            cur: self.cur,
        }
    }
}

impl<'tree, K, V, C> Cursor<'tree, K, V, C> {
    pub(crate) fn new(tree: &'tree RedBlackTree<K, V, C>, cur: Link) -> Self {
        Cursor { tree, cur }
    }

    /// Moves the cursor to the next element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the first
    /// element. If it is pointing to the last element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        self.cur = self.tree.step(self.cur, Dir::Right);
    }

    /// Moves the cursor to the previous element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the last
    /// element. If it is pointing to the first element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        self.cur = self.tree.step(self.cur, Dir::Left);
    }

    /// Returns the element pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<(&'tree K, &'tree V)> {
        self.cur.map(|node| self.tree.key_value(node))
    }

    /// Returns the next element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<(&'tree K, &'tree V)> {
        self.tree
            .step(self.cur, Dir::Right)
            .map(|node| self.tree.key_value(node))
    }

    /// Returns the previous element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<(&'tree K, &'tree V)> {
        self.tree
            .step(self.cur, Dir::Left)
            .map(|node| self.tree.key_value(node))
    }

    /// Returns a detached iterator for the current position.
    ///
    /// The "ghost" non-element maps to [`RedBlackTree::end`].
    pub fn position(&self) -> TreeIterator {
        match self.cur {
            Some(node) => self.tree.iter_at(node),
            None => self.tree.end(),
        }
    }
}

/// A cursor over a [`RedBlackTree`] which supports editing operations.
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first.
pub struct CursorMut<'tree, K, V, C> {
    tree: &'tree mut RedBlackTree<K, V, C>,
    cur: Link,
}

impl<'tree, K, V, C> CursorMut<'tree, K, V, C> {
    pub(crate) fn new(tree: &'tree mut RedBlackTree<K, V, C>, cur: Link) -> Self {
        CursorMut { tree, cur }
    }

    /// Returns a read-only cursor pointing to the current element.
    ///
    /// The `CursorMut` remains immutably borrowed for the lifetime of the returned `Cursor`.
    pub fn as_cursor(&self) -> Cursor<'_, K, V, C> {
        Cursor::new(&*self.tree, self.cur)
    }

    /// Moves the cursor to the next element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the first
    /// element. If it is pointing to the last element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        self.cur = self.tree.step(self.cur, Dir::Right);
    }

    /// Moves the cursor to the previous element of the tree.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the last
    /// element. If it is pointing to the first element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        self.cur = self.tree.step(self.cur, Dir::Left);
    }

    /// Returns the element pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<(&K, &V)> {
        self.cur.map(|node| self.tree.key_value(node))
    }

    /// Returns a mutable reference to the value pointed to by the cursor.
    ///
    /// Keys cannot be modified through a cursor, as that could break the ordering of the tree.
    pub fn get_value_mut(&mut self) -> Option<&mut V> {
        let node = self.cur?;
        Some(&mut self.tree.node_mut(node).value)
    }

    /// Returns the next element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<(&K, &V)> {
        self.tree
            .step(self.cur, Dir::Right)
            .map(|node| self.tree.key_value(node))
    }

    /// Returns the previous element.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<(&K, &V)> {
        self.tree
            .step(self.cur, Dir::Left)
            .map(|node| self.tree.key_value(node))
    }

    pub fn position(&self) -> TreeIterator {
        self.as_cursor().position()
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed element and moves the cursor to the next element. If the cursor is
    /// pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        self.remove_current_and_move(Dir::Right)
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed element and moves the cursor to the previous element. If the cursor is
    /// pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current_and_move_prev(&mut self) -> Option<(K, V)> {
        self.remove_current_and_move(Dir::Left)
    }

    fn remove_current_and_move(&mut self, dir: Dir) -> Option<(K, V)> {
        let remove = self.cur?;

        // Removal never relocates other elements, so the neighbor stays valid.
        self.cur = self.tree.neighbor(remove, dir);

        Some(self.tree.remove_node(remove))
    }
}
