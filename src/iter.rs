use core::iter::FusedIterator;

use crate::{
    node::{Dir, Link},
    RedBlackTree,
};

/// An in-order iterator over the elements of a [`RedBlackTree`].
pub struct Iter<'tree, K, V, C> {
    tree: &'tree RedBlackTree<K, V, C>,

    front: Link,
    back: Link,

    len: usize,
}

impl<'tree, K, V, C> Iter<'tree, K, V, C> {
    pub(crate) fn new(tree: &'tree RedBlackTree<K, V, C>) -> Self {
        Iter {
            tree,

            front: tree.extreme(Dir::Left),
            back: tree.extreme(Dir::Right),
            len: tree.len(),
        }
    }
}

impl<K, V, C> Clone for Iter<'_, K, V, C> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            len: self.len,
        }
    }
}

impl<'tree, K, V, C> Iterator for Iter<'tree, K, V, C> {
    type Item = (&'tree K, &'tree V);

    fn next(&mut self) -> Option<Self::Item> {
        // The front and back ends meet once `len` elements have been yielded.
        if self.len == 0 {
            return None;
        }

        let cur = self.front?;
        self.front = self.tree.neighbor(cur, Dir::Right);
        self.len -= 1;

        Some(self.tree.key_value(cur))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V, C> DoubleEndedIterator for Iter<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.back?;
        self.back = self.tree.neighbor(cur, Dir::Left);
        self.len -= 1;

        Some(self.tree.key_value(cur))
    }
}

impl<K, V, C> ExactSizeIterator for Iter<'_, K, V, C> {}

impl<K, V, C> FusedIterator for Iter<'_, K, V, C> {}

impl<'tree, K, V, C> IntoIterator for &'tree RedBlackTree<K, V, C> {
    type Item = (&'tree K, &'tree V);
    type IntoIter = Iter<'tree, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An in-order iterator over the keys of a [`RedBlackTree`].
pub struct Keys<'tree, K, V, C> {
    pub(crate) inner: Iter<'tree, K, V, C>,
}

impl<'tree, K, V, C> Iterator for Keys<'tree, K, V, C> {
    type Item = &'tree K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, C> DoubleEndedIterator for Keys<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<K, V, C> ExactSizeIterator for Keys<'_, K, V, C> {}

/// An iterator over the values of a [`RedBlackTree`], in key order.
pub struct Values<'tree, K, V, C> {
    pub(crate) inner: Iter<'tree, K, V, C>,
}

impl<'tree, K, V, C> Iterator for Values<'tree, K, V, C> {
    type Item = &'tree V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, C> DoubleEndedIterator for Values<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V, C> ExactSizeIterator for Values<'_, K, V, C> {}

/// An owning in-order iterator over the elements of a [`RedBlackTree`].
pub struct IntoIter<K, V, C> {
    tree: RedBlackTree<K, V, C>,
}

impl<K, V, C> Iterator for IntoIter<K, V, C> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.tree.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<K, V, C> DoubleEndedIterator for IntoIter<K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.tree.pop_last()
    }
}

impl<K, V, C> ExactSizeIterator for IntoIter<K, V, C> {}

impl<K, V, C> FusedIterator for IntoIter<K, V, C> {}

impl<K, V, C> IntoIterator for RedBlackTree<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { tree: self }
    }
}
