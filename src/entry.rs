use core::mem;

use crate::{
    node::{Dir, Link},
    Comparator, RedBlackTree, TreeIterator,
};

/// A view into a single entry in a [`RedBlackTree`], which may be either vacant or occupied.
pub enum Entry<'tree, K, V, C>
where
    C: Comparator<K>,
{
    Vacant(VacantEntry<'tree, K, V, C>),
    Occupied(OccupiedEntry<'tree, K, V, C>),
}

impl<'tree, K, V, C> Entry<'tree, K, V, C>
where
    C: Comparator<K>,
{
    /// Returns the key of this entry.
    pub fn key(&self) -> &K {
        match self {
            Entry::Vacant(entry) => entry.key(),
            Entry::Occupied(entry) => entry.key(),
        }
    }

    /// Inserts `default` if the entry is vacant, and returns a mutable reference to the value.
    pub fn or_insert(self, default: V) -> &'tree mut V {
        match self {
            Entry::Vacant(entry) => entry.insert(default),
            Entry::Occupied(entry) => entry.into_mut(),
        }
    }

    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'tree mut V {
        match self {
            Entry::Vacant(entry) => entry.insert(default()),
            Entry::Occupied(entry) => entry.into_mut(),
        }
    }

    pub fn or_default(self) -> &'tree mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }

    /// Applies `f` to the value if the entry is occupied.
    pub fn and_modify<F: FnOnce(&mut V)>(self, f: F) -> Self {
        match self {
            Entry::Vacant(entry) => Entry::Vacant(entry),
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
        }
    }
}

/// A vacant entry: the tree holds no key equal to this entry's key.
pub struct VacantEntry<'tree, K, V, C>
where
    C: Comparator<K>,
{
    pub(crate) tree: &'tree mut RedBlackTree<K, V, C>,
    pub(crate) key: K,
    pub(crate) parent: Link,
    pub(crate) dir: Dir,
}

impl<'tree, K, V, C> VacantEntry<'tree, K, V, C>
where
    C: Comparator<K>,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts `value` at the key associated with this entry.
    pub fn insert(self, value: V) -> &'tree mut V {
        let tree = self.tree;
        let node = tree.link_new(self.parent, self.dir, self.key, value);
        &mut tree.node_mut(node).value
    }
}

/// An occupied entry: a view of an element whose key equals the requested one.
pub struct OccupiedEntry<'tree, K, V, C>
where
    C: Comparator<K>,
{
    pub(crate) tree: &'tree mut RedBlackTree<K, V, C>,
    pub(crate) node: usize,
}

impl<'tree, K, V, C> OccupiedEntry<'tree, K, V, C>
where
    C: Comparator<K>,
{
    pub fn key(&self) -> &K {
        &self.tree.node(self.node).key
    }

    /// Returns a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.tree.node(self.node).value
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.tree.node_mut(self.node).value
    }

    /// Converts the entry into a mutable reference to its value, bound to the tree's borrow.
    pub fn into_mut(self) -> &'tree mut V {
        let tree = self.tree;
        &mut tree.node_mut(self.node).value
    }

    /// Replaces the value in the entry, returning the previous value.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }

    /// Returns a detached iterator to the element in the entry.
    pub fn position(&self) -> TreeIterator {
        self.tree.iter_at(self.node)
    }

    /// Removes and returns the element in the entry.
    pub fn remove(self) -> (K, V) {
        self.tree.remove_node(self.node)
    }
}
