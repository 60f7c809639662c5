use core::ops::Not;

/// Index of an arena slot.
pub(crate) type Link = Option<usize>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) color: Color,
    pub(crate) parent: Link,
    pub(crate) children: [Link; 2],
}

impl<K, V> Node<K, V> {
    /// Returns an unlinked red node.
    pub(crate) fn new(key: K, value: V) -> Self {
        Node {
            key,
            value,
            color: Color::Red,
            parent: None,
            children: [None; 2],
        }
    }
}

/// A slot in the node arena.
///
/// The generation is bumped every time the slot is vacated, so a [`NodeId`] taken before the
/// node was freed no longer matches.
pub(crate) struct Slot<K, V> {
    pub(crate) generation: u32,
    pub(crate) node: Option<Node<K, V>>,
}

/// A generation-checked reference to an arena slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}
