use core::fmt;

/// Errors reported by [`RedBlackTree`](crate::RedBlackTree) operations.
///
/// A failed operation leaves the tree exactly as it was before the call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// No live node matches the given key or iterator.
    NotFound,
    /// The iterator is a sentinel, refers to a removed node, or belongs to another tree.
    InvalidIterator,
    /// The key is already present and the tree rejects duplicates.
    DuplicateKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound => write!(f, "no matching element in the tree"),
            Error::InvalidIterator => write!(f, "iterator does not refer to a live element"),
            Error::DuplicateKey => write!(f, "key is already present in the tree"),
        }
    }
}

impl std::error::Error for Error {}
