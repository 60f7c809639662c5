use core::cmp::Ordering;

/// A strict weak ordering over `T`.
///
/// Implementations must be irreflexive and transitive, and two values are treated as the same
/// key exactly when neither compares less than the other. A tree's comparator is fixed for the
/// lifetime of the tree; changing its answers for keys already stored breaks the tree.
///
/// Closures and function pointers of type `Fn(&T, &T) -> Ordering` implement this trait.
pub trait Comparator<T: ?Sized> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T: Ord + ?Sized> Comparator<T> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

impl<T: ?Sized, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}
