//! Total orders used to arrange items in a treap
//!
//! A [`Compare`] is supplied once when the first version is created and is shared, unchanged,
//! by every version derived from it. Swapping the order of an existing tree is not supported:
//! a comparator that disagrees with the one the tree was built with (or that is not a total
//! order at all) produces unspecified, but memory-safe, results.

use std::cmp::Ordering;

/// A three-way comparison between two items
pub trait Compare<T: ?Sized> {
    /// Compare `a` with `b`
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// The natural order of an `Ord` type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Natural;

impl<T: Ord + ?Sized> Compare<T> for Natural {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

impl<T: ?Sized, F> Compare<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}
