use core::iter::FusedIterator;
use core::slice::ChunksExact;

/// Iterator over the items of an [`OpaqueVec`][crate::OpaqueVec], yielding each item as a
/// byte slice.
///
/// Created by [`OpaqueVec::iter()`][crate::OpaqueVec::iter].
#[derive(Clone, Debug)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl<'a> Iter<'a> {
    /// # Panics
    ///
    /// Panics if `item_size` is zero.
    pub(crate) fn new(bytes: &'a [u8], item_size: usize) -> Self {
        debug_assert_eq!(bytes.len().checked_rem(item_size), Some(0));

        Self {
            chunks: bytes.chunks_exact(item_size),
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }

    #[cfg_attr(test, mutants::skip)] // Same result as the default implementation, only faster.
    #[inline]
    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.chunks.nth(n)
    }
}

impl DoubleEndedIterator for Iter<'_> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.chunks.next_back()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use alloc::vec::Vec;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::OpaqueVec;

    assert_impl_all!(Iter<'static>: Send, Sync, Clone, ExactSizeIterator, DoubleEndedIterator);

    #[test]
    fn yields_items_in_both_directions() {
        let mut vec = OpaqueVec::builder().item_size(2).build().unwrap();
        vec.push_back_block(&[1, 1, 2, 2, 3, 3]).unwrap();

        let forward: Vec<&[u8]> = vec.iter().collect();
        let backward: Vec<&[u8]> = vec.iter().rev().collect();

        assert_eq!(forward, [&[1_u8, 1][..], &[2, 2][..], &[3, 3][..]]);
        assert_eq!(backward, [&[3_u8, 3][..], &[2, 2][..], &[1, 1][..]]);
    }

    #[test]
    fn exact_size_tracks_consumption() {
        let mut vec = OpaqueVec::builder().item_size(1).build().unwrap();
        vec.push_back_block(&[1, 2, 3, 4]).unwrap();

        let mut iter = vec.iter();
        assert_eq!(iter.len(), 4);

        iter.next();
        iter.next_back();
        assert_eq!(iter.len(), 2);

        assert_eq!(iter.nth(1), Some(&[3_u8][..]));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn empty_vector_yields_nothing() {
        let vec = OpaqueVec::builder().item_size(8).build().unwrap();

        assert_eq!(vec.iter().count(), 0);
        assert_eq!(vec.iter().next_back(), None);
    }
}
