use core::alloc::Layout;
use core::cmp::Ordering;
use core::marker::PhantomData;
use core::ptr::NonNull;
use core::slice;

use crate::capacity::Growth;
use crate::{BufferAllocator, Error, GlobalAllocator, OpaqueVec, Result};

/// A dynamically resizable vector of `T` values with the same memory management as
/// [`OpaqueVec`].
///
/// The vector stores its items in an [`OpaqueVec`] whose item layout is the layout of `T`,
/// so it grows, shrinks and sorts exactly like the type-erased vector, but its operations take
/// and return `T` values and references instead of byte slices.
///
/// Only `Copy` types are supported because items are moved around the buffer as plain bytes
/// and are never dropped. Zero-sized types are rejected.
///
/// # Examples
///
/// ```rust
/// use opaque_vec::TypedVec;
///
/// let mut vec = TypedVec::<u32>::new()?;
///
/// vec.push_back(10)?;
/// vec.push_back(30)?;
/// vec.insert(1, 20)?;
///
/// assert_eq!(vec.as_slice(), &[10, 20, 30]);
/// assert_eq!(vec.pop_front(), Some(10));
/// assert_eq!(vec.remove(1)?, 30);
/// assert_eq!(vec.as_slice(), &[20]);
/// # Ok::<(), opaque_vec::Error>(())
/// ```
#[derive(Debug)]
pub struct TypedVec<T: Copy, A: BufferAllocator = GlobalAllocator> {
    inner: OpaqueVec<A>,
    _item: PhantomData<T>,
}

impl<T: Copy> TypedVec<T> {
    /// Creates an empty vector with the default capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `T` is a zero-sized type.
    ///
    /// Returns [`Error::AllocationFailure`] if the initial buffer cannot be allocated.
    pub fn new() -> Result<Self> {
        Self::with_capacity_in(0, GlobalAllocator)
    }

    /// Creates an empty vector with room for `capacity` items, or the default capacity if
    /// `capacity` is zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `T` is a zero-sized type.
    ///
    /// Returns [`Error::AllocationFailure`] if the initial buffer cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_in(capacity, GlobalAllocator)
    }
}

impl<T: Copy, A: BufferAllocator> TypedVec<T, A> {
    /// Creates an empty vector with room for `capacity` items (or the default capacity if
    /// `capacity` is zero), allocating from `allocator`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `T` is a zero-sized type.
    ///
    /// Returns [`Error::AllocationFailure`] if the initial buffer cannot be allocated.
    pub fn with_capacity_in(capacity: usize, allocator: A) -> Result<Self> {
        Ok(Self {
            inner: OpaqueVec::new_inner(Layout::new::<T>(), capacity, allocator)?,
            _item: PhantomData,
        })
    }

    /// The number of items in the vector.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the vector contains no items.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The number of items the vector can hold without reallocating its buffer.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// The allocator that provides the item buffer.
    #[must_use]
    #[inline]
    pub fn allocator(&self) -> &A {
        self.inner.allocator()
    }

    /// Appends a value to the end of the vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the vector is full and a larger buffer cannot be
    /// allocated. The vector is unchanged in that case.
    pub fn push_back(&mut self, value: T) -> Result<()> {
        let len = self.len();

        // SAFETY: The end of the vector is a valid insertion position and the value is a local
        // that holds exactly one item.
        unsafe { self.inner.insert_items(len, value_ptr(&value), 1, Growth::Item) }
    }

    /// Appends copies of all `values` to the end of the vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `values` is empty.
    ///
    /// Returns [`Error::AllocationFailure`] if the values do not fit and a larger buffer cannot
    /// be allocated. The vector is unchanged in that case.
    pub fn push_back_slice(&mut self, values: &[T]) -> Result<()> {
        check_slice(values)?;
        let len = self.len();

        // SAFETY: The end of the vector is a valid insertion position and the values are a
        // shared borrow, which cannot point into our exclusively borrowed buffer.
        unsafe {
            self.inner
                .insert_items(len, slice_ptr(values), values.len(), Growth::Block)
        }
    }

    /// Inserts a value at the start of the vector, shifting all existing items up by one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the vector is full and a larger buffer cannot be
    /// allocated. The vector is unchanged in that case.
    pub fn push_front(&mut self, value: T) -> Result<()> {
        // SAFETY: The start of the vector is always a valid insertion position.
        unsafe { self.inner.insert_items(0, value_ptr(&value), 1, Growth::Item) }
    }

    /// Inserts a value before the existing item at `index`.
    ///
    /// `index` must refer to an existing item. Use [`push_back()`][Self::push_back] to append.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    ///
    /// Returns [`Error::AllocationFailure`] if the vector is full and a larger buffer cannot be
    /// allocated. The vector is unchanged in that case.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        self.inner.check_insert_position(index, 1)?;

        // SAFETY: We validated the position.
        unsafe { self.inner.insert_items(index, value_ptr(&value), 1, Growth::Item) }
    }

    /// Inserts copies of all `values` before the existing item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `values` is empty.
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    ///
    /// Returns [`Error::AllocationFailure`] if the values do not fit and a larger buffer cannot
    /// be allocated. The vector is unchanged in that case.
    pub fn insert_slice(&mut self, index: usize, values: &[T]) -> Result<()> {
        check_slice(values)?;
        self.inner.check_insert_position(index, values.len())?;

        // SAFETY: We validated the position and the values cannot point into our buffer
        // (see push_back_slice).
        unsafe {
            self.inner
                .insert_items(index, slice_ptr(values), values.len(), Growth::Block)
        }
    }

    /// Removes and returns the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    pub fn remove(&mut self, index: usize) -> Result<T> {
        let value = *self.get(index)?;
        self.inner.remove_range(index, 1)?;

        Ok(value)
    }

    /// Removes `length` items starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `length` is zero.
    ///
    /// Returns [`Error::IndexOutOfRange`] if the range does not lie within the vector.
    pub fn remove_block(&mut self, index: usize, length: usize) -> Result<()> {
        self.inner.remove_range(index, length)
    }

    /// Removes and returns the last item, or `None` if the vector is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        let value = *self.back()?;
        self.inner.pop_back();

        Some(value)
    }

    /// Removes and returns the first item, or `None` if the vector is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        let value = *self.front()?;
        self.inner.pop_front();

        Some(value)
    }

    /// Overwrites the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    pub fn modify(&mut self, index: usize, value: T) -> Result<()> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Removes all items, releasing capacity above the default.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Reduces the capacity to fit the current items, but not below the default capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the smaller buffer cannot be allocated. The
    /// vector is unchanged in that case.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        self.inner.shrink_to_fit()
    }

    /// Returns a reference to the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    pub fn get(&self, index: usize) -> Result<&T> {
        self.as_slice().get(index).ok_or(Error::IndexOutOfRange {
            index,
            length: 1,
            size: self.len(),
        })
    }

    /// Returns a mutable reference to the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        let size = self.len();

        self.as_mut_slice()
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange {
                index,
                length: 1,
                size,
            })
    }

    /// Returns the first item, or `None` if the vector is empty.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// Returns the last item, or `None` if the vector is empty.
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Returns the items as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: The buffer is aligned for T, its stride is the size of T and slots [0, len)
        // hold values of T. The slice borrows self, which keeps the buffer alive.
        unsafe { slice::from_raw_parts(self.inner.as_ptr().cast::<T>().as_ptr(), self.len()) }
    }

    /// Returns the items as a mutable slice.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: See as_slice(). The slice exclusively borrows self, so nothing else can
        // access the buffer while it exists.
        unsafe {
            slice::from_raw_parts_mut(self.inner.as_ptr().cast::<T>().as_ptr(), self.len())
        }
    }

    /// Returns an iterator over the items, in order.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Calls `action` once for every item, in order.
    ///
    /// The action receives the item, its index and the length of the vector. On an empty
    /// vector, the action is called exactly once with `(None, 0, 0)`.
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(Option<&T>, usize, usize),
    {
        if self.is_empty() {
            action(None, 0, 0);
            return;
        }

        let len = self.len();
        for (index, item) in self.iter().enumerate() {
            action(Some(item), index, len);
        }
    }

    /// Returns the index of the first item for which `compare(item, data)` returns
    /// [`Ordering::Equal`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no item matches.
    pub fn find<F>(&self, data: &T, mut compare: F) -> Result<usize>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.iter()
            .position(|item| compare(item, data) == Ordering::Equal)
            .ok_or(Error::NotFound)
    }

    /// Sorts the items with a stable merge sort, ordered by `compare`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the scratch buffer cannot be allocated. The
    /// items are left in their original order in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opaque_vec::TypedVec;
    ///
    /// let mut vec = TypedVec::<(u8, char)>::new()?;
    /// vec.push_back_slice(&[(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')])?;
    ///
    /// vec.sort_by(|a, b| a.0.cmp(&b.0))?;
    ///
    /// assert_eq!(vec.as_slice(), &[(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    pub fn sort_by<F>(&mut self, mut compare: F) -> Result<()>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.inner.sort_items(|a, b| {
            // SAFETY: The sort only passes pointers to aligned, initialized items in our
            // buffer, which nothing writes to while the comparator runs.
            let a = unsafe { a.cast::<T>().as_ref() };
            // SAFETY: See above.
            let b = unsafe { b.cast::<T>().as_ref() };

            compare(a, b)
        })
    }
}

impl<'a, T: Copy, A: BufferAllocator> IntoIterator for &'a TypedVec<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn check_slice<T>(values: &[T]) -> Result<()> {
    if values.is_empty() {
        Err(Error::InvalidArgument {
            problem: "block must contain at least one item",
        })
    } else {
        Ok(())
    }
}

fn value_ptr<T>(value: &T) -> NonNull<u8> {
    NonNull::from(value).cast::<u8>()
}

fn slice_ptr<T>(values: &[T]) -> NonNull<u8> {
    NonNull::from(values).cast::<u8>()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use alloc::vec::Vec;
    use core::fmt::Debug;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::DEFAULT_CAPACITY;
    use crate::test_allocator::TestAllocator;

    assert_impl_all!(TypedVec<u64>: Send, Debug);
    assert_not_impl_any!(TypedVec<u64>: Sync);
    assert_not_impl_any!(TypedVec<*const u8>: Send);

    /// An item with interior padding, to exercise the aligned stride.
    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Reading {
        sensor: u8,
        value: u64,
    }

    fn reading(sensor: u8, value: u64) -> Reading {
        Reading { sensor, value }
    }

    #[test]
    fn smoke_test() {
        let mut vec = TypedVec::<i32>::new().unwrap();

        assert!(vec.is_empty());
        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);

        vec.push_back(2).unwrap();
        vec.push_front(1).unwrap();
        vec.push_back(3).unwrap();

        assert_eq!(vec.len(), 3);
        assert_eq!(vec.as_slice(), &[1, 2, 3]);
        assert_eq!(vec.front(), Some(&1));
        assert_eq!(vec.back(), Some(&3));
        assert_eq!(vec.get(1), Ok(&2));
    }

    #[test]
    fn sort_then_find() {
        let mut vec = TypedVec::<u32>::with_capacity(5).unwrap();
        for value in [5, 2, 8, 1, 9, 3] {
            vec.push_back(value).unwrap();
        }
        assert_eq!(vec.capacity(), 10);

        vec.sort_by(u32::cmp).unwrap();

        assert_eq!(vec.as_slice(), &[1, 2, 3, 5, 8, 9]);
        assert_eq!(vec.find(&5, u32::cmp), Ok(3));
        assert_eq!(vec.find(&4, u32::cmp), Err(Error::NotFound));
    }

    #[test]
    fn remove_block_from_middle() {
        let mut vec = TypedVec::<u16>::new().unwrap();
        vec.push_back_slice(&[10, 20, 30, 40, 50]).unwrap();

        vec.remove_block(1, 2).unwrap();

        assert_eq!(vec.as_slice(), &[10, 40, 50]);
    }

    #[test]
    fn insert_slice_into_middle() {
        let mut vec = TypedVec::<u16>::new().unwrap();
        vec.push_back_slice(&[1, 2, 3]).unwrap();

        vec.insert_slice(2, &[99, 98]).unwrap();

        assert_eq!(vec.as_slice(), &[1, 2, 99, 98, 3]);
    }

    #[test]
    fn one_value_slice_uses_block_growth() {
        let mut vec = TypedVec::<u16>::new().unwrap();
        vec.push_back_slice(&[1, 2, 3, 4]).unwrap();

        vec.push_back_slice(&[5]).unwrap();

        assert_eq!(vec.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(vec.capacity(), 10);

        let mut vec = TypedVec::<u16>::new().unwrap();
        vec.push_back_slice(&[1, 2, 3, 4]).unwrap();

        vec.insert_slice(0, &[0]).unwrap();

        assert_eq!(vec.as_slice(), &[0, 1, 2, 3, 4]);
        assert_eq!(vec.capacity(), 10);

        let mut vec = TypedVec::<u16>::new().unwrap();
        vec.push_back_slice(&[1, 2, 3, 4]).unwrap();

        vec.push_back(5).unwrap();

        assert_eq!(vec.capacity(), 8);
    }

    #[test]
    fn insert_at_length_is_rejected() {
        let mut vec = TypedVec::<u8>::new().unwrap();
        vec.push_back_slice(&[1, 2]).unwrap();

        assert_eq!(
            vec.insert(2, 3),
            Err(Error::IndexOutOfRange {
                index: 2,
                length: 1,
                size: 2
            })
        );
        assert!(matches!(
            vec.insert_slice(2, &[3, 4]),
            Err(Error::IndexOutOfRange { length: 2, .. })
        ));
        assert_eq!(vec.as_slice(), &[1, 2]);
    }

    #[test]
    fn empty_slices_are_invalid_argument() {
        let mut vec = TypedVec::<u8>::new().unwrap();
        vec.push_back(1).unwrap();

        assert!(matches!(
            vec.push_back_slice(&[]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            vec.insert_slice(0, &[]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            vec.remove_block(0, 0),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn zero_sized_type_is_invalid_argument() {
        assert!(matches!(
            TypedVec::<()>::new(),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn remove_and_pop_return_values() {
        let mut vec = TypedVec::<char>::new().unwrap();
        vec.push_back_slice(&['a', 'b', 'c', 'd']).unwrap();

        assert_eq!(vec.remove(1), Ok('b'));
        assert_eq!(vec.pop_back(), Some('d'));
        assert_eq!(vec.pop_front(), Some('a'));
        assert_eq!(vec.pop_front(), Some('c'));
        assert_eq!(vec.pop_front(), None);
        assert_eq!(vec.pop_back(), None);
        assert!(matches!(vec.remove(0), Err(Error::IndexOutOfRange { .. })));
    }

    #[test]
    fn modify_and_get_mut() {
        let mut vec = TypedVec::<u64>::new().unwrap();
        vec.push_back_slice(&[1, 2, 3]).unwrap();

        vec.modify(0, 10).unwrap();
        *vec.get_mut(2).unwrap() += 30;
        vec.as_mut_slice()[1] = 20;

        assert_eq!(vec.as_slice(), &[10, 20, 33]);
        assert!(matches!(vec.modify(3, 0), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(vec.get_mut(3), Err(Error::IndexOutOfRange { .. })));
    }

    #[test]
    fn padded_items_keep_alignment_and_order() {
        let mut vec = TypedVec::<Reading>::new().unwrap();
        for (sensor, value) in [(3, 30), (1, 10), (2, 20), (1, 11), (3, 31)] {
            vec.push_back(reading(sensor, value)).unwrap();
        }

        vec.sort_by(|a, b| a.sensor.cmp(&b.sensor)).unwrap();

        assert_eq!(
            vec.as_slice(),
            &[
                reading(1, 10),
                reading(1, 11),
                reading(2, 20),
                reading(3, 30),
                reading(3, 31),
            ]
        );
        for item in &vec {
            assert_eq!(
                core::ptr::from_ref(item).align_offset(align_of::<Reading>()),
                0
            );
        }
    }

    #[test]
    fn for_each_visits_in_order() {
        let mut vec = TypedVec::<u8>::new().unwrap();
        let mut calls = Vec::new();

        vec.for_each(|item, index, len| calls.push((item.copied(), index, len)));
        assert_eq!(calls, [(None, 0, 0)]);

        vec.push_back_slice(&[4, 5]).unwrap();
        calls.clear();

        vec.for_each(|item, index, len| calls.push((item.copied(), index, len)));
        assert_eq!(calls, [(Some(4), 0, 2), (Some(5), 1, 2)]);
    }

    #[test]
    fn clear_and_shrink_to_fit() {
        let mut vec = TypedVec::<u32>::new().unwrap();
        vec.push_back_slice(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(vec.capacity(), 10);

        vec.shrink_to_fit().unwrap();
        assert_eq!(vec.capacity(), 5);

        vec.clear();
        assert!(vec.is_empty());
        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn allocation_failure_leaves_vector_unchanged() {
        let allocator = TestAllocator::new();
        let mut vec = TypedVec::<u32, _>::with_capacity_in(2, &allocator).unwrap();
        vec.push_back_slice(&[2, 1]).unwrap();
        allocator.fail_after(0);

        assert!(matches!(
            vec.push_back(3),
            Err(Error::AllocationFailure { bytes: 16 })
        ));
        assert!(matches!(
            vec.sort_by(u32::cmp),
            Err(Error::AllocationFailure { bytes: 8 })
        ));
        assert_eq!(vec.as_slice(), &[2, 1]);

        drop(vec);
        assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn send_to_another_thread() {
        let mut vec = TypedVec::<u64>::new().unwrap();
        vec.push_back_slice(&[1, 2, 3]).unwrap();

        let sum = std::thread::spawn(move || vec.iter().sum::<u64>())
            .join()
            .unwrap();

        assert_eq!(sum, 6);
    }
}
