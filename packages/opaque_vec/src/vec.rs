use core::alloc::Layout;
use core::cmp::Ordering;
use core::mem;
use core::ptr::NonNull;
use core::slice;

use tracing::{debug, trace, warn};

use crate::capacity::{
    Growth, cleared_capacity, fitted_capacity, grown_capacity, initial_capacity, needs_growth,
    shrunk_capacity_after_removal,
};
use crate::{
    Allocation, BufferAllocator, Error, GlobalAllocator, ItemGeometry, Iter, OpaqueVecBuilder,
    Result, merge_sort,
};

/// A type-erased, dynamically resizable vector of fixed-stride items.
///
/// Every item is a byte slice of exactly [`item_size()`][Self::item_size] bytes. The item size
/// (or a full memory layout) is fixed when the vector is built and the vector never interprets
/// the bytes it stores, which makes it usable for payloads whose type is only known at runtime.
/// Use [`TypedVec`][crate::TypedVec] when the item type is known at compile time.
///
/// # Memory management
///
/// Items are stored contiguously in a single buffer obtained from the vector's
/// [`BufferAllocator`]. The logical length grows and shrinks independently of the allocated
/// capacity:
///
/// - Appending or inserting one item into a full vector doubles the capacity.
/// - Inserting a block of items into a vector without room for it grows the capacity to the
///   larger of double the capacity and double the resulting length.
/// - After a removal leaves the vector less than half full, the capacity is reduced to fit
///   the remaining items, but never below [`DEFAULT_CAPACITY`][crate::DEFAULT_CAPACITY].
///
/// If the allocator cannot provide a larger buffer, the operation fails with
/// [`Error::AllocationFailure`] and the vector is left exactly as it was. If it cannot provide
/// a smaller buffer, the vector simply keeps its larger buffer.
///
/// # Examples
///
/// ```rust
/// use opaque_vec::OpaqueVec;
///
/// let mut vec = OpaqueVec::builder().item_size(2).build()?;
///
/// vec.push_back(&[1, 1])?;
/// vec.push_back(&[3, 3])?;
/// vec.insert(1, &[2, 2])?;
///
/// assert_eq!(vec.len(), 3);
/// assert_eq!(vec.get(1)?, &[2, 2]);
/// assert_eq!(vec.as_bytes(), &[1, 1, 2, 2, 3, 3]);
///
/// vec.remove(0)?;
/// assert_eq!(vec.front(), Some(&[2_u8, 2][..]));
/// # Ok::<(), opaque_vec::Error>(())
/// ```
///
/// # Thread safety
///
/// The vector is thread-mobile ([`Send`]) if its allocator is, but it is not thread-safe
/// ([`Sync`]). Sharing a vector between threads requires external synchronization.
#[derive(Debug)]
pub struct OpaqueVec<A: BufferAllocator = GlobalAllocator> {
    geometry: ItemGeometry,

    /// Start of the item buffer. Slots `[0, len)` hold items, slots `[len, capacity)` are
    /// allocated but may be uninitialized and are never read.
    ptr: NonNull<u8>,

    /// The layout the current buffer was allocated with, needed to release it.
    buffer_layout: Layout,

    capacity: usize,
    len: usize,

    allocator: A,
}

impl OpaqueVec {
    /// Creates a builder for configuring and constructing an [`OpaqueVec`].
    ///
    /// You must specify the item size using either `.item_size()`, `.layout()` or
    /// `.layout_of::<T>()` before calling `.build()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opaque_vec::{DEFAULT_CAPACITY, OpaqueVec};
    ///
    /// let vec = OpaqueVec::builder().item_size(16).build()?;
    ///
    /// assert_eq!(vec.len(), 0);
    /// assert!(vec.is_empty());
    /// assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    #[inline]
    pub fn builder() -> OpaqueVecBuilder {
        OpaqueVecBuilder::new()
    }
}

impl<A: BufferAllocator> OpaqueVec<A> {
    /// Creates a new [`OpaqueVec`] with the specified configuration.
    ///
    /// This method is used internally by the builder to construct the actual vector.
    pub(crate) fn new_inner(
        item_layout: Layout,
        requested_capacity: usize,
        allocator: A,
    ) -> Result<Self> {
        let geometry = ItemGeometry::new(item_layout)?;
        let capacity = initial_capacity(requested_capacity);
        let buffer_layout = geometry.buffer_layout(capacity)?;

        let ptr = Allocation::new(&allocator, buffer_layout)?.into_raw();

        debug!(
            item_size = geometry.item_size(),
            align = item_layout.align(),
            capacity,
            "created vector"
        );

        Ok(Self {
            geometry,
            ptr,
            buffer_layout,
            capacity,
            len: 0,
            allocator,
        })
    }

    /// The size in bytes of each item.
    ///
    /// This is the size of the item layout rounded up to its alignment, which is also the
    /// distance between adjacent items in the buffer.
    #[must_use]
    #[inline]
    pub fn item_size(&self) -> usize {
        self.geometry.item_size()
    }

    /// The memory layout the vector was built with.
    #[must_use]
    #[inline]
    pub fn item_layout(&self) -> Layout {
        self.geometry.item_layout()
    }

    /// The number of items in the vector.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector contains no items.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of items the vector can hold without reallocating its buffer.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The allocator that provides the item buffer.
    #[must_use]
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Appends an item to the end of the vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `item` is not exactly
    /// [`item_size()`][Self::item_size] bytes long.
    ///
    /// Returns [`Error::AllocationFailure`] if the vector is full and a larger buffer cannot be
    /// allocated. The vector is unchanged in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().item_size(1).capacity(1).build()?;
    ///
    /// vec.push_back(&[7])?;
    /// vec.push_back(&[8])?;
    ///
    /// assert_eq!(vec.as_bytes(), &[7, 8]);
    /// assert_eq!(vec.capacity(), 2);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    pub fn push_back(&mut self, item: &[u8]) -> Result<()> {
        self.check_item(item)?;

        // SAFETY: The end of the vector is a valid insertion position and the item holds
        // exactly one item. It is a shared borrow that cannot point into our buffer because
        // we hold an exclusive borrow of the vector.
        unsafe { self.insert_items(self.len, slice_ptr(item), 1, Growth::Item) }
    }

    /// Appends a block of items to the end of the vector.
    ///
    /// `items` is the concatenation of one or more items, so its length must be a non-zero
    /// multiple of [`item_size()`][Self::item_size].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `items` is empty or its length is not a multiple
    /// of the item size.
    ///
    /// Returns [`Error::AllocationFailure`] if the block does not fit and a larger buffer
    /// cannot be allocated. The vector is unchanged in that case.
    pub fn push_back_block(&mut self, items: &[u8]) -> Result<()> {
        let count = self.check_block(items)?;

        // SAFETY: The end of the vector is a valid insertion position and the block holds
        // exactly `count` items. It cannot point into our buffer (see push_back).
        unsafe { self.insert_items(self.len, slice_ptr(items), count, Growth::Block) }
    }

    /// Inserts an item at the start of the vector, shifting all existing items up by one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `item` is not exactly
    /// [`item_size()`][Self::item_size] bytes long.
    ///
    /// Returns [`Error::AllocationFailure`] if the vector is full and a larger buffer cannot be
    /// allocated. The vector is unchanged in that case.
    pub fn push_front(&mut self, item: &[u8]) -> Result<()> {
        self.check_item(item)?;

        // SAFETY: The start of the vector is always a valid insertion position and the item
        // cannot point into our buffer (see push_back).
        unsafe { self.insert_items(0, slice_ptr(item), 1, Growth::Item) }
    }

    /// Inserts an item before the existing item at `index`.
    ///
    /// `index` must refer to an existing item. Inserting at `index == len()` is rejected; use
    /// [`push_back()`][Self::push_back] to append.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `item` is not exactly
    /// [`item_size()`][Self::item_size] bytes long.
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    ///
    /// Returns [`Error::AllocationFailure`] if the vector is full and a larger buffer cannot be
    /// allocated. The vector is unchanged in that case.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opaque_vec::{Error, OpaqueVec};
    ///
    /// let mut vec = OpaqueVec::builder().item_size(1).build()?;
    /// vec.push_back_block(&[1, 3])?;
    ///
    /// vec.insert(1, &[2])?;
    /// assert_eq!(vec.as_bytes(), &[1, 2, 3]);
    ///
    /// assert!(matches!(vec.insert(3, &[4]), Err(Error::IndexOutOfRange { .. })));
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    pub fn insert(&mut self, index: usize, item: &[u8]) -> Result<()> {
        self.check_item(item)?;
        self.check_insert_position(index, 1)?;

        // SAFETY: We validated the position and the item cannot point into our buffer
        // (see push_back).
        unsafe { self.insert_items(index, slice_ptr(item), 1, Growth::Item) }
    }

    /// Inserts a block of items before the existing item at `index`.
    ///
    /// `items` is the concatenation of one or more items, so its length must be a non-zero
    /// multiple of [`item_size()`][Self::item_size]. As with [`insert()`][Self::insert],
    /// `index` must refer to an existing item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `items` is empty or its length is not a multiple
    /// of the item size.
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    ///
    /// Returns [`Error::AllocationFailure`] if the block does not fit and a larger buffer
    /// cannot be allocated. The vector is unchanged in that case.
    pub fn insert_block(&mut self, index: usize, items: &[u8]) -> Result<()> {
        let count = self.check_block(items)?;
        self.check_insert_position(index, count)?;

        // SAFETY: We validated the position and the block cannot point into our buffer
        // (see push_back).
        unsafe { self.insert_items(index, slice_ptr(items), count, Growth::Block) }
    }

    /// Removes the item at `index`, shifting all items after it down by one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.remove_range(index, 1)
    }

    /// Removes `length` items starting at `index`, shifting all items after them down.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `length` is zero.
    ///
    /// Returns [`Error::IndexOutOfRange`] if the range does not lie within the vector.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().item_size(1).build()?;
    /// vec.push_back_block(&[10, 20, 30, 40, 50])?;
    ///
    /// vec.remove_block(1, 2)?;
    ///
    /// assert_eq!(vec.as_bytes(), &[10, 40, 50]);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    pub fn remove_block(&mut self, index: usize, length: usize) -> Result<()> {
        self.remove_range(index, length)
    }

    /// Removes the last item, returning whether there was one to remove.
    ///
    /// Popping from an empty vector does nothing.
    pub fn pop_back(&mut self) -> bool {
        self.len
            .checked_sub(1)
            .is_some_and(|last| self.remove_range(last, 1).is_ok())
    }

    /// Removes the first item, returning whether there was one to remove.
    ///
    /// Popping from an empty vector does nothing.
    pub fn pop_front(&mut self) -> bool {
        !self.is_empty() && self.remove_range(0, 1).is_ok()
    }

    /// Overwrites the item at `index` with a copy of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `item` is not exactly
    /// [`item_size()`][Self::item_size] bytes long.
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    pub fn modify(&mut self, index: usize, item: &[u8]) -> Result<()> {
        self.check_item(item)?;

        self.get_mut(index)?.copy_from_slice(item);
        Ok(())
    }

    /// Removes all items.
    ///
    /// If the capacity exceeds [`DEFAULT_CAPACITY`][crate::DEFAULT_CAPACITY], the buffer is
    /// replaced with one of the default capacity.
    pub fn clear(&mut self) {
        self.len = 0;

        if let Some(new_capacity) = cleared_capacity(self.capacity) {
            self.shrink_opportunistically(new_capacity);
        }
    }

    /// Reduces the capacity to fit the current items, but not below
    /// [`DEFAULT_CAPACITY`][crate::DEFAULT_CAPACITY].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the smaller buffer cannot be allocated. The
    /// vector is unchanged in that case.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        if let Some(new_capacity) = fitted_capacity(self.capacity, self.len) {
            self.relocate(new_capacity, self.len, 0)?;
        }

        Ok(())
    }

    /// Returns the item at `index`.
    ///
    /// The returned slice borrows the vector, so it cannot outlive any call that may move the
    /// items to a different buffer:
    ///
    /// ```compile_fail
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().item_size(1).build()?;
    /// vec.push_back(&[1])?;
    ///
    /// let first = vec.get(0)?;
    /// vec.push_back(&[2])?; // cannot borrow `vec` as mutable
    /// assert_eq!(first, &[1]);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    pub fn get(&self, index: usize) -> Result<&[u8]> {
        self.check_range(index, 1)?;

        // SAFETY: The index refers to an initialized item and the slice borrows self, which
        // keeps the buffer alive and unmodified for the lifetime of the slice.
        Ok(unsafe { slice::from_raw_parts(self.slot(index).as_ptr(), self.item_size()) })
    }

    /// Returns the item at `index` for in-place modification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not refer to an existing item.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut [u8]> {
        self.check_range(index, 1)?;

        // SAFETY: The index refers to an initialized item and the slice exclusively borrows
        // self, so nothing else can access the buffer for the lifetime of the slice.
        Ok(unsafe { slice::from_raw_parts_mut(self.slot(index).as_ptr(), self.item_size()) })
    }

    /// Returns the first item, or `None` if the vector is empty.
    #[must_use]
    pub fn front(&self) -> Option<&[u8]> {
        self.get(0).ok()
    }

    /// Returns the last item, or `None` if the vector is empty.
    #[must_use]
    pub fn back(&self) -> Option<&[u8]> {
        self.get(self.len.checked_sub(1)?).ok()
    }

    /// Returns the bytes of all items, in order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: Slots [0, len) are initialized and the slice borrows self.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.geometry.bytes_for(self.len)) }
    }

    /// Returns an iterator over the items, in order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().item_size(2).build()?;
    /// vec.push_back_block(&[1, 2, 3, 4, 5, 6])?;
    ///
    /// let firsts: Vec<u8> = vec.iter().map(|item| item[0]).collect();
    /// assert_eq!(firsts, [1, 3, 5]);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.as_bytes(), self.item_size())
    }

    /// Calls `action` once for every item, in order.
    ///
    /// The action receives the item, its index and the length of the vector. On an empty
    /// vector, the action is called exactly once with `(None, 0, 0)`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().item_size(4).build()?;
    ///
    /// let mut calls = Vec::new();
    /// vec.for_each(|item, index, len| calls.push((item.is_some(), index, len)));
    ///
    /// assert_eq!(calls, [(false, 0, 0)]);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(Option<&[u8]>, usize, usize),
    {
        if self.is_empty() {
            action(None, 0, 0);
            return;
        }

        for (index, item) in self.iter().enumerate() {
            action(Some(item), index, self.len);
        }
    }

    /// Returns the index of the first item for which `compare(item, data)` returns
    /// [`Ordering::Equal`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `data` is not exactly
    /// [`item_size()`][Self::item_size] bytes long.
    ///
    /// Returns [`Error::NotFound`] if no item matches.
    pub fn find<F>(&self, data: &[u8], mut compare: F) -> Result<usize>
    where
        F: FnMut(&[u8], &[u8]) -> Ordering,
    {
        self.check_item(data)?;

        self.iter()
            .position(|item| compare(item, data) == Ordering::Equal)
            .ok_or(Error::NotFound)
    }

    /// Sorts the items with a stable merge sort, ordered by `compare`.
    ///
    /// Items that compare equal keep their relative order. The sort needs a scratch buffer
    /// the size of the current items, which is allocated before any item is moved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the scratch buffer cannot be allocated. The
    /// items are left in their original order in that case.
    pub fn sort_by<F>(&mut self, mut compare: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Ordering,
    {
        let item_size = self.item_size();

        self.sort_items(|a, b| {
            // SAFETY: The sort only passes pointers to initialized items in our buffer, which
            // nothing writes to while the comparator runs.
            let a = unsafe { slice::from_raw_parts(a.as_ptr(), item_size) };
            // SAFETY: See above.
            let b = unsafe { slice::from_raw_parts(b.as_ptr(), item_size) };

            compare(a, b)
        })
    }

    /// Pointer to the start of the item buffer.
    #[must_use]
    pub(crate) fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Inserts `count` items read from `source` so that the first of them ends up at `index`.
    ///
    /// If the items do not fit, the capacity grows by the `growth` rule of the calling
    /// operation and the existing items and the gap for the new ones are laid out in a larger
    /// buffer in a single pass. Otherwise the items from `index` onward are
    /// shifted up in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if a larger buffer is needed but cannot be
    /// allocated. The vector is unchanged in that case.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `index` is at most the length of the vector.
    /// - `source` is valid for reads of `count` items.
    /// - `source` does not point into the buffer of this vector.
    pub(crate) unsafe fn insert_items(
        &mut self,
        index: usize,
        source: NonNull<u8>,
        count: usize,
        growth: Growth,
    ) -> Result<()> {
        debug_assert!(index <= self.len);

        if needs_growth(self.capacity, self.len, count) {
            let new_capacity = grown_capacity(self.capacity, self.len, count, growth);
            self.relocate(new_capacity, index, count)?;
        } else {
            // Cannot underflow because the caller guarantees index <= len.
            let tail = self.len.wrapping_sub(index);

            // Cannot overflow because len + count fits in the capacity.
            let target = self.slot(index.wrapping_add(count));

            // SAFETY: Both ranges lie within the capacity because len + count <= capacity,
            // and move_items allows them to overlap.
            unsafe {
                self.geometry.move_items(self.slot(index), target, tail);
            }
        }

        // SAFETY: The gap at [index, index + count) lies within the capacity and the caller
        // guarantees that the source is valid and does not overlap our buffer.
        unsafe {
            self.geometry.copy_items(source, self.slot(index), count);
        }

        // Cannot overflow because the new length fits in the capacity.
        self.len = self.len.wrapping_add(count);

        Ok(())
    }

    /// Removes `length` items starting at `index`, then applies the shrink policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `length` is zero.
    ///
    /// Returns [`Error::IndexOutOfRange`] if the range does not lie within the vector.
    pub(crate) fn remove_range(&mut self, index: usize, length: usize) -> Result<()> {
        if length == 0 {
            return Err(Error::InvalidArgument {
                problem: "cannot remove an empty range of items",
            });
        }

        self.check_range(index, length)?;

        // Cannot overflow because the range lies within the vector.
        let end = index.wrapping_add(length);
        let tail = self.len.wrapping_sub(end);

        // SAFETY: Both ranges lie within [0, len) and move_items allows them to overlap.
        unsafe {
            self.geometry.move_items(self.slot(end), self.slot(index), tail);
        }

        self.len = self.len.wrapping_sub(length);

        if let Some(new_capacity) = shrunk_capacity_after_removal(self.capacity, self.len) {
            self.shrink_opportunistically(new_capacity);
        }

        Ok(())
    }

    /// Sorts the items with a comparator that receives pointers to two items in the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the scratch buffer cannot be allocated. The
    /// items are left in their original order in that case.
    pub(crate) fn sort_items<F>(&mut self, mut compare: F) -> Result<()>
    where
        F: FnMut(NonNull<u8>, NonNull<u8>) -> Ordering,
    {
        if self.len < 2 {
            return Ok(());
        }

        let scratch_layout = self.geometry.buffer_layout(self.len)?;
        let scratch = Allocation::new(&self.allocator, scratch_layout)?;

        // SAFETY: Our buffer holds len items, the scratch buffer has room for len items and
        // the two are separate allocations.
        unsafe {
            merge_sort(
                &self.geometry,
                self.ptr,
                scratch.ptr(),
                self.len,
                &mut compare,
            );
        }

        Ok(())
    }

    /// Checks that `index` refers to an existing item, so that `count` new items can be
    /// inserted before it.
    pub(crate) fn check_insert_position(&self, index: usize, count: usize) -> Result<()> {
        if index < self.len {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                length: count,
                size: self.len,
            })
        }
    }

    /// Checks that `[index, index + length)` lies within the vector.
    pub(crate) fn check_range(&self, index: usize, length: usize) -> Result<()> {
        match index.checked_add(length) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(Error::IndexOutOfRange {
                index,
                length,
                size: self.len,
            }),
        }
    }

    fn check_item(&self, item: &[u8]) -> Result<()> {
        if item.len() == self.item_size() {
            Ok(())
        } else {
            Err(Error::InvalidArgument {
                problem: "item length must be equal to the item size of the vector",
            })
        }
    }

    /// Returns the number of items in the block.
    fn check_block(&self, items: &[u8]) -> Result<usize> {
        match self.geometry.count_items(items.len()) {
            Some(0) => Err(Error::InvalidArgument {
                problem: "block must contain at least one item",
            }),
            Some(count) => Ok(count),
            None => Err(Error::InvalidArgument {
                problem: "block length must be a multiple of the item size of the vector",
            }),
        }
    }

    /// Pointer to the slot at `index`, which must be at most the capacity.
    fn slot(&self, index: usize) -> NonNull<u8> {
        debug_assert!(
            index <= self.capacity,
            "slot {index} is out of bounds of a buffer with capacity {}",
            self.capacity
        );

        // SAFETY: Every caller passes an index within the buffer (or one past its end).
        unsafe { self.geometry.slot(self.ptr, index) }
    }

    /// Moves the items to a new buffer with room for `new_capacity` items, leaving `gap`
    /// uninitialized slots at `gap_index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the new buffer cannot be allocated. The vector
    /// is unchanged in that case.
    fn relocate(&mut self, new_capacity: usize, gap_index: usize, gap: usize) -> Result<()> {
        debug_assert!(gap_index <= self.len);
        debug_assert!(self.len.saturating_add(gap) <= new_capacity);

        let new_layout = self.geometry.buffer_layout(new_capacity)?;
        let new_buffer = Allocation::new(&self.allocator, new_layout)?;

        // SAFETY: The old buffer holds len >= gap_index items, the new buffer has room for
        // more than that and the two are separate allocations.
        unsafe {
            self.geometry
                .copy_items(self.ptr, new_buffer.ptr(), gap_index);
        }

        // Cannot overflow because the gap fits in the new capacity.
        // SAFETY: gap_index + gap <= new_capacity.
        let suffix_target = unsafe {
            self.geometry
                .slot(new_buffer.ptr(), gap_index.wrapping_add(gap))
        };

        // SAFETY: The suffix [gap_index, len) of the old buffer is moved to the end of the gap
        // in the new buffer, which has room for it because len + gap <= new_capacity.
        unsafe {
            self.geometry.copy_items(
                self.slot(gap_index),
                suffix_target,
                self.len.wrapping_sub(gap_index),
            );
        }

        trace!(
            old_capacity = self.capacity,
            new_capacity,
            len = self.len,
            "relocated vector buffer"
        );

        let old_ptr = mem::replace(&mut self.ptr, new_buffer.into_raw());
        let old_layout = mem::replace(&mut self.buffer_layout, new_layout);
        self.capacity = new_capacity;

        // SAFETY: The old buffer was allocated by our allocator with this layout and we no
        // longer reference it.
        unsafe {
            self.allocator.release(old_ptr, old_layout);
        }

        Ok(())
    }

    /// Shrinks the buffer if memory for a smaller one is available, otherwise keeps the
    /// current buffer.
    fn shrink_opportunistically(&mut self, new_capacity: usize) {
        if let Err(error) = self.relocate(new_capacity, self.len, 0) {
            warn!(
                %error,
                capacity = self.capacity,
                len = self.len,
                "keeping oversized vector buffer because a smaller one could not be allocated"
            );
        }
    }
}

impl<A: BufferAllocator> Drop for OpaqueVec<A> {
    fn drop(&mut self) {
        // SAFETY: The buffer was allocated by our allocator with this layout and nothing
        // can reference it after the vector is gone.
        unsafe {
            self.allocator.release(self.ptr, self.buffer_layout);
        }
    }
}

impl<'a, A: BufferAllocator> IntoIterator for &'a OpaqueVec<A> {
    type Item = &'a [u8];
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// SAFETY: The vector exclusively owns its buffer and only hands out references that borrow
// the vector, so moving it to another thread is safe as long as the allocator can move too.
unsafe impl<A: BufferAllocator + Send> Send for OpaqueVec<A> {}

/// Pointer to the first byte of a caller-provided payload.
fn slice_ptr(bytes: &[u8]) -> NonNull<u8> {
    NonNull::from(bytes).cast::<u8>()
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

    assert_impl_all!(OpaqueVec: Send, Debug);
    assert_not_impl_any!(OpaqueVec: Sync);

    fn u32_vec<A: BufferAllocator>(allocator: A, values: &[u32]) -> OpaqueVec<A> {
        let mut vec = OpaqueVecBuilder::new()
            .item_size(4)
            .allocator(allocator)
            .build()
            .unwrap();

        for value in values {
            vec.push_back(&value.to_le_bytes()).unwrap();
        }

        vec
    }

    fn values<A: BufferAllocator>(vec: &OpaqueVec<A>) -> Vec<u32> {
        vec.iter()
            .map(|item| u32::from_le_bytes(item.try_into().unwrap()))
            .collect()
    }

    fn block(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    fn compare_u32(a: &[u8], b: &[u8]) -> Ordering {
        u32::from_le_bytes(a.try_into().unwrap()).cmp(&u32::from_le_bytes(b.try_into().unwrap()))
    }

    #[test]
    fn smoke_test() {
        let mut vec = u32_vec(GlobalAllocator, &[]);

        assert!(vec.is_empty());
        assert_eq!(vec.item_size(), 4);
        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);

        vec.push_back(&1_u32.to_le_bytes()).unwrap();
        vec.push_back(&2_u32.to_le_bytes()).unwrap();
        vec.push_front(&0_u32.to_le_bytes()).unwrap();

        assert_eq!(vec.len(), 3);
        assert_eq!(values(&vec), [0, 1, 2]);
        assert_eq!(vec.front(), Some(&0_u32.to_le_bytes()[..]));
        assert_eq!(vec.back(), Some(&2_u32.to_le_bytes()[..]));

        assert!(vec.pop_front());
        assert!(vec.pop_back());
        assert_eq!(values(&vec), [1]);
    }

    #[test]
    fn sort_then_find() {
        let mut vec = u32_vec(GlobalAllocator, &[5, 2, 8, 1, 9, 3]);

        vec.sort_by(compare_u32).unwrap();

        assert_eq!(values(&vec), [1, 2, 3, 5, 8, 9]);
        assert_eq!(vec.find(&5_u32.to_le_bytes(), compare_u32), Ok(3));
        assert_eq!(
            vec.find(&4_u32.to_le_bytes(), compare_u32),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn remove_block_from_middle() {
        let mut vec = u32_vec(GlobalAllocator, &[10, 20, 30, 40, 50]);

        vec.remove_block(1, 2).unwrap();

        assert_eq!(values(&vec), [10, 40, 50]);
    }

    #[test]
    fn insert_block_into_middle() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 3]);

        vec.insert_block(2, &block(&[99, 98])).unwrap();

        assert_eq!(values(&vec), [1, 2, 99, 98, 3]);
        // 3 + 2 items do not fit in the default capacity of 4: max(4 * 2, 5 * 2).
        assert_eq!(vec.capacity(), 10);
    }

    #[test]
    fn insert_block_without_growth_shifts_in_place() {
        let allocator = TestAllocator::new();
        let mut vec = OpaqueVecBuilder::new()
            .item_size(4)
            .capacity(10)
            .allocator(&allocator)
            .build()
            .unwrap();
        vec.push_back_block(&block(&[1, 2, 3])).unwrap();

        vec.insert_block(0, &block(&[7, 8])).unwrap();

        assert_eq!(values(&vec), [7, 8, 1, 2, 3]);
        assert_eq!(vec.capacity(), 10);
        assert_eq!(allocator.allocations(), 1);
    }

    #[test]
    fn push_back_doubles_capacity() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 3, 4]);
        assert_eq!(vec.capacity(), 4);

        vec.push_back(&5_u32.to_le_bytes()).unwrap();
        assert_eq!(vec.capacity(), 8);

        for value in 6..=9_u32 {
            vec.push_back(&value.to_le_bytes()).unwrap();
        }
        assert_eq!(vec.capacity(), 16);
        assert_eq!(values(&vec), [1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn push_front_with_growth_keeps_order() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 3, 4]);

        vec.push_front(&0_u32.to_le_bytes()).unwrap();

        assert_eq!(values(&vec), [0, 1, 2, 3, 4]);
        assert_eq!(vec.capacity(), 8);
    }

    #[test]
    fn insert_with_growth_keeps_order() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 4, 5]);

        vec.insert(2, &3_u32.to_le_bytes()).unwrap();

        assert_eq!(values(&vec), [1, 2, 3, 4, 5]);
        assert_eq!(vec.capacity(), 8);
    }

    #[test]
    fn push_back_block_uses_block_growth() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 3]);

        vec.push_back_block(&block(&[4, 5, 6, 7, 8, 9, 10])).unwrap();

        assert_eq!(values(&vec), [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(vec.capacity(), 20);
    }

    #[test]
    fn one_item_block_uses_block_growth() {
        let mut vec = OpaqueVec::builder().item_size(1).build().unwrap();
        vec.push_back_block(&[1, 2, 3, 4]).unwrap();
        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);

        vec.insert_block(1, &[9]).unwrap();

        assert_eq!(vec.as_bytes(), [1, 9, 2, 3, 4]);
        assert_eq!(vec.capacity(), 10);

        let mut vec = OpaqueVec::builder().item_size(1).build().unwrap();
        vec.push_back_block(&[1, 2, 3, 4]).unwrap();

        vec.push_back_block(&[5]).unwrap();

        assert_eq!(vec.as_bytes(), [1, 2, 3, 4, 5]);
        assert_eq!(vec.capacity(), 10);
    }

    #[test]
    fn insert_at_length_is_rejected() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 3]);

        let result = vec.insert(3, &4_u32.to_le_bytes());

        assert_eq!(
            result,
            Err(Error::IndexOutOfRange {
                index: 3,
                length: 1,
                size: 3
            })
        );
        assert_eq!(values(&vec), [1, 2, 3]);
    }

    #[test]
    fn insert_into_empty_is_rejected() {
        let mut vec = u32_vec(GlobalAllocator, &[]);

        assert!(matches!(
            vec.insert(0, &1_u32.to_le_bytes()),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            vec.insert_block(0, &block(&[1, 2])),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(vec.is_empty());
    }

    #[test]
    fn wrong_payload_length_is_invalid_argument() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2]);

        assert!(matches!(
            vec.push_back(&[1, 2, 3]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            vec.push_front(&[]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            vec.insert(0, &[1, 2, 3, 4, 5]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            vec.modify(0, &[1]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            vec.find(&[1, 2], compare_u32),
            Err(Error::InvalidArgument { .. })
        ));

        assert_eq!(values(&vec), [1, 2]);
    }

    #[test]
    fn malformed_block_is_invalid_argument() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2]);

        assert!(matches!(
            vec.push_back_block(&[]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            vec.push_back_block(&[0; 6]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            vec.insert_block(0, &[0; 7]),
            Err(Error::InvalidArgument { .. })
        ));

        assert_eq!(values(&vec), [1, 2]);
    }

    #[test]
    fn invalid_argument_is_reported_before_index() {
        let mut vec = u32_vec(GlobalAllocator, &[1]);

        assert!(matches!(
            vec.insert(5, &[1]),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            vec.remove_block(5, 0),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn out_of_range_access() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 3]);

        assert_eq!(
            vec.get(3),
            Err(Error::IndexOutOfRange {
                index: 3,
                length: 1,
                size: 3
            })
        );
        assert!(matches!(vec.get_mut(7), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(vec.remove(3), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(
            vec.remove_block(2, 2),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            vec.remove_block(usize::MAX, 2),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            vec.modify(3, &0_u32.to_le_bytes()),
            Err(Error::IndexOutOfRange { .. })
        ));

        assert_eq!(values(&vec), [1, 2, 3]);
    }

    #[test]
    fn pop_on_empty_is_noop() {
        let mut vec = u32_vec(GlobalAllocator, &[]);

        assert!(!vec.pop_back());
        assert!(!vec.pop_front());
        assert!(vec.is_empty());
        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn front_and_back_on_empty() {
        let vec = u32_vec(GlobalAllocator, &[]);

        assert_eq!(vec.front(), None);
        assert_eq!(vec.back(), None);
    }

    #[test]
    fn modify_and_get_mut() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 3]);

        vec.modify(1, &20_u32.to_le_bytes()).unwrap();
        vec.get_mut(2).unwrap()[0] = 30;

        assert_eq!(values(&vec), [1, 20, 30]);
    }

    #[test]
    fn for_each_visits_in_order() {
        let vec = u32_vec(GlobalAllocator, &[7, 8, 9]);
        let mut calls = Vec::new();

        vec.for_each(|item, index, len| {
            calls.push((item.map(|bytes| bytes[0]), index, len));
        });

        assert_eq!(calls, [(Some(7), 0, 3), (Some(8), 1, 3), (Some(9), 2, 3)]);
    }

    #[test]
    fn for_each_on_empty_calls_once() {
        let vec = u32_vec(GlobalAllocator, &[]);
        let mut calls = Vec::new();

        vec.for_each(|item, index, len| calls.push((item.is_none(), index, len)));

        assert_eq!(calls, [(true, 0, 0)]);
    }

    #[test]
    fn find_returns_first_match() {
        let vec = u32_vec(GlobalAllocator, &[4, 7, 4, 7]);

        assert_eq!(vec.find(&7_u32.to_le_bytes(), compare_u32), Ok(1));
    }

    #[test]
    fn sort_is_stable() {
        // Items are (key, tag) byte pairs and only the key is compared.
        let mut vec = OpaqueVecBuilder::new().item_size(2).build().unwrap();
        vec.push_back_block(&[3, 0, 1, 1, 3, 2, 1, 3, 2, 4]).unwrap();

        vec.sort_by(|a, b| a[0].cmp(&b[0])).unwrap();

        assert_eq!(vec.as_bytes(), &[1, 1, 1, 3, 2, 4, 3, 0, 3, 2]);
    }

    #[test]
    fn sort_of_empty_and_single_allocates_nothing() {
        let allocator = TestAllocator::new();
        let mut vec = u32_vec(&allocator, &[]);
        allocator.fail_after(0);

        vec.sort_by(compare_u32).unwrap();

        vec.push_back(&1_u32.to_le_bytes()).unwrap();
        vec.sort_by(compare_u32).unwrap();

        assert_eq!(values(&vec), [1]);
    }

    #[test]
    fn sort_scratch_failure_keeps_order() {
        let allocator = TestAllocator::new();
        let mut vec = u32_vec(&allocator, &[3, 1, 2]);
        allocator.fail_after(0);

        let result = vec.sort_by(compare_u32);

        assert_eq!(result, Err(Error::AllocationFailure { bytes: 12 }));
        assert_eq!(values(&vec), [3, 1, 2]);
        assert_eq!(allocator.outstanding(), 1);
    }

    #[test]
    fn sort_releases_scratch() {
        let allocator = TestAllocator::new();
        let mut vec = u32_vec(&allocator, &[3, 1, 2]);

        vec.sort_by(compare_u32).unwrap();

        assert_eq!(allocator.allocations(), 2);
        assert_eq!(allocator.outstanding(), 1);
    }

    #[test]
    fn growth_failure_leaves_vector_unchanged() {
        let allocator = TestAllocator::new();
        let mut vec = u32_vec(&allocator, &[1, 2, 3, 4]);
        allocator.fail_after(0);

        assert_eq!(
            vec.push_back(&5_u32.to_le_bytes()),
            Err(Error::AllocationFailure { bytes: 32 })
        );
        assert!(matches!(
            vec.push_front(&5_u32.to_le_bytes()),
            Err(Error::AllocationFailure { .. })
        ));
        assert!(matches!(
            vec.insert(1, &5_u32.to_le_bytes()),
            Err(Error::AllocationFailure { .. })
        ));
        assert!(matches!(
            vec.insert_block(1, &block(&[5, 6])),
            Err(Error::AllocationFailure { .. })
        ));
        assert!(matches!(
            vec.push_back_block(&block(&[5, 6])),
            Err(Error::AllocationFailure { .. })
        ));

        assert_eq!(values(&vec), [1, 2, 3, 4]);
        assert_eq!(vec.capacity(), 4);
        assert_eq!(allocator.outstanding(), 1);

        allocator.succeed_always();
        vec.push_back(&5_u32.to_le_bytes()).unwrap();
        assert_eq!(values(&vec), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn removal_shrinks_when_less_than_half_full() {
        let allocator = TestAllocator::new();
        let mut vec = u32_vec(&allocator, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(vec.capacity(), 16);

        // 8 items in 16 slots is exactly half full.
        vec.remove(0).unwrap();
        assert_eq!(vec.capacity(), 16);

        vec.remove(0).unwrap();
        assert_eq!(vec.capacity(), 7);
        assert_eq!(values(&vec), [3, 4, 5, 6, 7, 8, 9]);

        vec.remove_block(0, 6).unwrap();
        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
        assert_eq!(values(&vec), [9]);

        assert_eq!(allocator.outstanding(), 1);
    }

    #[test]
    fn capacity_stays_within_bounds_after_removals() {
        let mut vec = u32_vec(GlobalAllocator, &(0..100).collect::<Vec<_>>());

        while vec.pop_front() {
            let len = vec.len();
            assert!(
                vec.capacity() <= (2 * len).max(DEFAULT_CAPACITY),
                "capacity {} with {len} items",
                vec.capacity()
            );
        }

        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn shrink_failure_is_absorbed() {
        let allocator = TestAllocator::new();
        let mut vec = u32_vec(&allocator, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        allocator.fail_after(0);

        vec.remove_block(0, 8).unwrap();

        assert_eq!(values(&vec), [9]);
        assert_eq!(vec.capacity(), 16);
        assert_eq!(allocator.outstanding(), 1);

        // The next removal tries again once memory is available.
        allocator.succeed_always();
        assert!(vec.pop_back());
        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn clear_resets_capacity() {
        let allocator = TestAllocator::new();
        let mut vec = u32_vec(&allocator, &[1, 2, 3, 4, 5]);
        assert_eq!(vec.capacity(), 8);

        vec.clear();

        assert!(vec.is_empty());
        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
        assert_eq!(allocator.outstanding(), 1);
    }

    #[test]
    fn clear_keeps_small_capacity() {
        let allocator = TestAllocator::new();
        let mut vec = OpaqueVecBuilder::new()
            .item_size(1)
            .capacity(2)
            .allocator(&allocator)
            .build()
            .unwrap();
        vec.push_back_block(&[1, 2]).unwrap();

        vec.clear();

        assert!(vec.is_empty());
        assert_eq!(vec.capacity(), 2);
        assert_eq!(allocator.allocations(), 1);
    }

    #[test]
    fn clear_failure_still_empties() {
        let allocator = TestAllocator::new();
        let mut vec = u32_vec(&allocator, &[1, 2, 3, 4, 5]);
        allocator.fail_after(0);

        vec.clear();

        assert!(vec.is_empty());
        assert_eq!(vec.capacity(), 8);
    }

    #[test]
    fn shrink_to_fit_releases_excess() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 3, 4, 5]);
        assert_eq!(vec.capacity(), 8);

        vec.shrink_to_fit().unwrap();

        assert_eq!(vec.capacity(), 5);
        assert_eq!(values(&vec), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn shrink_to_fit_respects_floor() {
        let mut vec = u32_vec(GlobalAllocator, &[1]);

        vec.shrink_to_fit().unwrap();

        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn shrink_to_fit_failure_is_reported() {
        let allocator = TestAllocator::new();
        let mut vec = u32_vec(&allocator, &[1, 2, 3, 4, 5]);
        allocator.fail_after(0);

        assert_eq!(
            vec.shrink_to_fit(),
            Err(Error::AllocationFailure { bytes: 20 })
        );
        assert_eq!(vec.capacity(), 8);
        assert_eq!(values(&vec), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn insert_then_remove_at_every_index_of_full_vector() {
        let before = [1, 2, 3, 4];

        for i in 0..before.len() {
            let mut vec = u32_vec(GlobalAllocator, &before);
            assert_eq!(vec.capacity(), vec.len());

            vec.insert(i, &0_u32.to_le_bytes()).unwrap();
            assert_eq!(vec.capacity(), 8);
            assert_eq!(values(&vec)[i], 0);

            vec.remove(i).unwrap();
            assert_eq!(vec.len(), before.len());
            assert_eq!(values(&vec), before);

            // Block growth overshoots far enough that removing the block shrinks again.
            let mut vec = u32_vec(GlobalAllocator, &before);

            vec.insert_block(i, &block(&[10, 11, 12])).unwrap();
            assert_eq!(vec.capacity(), 14);

            vec.remove_block(i, 3).unwrap();
            assert_eq!(vec.len(), before.len());
            assert_eq!(values(&vec), before);
            assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
        }
    }

    #[test]
    fn insert_then_remove_restores_contents() {
        let mut vec = u32_vec(GlobalAllocator, &[1, 2, 3, 4, 5, 6]);
        let before = values(&vec);

        vec.insert_block(3, &block(&[10, 11, 12])).unwrap();
        vec.remove_block(3, 3).unwrap();
        vec.insert(0, &0_u32.to_le_bytes()).unwrap();
        vec.remove(0).unwrap();

        assert_eq!(values(&vec), before);
    }

    #[test]
    fn aligned_items_are_aligned() {
        let mut vec = OpaqueVecBuilder::new()
            .layout(Layout::from_size_align(3, 8).unwrap())
            .build()
            .unwrap();

        for index in 0..10_u8 {
            vec.push_back(&[index; 8]).unwrap();
        }

        assert_eq!(vec.item_size(), 8);
        for item in &vec {
            assert_eq!(item.as_ptr().align_offset(8), 0);
        }
    }

    #[test]
    fn no_leaks_across_operations() {
        let allocator = TestAllocator::new();

        {
            let mut vec = u32_vec(&allocator, &(0..50).collect::<Vec<_>>());
            vec.sort_by(|a, b| compare_u32(b, a)).unwrap();
            vec.remove_block(10, 30).unwrap();
            vec.insert_block(1, &block(&[1, 2, 3])).unwrap();
            vec.shrink_to_fit().unwrap();
            vec.clear();
        }

        assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn send_to_another_thread() {
        let vec = u32_vec(GlobalAllocator, &[1, 2, 3]);

        let len = std::thread::spawn(move || vec.len()).join().unwrap();

        assert_eq!(len, 3);
    }
}
