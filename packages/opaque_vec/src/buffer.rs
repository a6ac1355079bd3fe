use core::alloc::Layout;
use core::mem::ManuallyDrop;
use core::num::NonZero;
use core::ptr::{self, NonNull};

use crate::{BufferAllocator, Error, Result};

/// Memory geometry of the items in a vector: the layout the caller asked for and the
/// stride between consecutive slots derived from it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ItemGeometry {
    item_layout: Layout,

    /// Distance in bytes between the starts of two adjacent slots. This is the item size
    /// rounded up to the item alignment, so every slot in an aligned buffer is aligned.
    item_size: NonZero<usize>,
}

impl ItemGeometry {
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the layout has a zero size.
    pub(crate) fn new(item_layout: Layout) -> Result<Self> {
        // Padding to the alignment never turns a non-zero size into zero, so this only
        // rejects zero-sized layouts.
        let Some(item_size) = NonZero::new(item_layout.pad_to_align().size()) else {
            return Err(Error::InvalidArgument {
                problem: "item size must be non-zero",
            });
        };

        Ok(Self {
            item_layout,
            item_size,
        })
    }

    #[must_use]
    pub(crate) fn item_layout(&self) -> Layout {
        self.item_layout
    }

    #[must_use]
    pub(crate) fn item_size(&self) -> usize {
        self.item_size.get()
    }

    /// Number of bytes occupied by `count` items.
    ///
    /// Only meaningful for counts that fit in an allocated buffer or in a caller-provided
    /// slice, which is what makes the multiplication unable to overflow.
    #[must_use]
    pub(crate) fn bytes_for(&self, count: usize) -> usize {
        count.wrapping_mul(self.item_size.get())
    }

    /// Number of whole items in `bytes` bytes, or `None` if `bytes` is not a multiple of
    /// the item size.
    #[must_use]
    pub(crate) fn count_items(&self, bytes: usize) -> Option<usize> {
        (bytes % self.item_size == 0).then(|| bytes / self.item_size)
    }

    /// Calculates the layout of a buffer with room for `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if such a buffer cannot be described, which
    /// means no allocator could ever provide it.
    pub(crate) fn buffer_layout(&self, capacity: usize) -> Result<Layout> {
        let bytes = capacity.saturating_mul(self.item_size.get());

        match Layout::from_size_align(bytes, self.item_layout.align()) {
            Ok(layout) => Ok(layout),
            Err(_) => Err(Error::AllocationFailure { bytes }),
        }
    }

    /// Returns a pointer to the slot at `index` in the buffer starting at `base`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `index` is at most the capacity of the buffer, so the
    /// result points into the buffer or one byte past its end.
    #[must_use]
    pub(crate) unsafe fn slot(&self, base: NonNull<u8>, index: usize) -> NonNull<u8> {
        // SAFETY: The caller guarantees the offset stays within the allocation.
        unsafe { base.add(self.bytes_for(index)) }
    }

    /// Copies `count` items from `src` to `dst`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that both pointers are valid for `count` items and that the
    /// two ranges do not overlap.
    pub(crate) unsafe fn copy_items(&self, src: NonNull<u8>, dst: NonNull<u8>, count: usize) {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), self.bytes_for(count));
        }
    }

    /// Moves `count` items from `src` to `dst`, where the two ranges may overlap.
    ///
    /// # Safety
    ///
    /// The caller must ensure that both pointers are valid for `count` items.
    pub(crate) unsafe fn move_items(&self, src: NonNull<u8>, dst: NonNull<u8>, count: usize) {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe {
            ptr::copy(src.as_ptr(), dst.as_ptr(), self.bytes_for(count));
        }
    }
}

/// A block of memory obtained from a [`BufferAllocator`].
///
/// The block is released when this value is dropped, unless ownership is taken over by
/// [`into_raw()`][Self::into_raw]. Buffers under construction are held in this form so that
/// an early return cannot leak them.
#[derive(Debug)]
pub(crate) struct Allocation<'a, A: BufferAllocator> {
    allocator: &'a A,
    ptr: NonNull<u8>,
    layout: Layout,
}

impl<'a, A: BufferAllocator> Allocation<'a, A> {
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the allocator cannot provide the block.
    pub(crate) fn new(allocator: &'a A, layout: Layout) -> Result<Self> {
        let ptr = allocator
            .allocate(layout)
            .ok_or(Error::AllocationFailure {
                bytes: layout.size(),
            })?;

        Ok(Self {
            allocator,
            ptr,
            layout,
        })
    }

    #[must_use]
    pub(crate) fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Takes over ownership of the block.
    ///
    /// The caller becomes responsible for returning the block to the same allocator with
    /// the same layout.
    #[must_use]
    pub(crate) fn into_raw(self) -> NonNull<u8> {
        let this = ManuallyDrop::new(self);
        this.ptr
    }
}

impl<A: BufferAllocator> Drop for Allocation<'_, A> {
    fn drop(&mut self) {
        // SAFETY: We obtained the block from this allocator with this layout in new() and
        // ownership was not taken over (into_raw() skips this destructor).
        unsafe {
            self.allocator.release(self.ptr, self.layout);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use super::*;
    use crate::test_allocator::TestAllocator;

    #[test]
    fn geometry_of_plain_bytes() {
        let geometry = ItemGeometry::new(Layout::from_size_align(4, 1).unwrap()).unwrap();

        assert_eq!(geometry.item_size(), 4);
        assert_eq!(geometry.bytes_for(3), 12);
        assert_eq!(geometry.buffer_layout(5).unwrap().size(), 20);
        assert_eq!(geometry.buffer_layout(5).unwrap().align(), 1);
    }

    #[test]
    fn geometry_pads_to_alignment() {
        let geometry = ItemGeometry::new(Layout::from_size_align(5, 4).unwrap()).unwrap();

        assert_eq!(geometry.item_size(), 8);
        assert_eq!(geometry.item_layout().size(), 5);
        assert_eq!(geometry.buffer_layout(3).unwrap().size(), 24);
        assert_eq!(geometry.buffer_layout(3).unwrap().align(), 4);
    }

    #[test]
    fn count_items_requires_whole_items() {
        let geometry = ItemGeometry::new(Layout::from_size_align(4, 1).unwrap()).unwrap();

        assert_eq!(geometry.count_items(0), Some(0));
        assert_eq!(geometry.count_items(12), Some(3));
        assert_eq!(geometry.count_items(13), None);
        assert_eq!(geometry.count_items(3), None);
    }

    #[test]
    fn geometry_rejects_zero_size() {
        let result = ItemGeometry::new(Layout::new::<()>());

        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn buffer_layout_overflow_is_allocation_failure() {
        let geometry = ItemGeometry::new(Layout::new::<u64>()).unwrap();

        let result = geometry.buffer_layout(usize::MAX);

        assert_eq!(
            result,
            Err(Error::AllocationFailure { bytes: usize::MAX })
        );
    }

    #[test]
    fn copy_and_move_items() {
        let geometry = ItemGeometry::new(Layout::from_size_align(2, 1).unwrap()).unwrap();
        let mut source = [1_u8, 2, 3, 4, 5, 6];
        let mut target = [0_u8; 6];

        let source_ptr = NonNull::from(&mut source).cast::<u8>();
        let target_ptr = NonNull::from(&mut target).cast::<u8>();

        unsafe {
            geometry.copy_items(source_ptr, target_ptr, 3);
        }
        assert_eq!(target, [1, 2, 3, 4, 5, 6]);

        // Shift the first two items up by one slot, overlapping the middle item.
        unsafe {
            geometry.move_items(target_ptr, geometry.slot(target_ptr, 1), 2);
        }
        assert_eq!(target, [1, 2, 1, 2, 3, 4]);
    }

    #[test]
    fn allocation_is_released_on_drop() {
        let allocator = TestAllocator::new();
        let layout = Layout::from_size_align(32, 8).unwrap();

        {
            let allocation = Allocation::new(&allocator, layout).unwrap();
            assert_eq!(allocation.ptr().as_ptr().align_offset(8), 0);
            assert_eq!(allocator.outstanding(), 1);
        }

        assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn into_raw_keeps_block_alive() {
        let allocator = TestAllocator::new();
        let layout = Layout::from_size_align(32, 8).unwrap();

        let ptr = Allocation::new(&allocator, layout).unwrap().into_raw();
        assert_eq!(allocator.outstanding(), 1);

        unsafe { allocator.release(ptr, layout) };
        assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn allocation_failure_reports_bytes() {
        let allocator = TestAllocator::new();
        allocator.fail_after(0);

        let result = Allocation::new(&allocator, Layout::from_size_align(48, 1).unwrap());

        assert!(matches!(
            result,
            Err(Error::AllocationFailure { bytes: 48 })
        ));
        assert_eq!(allocator.outstanding(), 0);
    }
}
