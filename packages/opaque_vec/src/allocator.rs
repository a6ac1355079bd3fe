use core::alloc::Layout;
use core::ptr::NonNull;

/// Source of the memory blocks that back a vector's item buffer.
///
/// The vector never retries a failed allocation and never assumes that memory it receives
/// is zero-initialized. Every block obtained via [`allocate()`][Self::allocate] is returned
/// exactly once via [`release()`][Self::release] with the same layout.
///
/// # Examples
///
/// Routing buffers through a custom heap:
///
/// ```
/// use std::alloc::Layout;
/// use std::ptr::NonNull;
///
/// use opaque_vec::{BufferAllocator, GlobalAllocator, OpaqueVec};
///
/// #[derive(Debug)]
/// struct LoggingAllocator;
///
/// impl BufferAllocator for LoggingAllocator {
///     fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
///         println!("allocating {} bytes", layout.size());
///         GlobalAllocator.allocate(layout)
///     }
///
///     unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
///         println!("releasing {} bytes", layout.size());
///         // SAFETY: Forwarding safety requirements to the caller.
///         unsafe { GlobalAllocator.release(ptr, layout) }
///     }
/// }
///
/// let vec = OpaqueVec::builder()
///     .item_size(8)
///     .allocator(LoggingAllocator)
///     .build()?;
///
/// assert!(vec.is_empty());
/// # Ok::<(), opaque_vec::Error>(())
/// ```
pub trait BufferAllocator {
    /// Allocates a block of memory that fits `layout`.
    ///
    /// Returns `None` if the request cannot be satisfied. The vector only requests blocks
    /// with a non-zero size.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Returns a block of memory to the allocator.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `ptr` was returned by [`allocate()`][Self::allocate] on
    /// this allocator with the same `layout` and has not already been released.
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout);
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { (**self).release(ptr, layout) }
    }
}

/// A [`BufferAllocator`] that obtains memory from the global heap.
///
/// This is the default allocator of [`OpaqueVec`][crate::OpaqueVec] and
/// [`TypedVec`][crate::TypedVec].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GlobalAllocator;

impl BufferAllocator for GlobalAllocator {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }

        // SAFETY: We checked above that the layout has a non-zero size, which is the only
        // requirement of the global allocator.
        NonNull::new(unsafe { alloc::alloc::alloc(layout) })
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: The caller guarantees the block came from `allocate()` with this layout,
        // which in turn obtained it from the global allocator.
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
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
    use core::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(GlobalAllocator: Send, Sync, Debug, Copy, Default);

    #[test]
    fn global_allocate_and_release() {
        let layout = Layout::from_size_align(64, 8).unwrap();

        let ptr = GlobalAllocator.allocate(layout).unwrap();
        assert_eq!(ptr.as_ptr().align_offset(8), 0);

        unsafe {
            ptr.as_ptr().write_bytes(0xAB, 64);
            assert_eq!(ptr.as_ptr().add(63).read(), 0xAB);
            GlobalAllocator.release(ptr, layout);
        }
    }

    #[test]
    fn global_refuses_zero_sized_blocks() {
        let layout = Layout::from_size_align(0, 1).unwrap();

        assert!(GlobalAllocator.allocate(layout).is_none());
    }

    #[test]
    fn reference_forwards_to_allocator() {
        let allocator = GlobalAllocator;
        let by_ref = &allocator;
        let layout = Layout::new::<u64>();

        let ptr = by_ref.allocate(layout).unwrap();
        unsafe { by_ref.release(ptr, layout) };
    }
}
