use core::alloc::Layout;

use crate::{BufferAllocator, Error, GlobalAllocator, OpaqueVec, Result};

/// Builder for creating an instance of [`OpaqueVec`].
///
/// [`OpaqueVec`] requires the item size to be specified at construction time. Use either
/// `.item_size()` for plain byte payloads, `.layout()` to provide a specific layout or
/// `.layout_of::<T>()` to derive the layout from a type.
///
/// The item size is mandatory, whereas other settings are optional.
///
/// # Examples
///
/// Using a plain item size:
///
/// ```
/// use opaque_vec::OpaqueVec;
///
/// let vec = OpaqueVec::builder().item_size(12).capacity(16).build()?;
///
/// assert_eq!(vec.item_size(), 12);
/// assert_eq!(vec.capacity(), 16);
/// # Ok::<(), opaque_vec::Error>(())
/// ```
///
/// Using type-based layout:
///
/// ```
/// use opaque_vec::OpaqueVec;
///
/// let vec = OpaqueVec::builder().layout_of::<u64>().build()?;
///
/// assert_eq!(vec.item_size(), 8);
/// # Ok::<(), opaque_vec::Error>(())
/// ```
#[derive(Debug)]
#[must_use]
pub struct OpaqueVecBuilder<A = GlobalAllocator> {
    item_layout: Option<ItemLayoutRequest>,
    capacity: usize,
    allocator: A,
}

/// The item layout as requested by the caller, validated when building.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ItemLayoutRequest {
    Bytes(usize),
    Layout(Layout),
}

impl OpaqueVecBuilder<GlobalAllocator> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            item_layout: None,
            capacity: 0,
            allocator: GlobalAllocator,
        }
    }
}

impl<A: BufferAllocator> OpaqueVecBuilder<A> {
    /// Sets the size in bytes of each item, with no alignment requirement.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().item_size(3).build()?;
    /// assert_eq!(vec.item_size(), 3);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    #[inline]
    pub fn item_size(mut self, item_size: usize) -> Self {
        self.item_layout = Some(ItemLayoutRequest::Bytes(item_size));
        self
    }

    /// Sets the memory layout of each item.
    ///
    /// The item size of the vector is the layout size rounded up to the layout alignment,
    /// and the buffer is aligned so that every item slot satisfies the alignment.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::alloc::Layout;
    ///
    /// use opaque_vec::OpaqueVec;
    ///
    /// let layout = Layout::from_size_align(6, 4).unwrap();
    /// let vec = OpaqueVec::builder().layout(layout).build()?;
    ///
    /// assert_eq!(vec.item_size(), 8);
    /// assert_eq!(vec.item_layout(), layout);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    #[inline]
    pub fn layout(mut self, layout: Layout) -> Self {
        self.item_layout = Some(ItemLayoutRequest::Layout(layout));
        self
    }

    /// Sets the memory layout of each item based on a type.
    ///
    /// This is a convenience method that creates the layout for the given type.
    #[inline]
    pub fn layout_of<T>(self) -> Self {
        self.layout(Layout::new::<T>())
    }

    /// Sets the initial capacity, in items.
    ///
    /// Zero (the default) means [`DEFAULT_CAPACITY`][crate::DEFAULT_CAPACITY]. A capacity
    /// below the default is honored but never restored by automatic shrinking.
    #[inline]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the allocator that provides the item buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::{GlobalAllocator, OpaqueVec};
    ///
    /// let allocator = GlobalAllocator;
    /// let vec = OpaqueVec::builder()
    ///     .item_size(4)
    ///     .allocator(&allocator)
    ///     .build()?;
    ///
    /// assert_eq!(*vec.allocator(), &allocator);
    /// # Ok::<(), opaque_vec::Error>(())
    /// ```
    #[inline]
    pub fn allocator<B: BufferAllocator>(self, allocator: B) -> OpaqueVecBuilder<B> {
        OpaqueVecBuilder {
            item_layout: self.item_layout,
            capacity: self.capacity,
            allocator,
        }
    }

    /// Builds the vector with the specified configuration, allocating its initial buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no item size was specified or the item size is
    /// zero or cannot be described as a memory layout.
    ///
    /// Returns [`Error::AllocationFailure`] if the initial buffer cannot be allocated.
    pub fn build(self) -> Result<OpaqueVec<A>> {
        let item_layout = match self.item_layout {
            None => {
                return Err(Error::InvalidArgument {
                    problem: "item size must be set using .item_size(), .layout() or .layout_of()",
                });
            }
            Some(ItemLayoutRequest::Layout(layout)) => layout,
            Some(ItemLayoutRequest::Bytes(item_size)) => {
                match Layout::from_size_align(item_size, 1) {
                    Ok(layout) => layout,
                    Err(_) => {
                        return Err(Error::InvalidArgument {
                            problem: "item size exceeds the largest possible allocation",
                        });
                    }
                }
            }
        };

        OpaqueVec::new_inner(item_layout, self.capacity, self.allocator)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use core::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::DEFAULT_CAPACITY;
    use crate::test_allocator::TestAllocator;

    assert_impl_all!(OpaqueVecBuilder: Send, Debug);

    #[test]
    fn builder_new_creates_default_state() {
        let builder = OpaqueVecBuilder::new();

        assert!(builder.item_layout.is_none());
        assert_eq!(builder.capacity, 0);
    }

    #[test]
    fn build_without_item_size_is_invalid_argument() {
        let result = OpaqueVecBuilder::new().capacity(8).build();

        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn zero_item_size_is_invalid_argument() {
        let result = OpaqueVecBuilder::new().item_size(0).build();
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));

        let result = OpaqueVecBuilder::new().layout_of::<()>().build();
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn huge_item_size_is_invalid_argument() {
        let result = OpaqueVecBuilder::new().item_size(usize::MAX).build();

        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn zero_capacity_means_default() {
        let vec = OpaqueVecBuilder::new().item_size(4).build().unwrap();

        assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
        assert_eq!(vec.len(), 0);
    }

    #[test]
    fn requested_capacity_is_honored() {
        let vec = OpaqueVecBuilder::new()
            .item_size(4)
            .capacity(5)
            .build()
            .unwrap();
        assert_eq!(vec.capacity(), 5);

        let vec = OpaqueVecBuilder::new()
            .item_size(4)
            .capacity(1)
            .build()
            .unwrap();
        assert_eq!(vec.capacity(), 1);
    }

    #[test]
    fn layout_can_be_overridden() {
        let vec = OpaqueVecBuilder::new()
            .layout_of::<u16>()
            .item_size(7)
            .build()
            .unwrap();
        assert_eq!(vec.item_size(), 7);

        let vec = OpaqueVecBuilder::new()
            .item_size(7)
            .layout_of::<u64>()
            .build()
            .unwrap();
        assert_eq!(vec.item_size(), 8);
        assert_eq!(vec.item_layout(), Layout::new::<u64>());
    }

    #[test]
    fn allocator_is_used_for_initial_buffer() {
        let allocator = TestAllocator::new();

        let vec = OpaqueVecBuilder::new()
            .item_size(4)
            .capacity(10)
            .allocator(&allocator)
            .build()
            .unwrap();

        assert_eq!(allocator.outstanding(), 1);
        drop(vec);
        assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn initial_allocation_failure_is_reported() {
        let allocator = TestAllocator::new();
        allocator.fail_after(0);

        let result = OpaqueVecBuilder::new()
            .item_size(4)
            .capacity(10)
            .allocator(&allocator)
            .build();

        assert!(matches!(
            result,
            Err(Error::AllocationFailure { bytes: 40 })
        ));
        assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn builder_send_trait() {
        // Verify builder can be moved between threads.
        let builder = OpaqueVecBuilder::new().item_size(8);
        let handle = std::thread::spawn(move || builder.build().map(|vec| vec.capacity()));
        let capacity = handle.join().expect("thread completed successfully");

        assert_eq!(capacity, Ok(DEFAULT_CAPACITY));
    }
}
