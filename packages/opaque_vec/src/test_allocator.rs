//! An allocator for tests that can be told to fail and that counts outstanding blocks.

#![allow(
    clippy::arithmetic_side_effects,
    reason = "test helper, counters cannot realistically overflow"
)]

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

use crate::{BufferAllocator, GlobalAllocator};

#[derive(Debug, Default)]
pub(crate) struct TestAllocator {
    /// How many more allocations may succeed. `None` means unlimited.
    remaining_successes: Cell<Option<usize>>,

    /// Blocks allocated and not yet released.
    outstanding: Cell<usize>,

    /// Total successful allocations over the lifetime of the allocator.
    allocations: Cell<usize>,
}

impl TestAllocator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Lets the next `successes` allocations succeed and fails every one after that.
    pub(crate) fn fail_after(&self, successes: usize) {
        self.remaining_successes.set(Some(successes));
    }

    /// Lets every allocation succeed again.
    pub(crate) fn succeed_always(&self) {
        self.remaining_successes.set(None);
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    pub(crate) fn allocations(&self) -> usize {
        self.allocations.get()
    }
}

impl BufferAllocator for TestAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        match self.remaining_successes.get() {
            Some(0) => return None,
            Some(remaining) => self.remaining_successes.set(Some(remaining - 1)),
            None => {}
        }

        let ptr = GlobalAllocator.allocate(layout)?;

        self.outstanding.set(self.outstanding.get() + 1);
        self.allocations.set(self.allocations.get() + 1);

        Some(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        assert!(
            self.outstanding.get() > 0,
            "released a block that was never allocated"
        );

        self.outstanding.set(self.outstanding.get() - 1);

        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { GlobalAllocator.release(ptr, layout) }
    }
}
