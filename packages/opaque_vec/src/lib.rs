#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A type-erased, dynamically resizable vector of fixed-stride items.
//!
//! This crate provides [`OpaqueVec`], a contiguous sequential container whose items are
//! described only by their size (and optionally alignment) at construction time. The logical
//! length grows and shrinks independently of the allocated capacity, with a documented
//! growth and shrink policy that bounds both reallocation frequency and wasted memory.
//!
//! The crate is `no_std` and only requires the `alloc` crate. Memory is obtained through the
//! [`BufferAllocator`] trait, which defaults to the global heap via [`GlobalAllocator`] but can
//! be replaced to route buffers through a platform-specific heap.
//!
//! # Key Features
//!
//! - **Type-erased storage**: items are byte slices of a fixed stride, making the container
//!   usable for payloads whose type is only known at runtime
//! - **Typed variant**: [`TypedVec<T>`] offers the same operations over any `T: Copy`
//! - **Fallible allocation**: out-of-memory is reported as [`Error::AllocationFailure`],
//!   never as a panic, and a failed growth leaves the vector unchanged
//! - **Block operations**: insert, append and remove whole runs of items in one relocation
//! - **Stable sorting**: an iterative merge sort with a single scratch buffer
//!
//! # Capacity management
//!
//! Single-item insertions double the capacity. Block insertions grow to the larger of the
//! doubled capacity and twice the resulting length, even when the block holds one item.
//! After a removal leaves the vector less than half full, capacity is reduced to fit the
//! remaining items, but never below [`DEFAULT_CAPACITY`]. [`OpaqueVec::clear()`] always
//! releases excess capacity.
//!
//! # Examples
//!
//! ```rust
//! use opaque_vec::OpaqueVec;
//!
//! let mut vec = OpaqueVec::builder().item_size(4).build()?;
//!
//! for value in [5_u32, 2, 8, 1, 9, 3] {
//!     vec.push_back(&value.to_le_bytes())?;
//! }
//!
//! vec.sort_by(|a, b| a.cmp(b))?;
//! assert_eq!(vec.front(), Some(&1_u32.to_le_bytes()[..]));
//! # Ok::<(), opaque_vec::Error>(())
//! ```
//!
//! Using the typed variant:
//!
//! ```rust
//! use opaque_vec::TypedVec;
//!
//! let mut vec = TypedVec::<u32>::with_capacity(5)?;
//!
//! for value in [5, 2, 8, 1, 9, 3] {
//!     vec.push_back(value)?;
//! }
//!
//! vec.sort_by(u32::cmp)?;
//! assert_eq!(vec.as_slice(), &[1, 2, 3, 5, 8, 9]);
//! assert_eq!(vec.find(&5, u32::cmp)?, 3);
//! # Ok::<(), opaque_vec::Error>(())
//! ```
//!
//! # Thread safety
//!
//! The vectors are thread-mobile ([`Send`]) but not thread-safe ([`Sync`]). Sharing one
//! between threads requires external synchronization, such as a mutex per vector.

extern crate alloc;

#[cfg(test)]
extern crate std;

mod allocator;
mod buffer;
mod builder;
mod capacity;
mod error;
mod iter;
mod sort;
#[cfg(test)]
mod test_allocator;
mod typed;
mod vec;

pub use allocator::*;
pub(crate) use buffer::*;
pub use builder::*;
pub use capacity::DEFAULT_CAPACITY;
pub use error::*;
pub use iter::*;
pub(crate) use sort::*;
pub use typed::TypedVec;
pub use vec::OpaqueVec;
