//! Integration tests for `opaque_vec` exercising the public API end to end.
//!
//! These tests drive both vector flavors through realistic sequences of operations and
//! verify that a custom allocator sees every buffer returned.

use std::alloc::Layout;
use std::cmp::Ordering;
use std::ptr::NonNull;
use std::sync::atomic::{self, AtomicUsize};

use opaque_vec::{BufferAllocator, DEFAULT_CAPACITY, Error, GlobalAllocator, OpaqueVec, TypedVec};

/// Forwards to the global heap and counts the blocks in use.
#[derive(Debug, Default)]
struct CountingAllocator {
    outstanding: AtomicUsize,
    total: AtomicUsize,
}

impl CountingAllocator {
    fn outstanding(&self) -> usize {
        self.outstanding.load(atomic::Ordering::Relaxed)
    }

    fn total(&self) -> usize {
        self.total.load(atomic::Ordering::Relaxed)
    }
}

impl BufferAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let ptr = GlobalAllocator.allocate(layout)?;

        self.outstanding.fetch_add(1, atomic::Ordering::Relaxed);
        self.total.fetch_add(1, atomic::Ordering::Relaxed);

        Some(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        self.outstanding.fetch_sub(1, atomic::Ordering::Relaxed);

        // SAFETY: Forwarding safety requirements to the caller.
        unsafe { GlobalAllocator.release(ptr, layout) }
    }
}

/// Refuses every request.
#[derive(Debug)]
struct ExhaustedAllocator;

impl BufferAllocator for ExhaustedAllocator {
    fn allocate(&self, _layout: Layout) -> Option<NonNull<u8>> {
        None
    }

    unsafe fn release(&self, _ptr: NonNull<u8>, _layout: Layout) {
        unreachable!("nothing was ever allocated");
    }
}

fn decode(item: &[u8]) -> u32 {
    u32::from_le_bytes(item.try_into().expect("items are four bytes long"))
}

fn decode_all(vec: &OpaqueVec<impl BufferAllocator>) -> Vec<u32> {
    vec.iter().map(decode).collect()
}

fn encode_all(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn compare(a: &[u8], b: &[u8]) -> Ordering {
    decode(a).cmp(&decode(b))
}

#[test]
fn sort_and_search_a_byte_vector() {
    let mut vec = OpaqueVec::builder().item_size(4).build().unwrap();
    vec.push_back_block(&encode_all(&[5, 2, 8, 1, 9, 3]))
        .unwrap();

    vec.sort_by(compare).unwrap();

    assert_eq!(decode_all(&vec), [1, 2, 3, 5, 8, 9]);
    assert_eq!(vec.find(&5_u32.to_le_bytes(), compare), Ok(3));
    assert_eq!(
        vec.find(&7_u32.to_le_bytes(), compare),
        Err(Error::NotFound)
    );
}

#[test]
fn block_operations_keep_order() {
    let mut vec = OpaqueVec::builder().item_size(4).build().unwrap();
    vec.push_back_block(&encode_all(&[10, 20, 30, 40, 50]))
        .unwrap();

    vec.remove_block(1, 2).unwrap();
    assert_eq!(decode_all(&vec), [10, 40, 50]);

    vec.insert_block(1, &encode_all(&[20, 30])).unwrap();
    assert_eq!(decode_all(&vec), [10, 20, 30, 40, 50]);
}

#[test]
fn queue_usage_through_front_and_back() {
    let mut vec = TypedVec::<u64>::new().unwrap();

    for value in 0..100 {
        vec.push_back(value).unwrap();
    }

    let mut drained = Vec::new();
    while let Some(value) = vec.pop_front() {
        drained.push(value);

        if value % 10 == 0 {
            vec.push_front(1000 + value).unwrap();
            assert_eq!(vec.pop_front(), Some(1000 + value));
        }
    }

    assert_eq!(drained, (0..100).collect::<Vec<_>>());
    assert!(vec.is_empty());
    assert_eq!(vec.capacity(), DEFAULT_CAPACITY);
}

#[test]
fn custom_allocator_sees_every_buffer_returned() {
    let allocator = CountingAllocator::default();

    {
        let mut vec = OpaqueVec::builder()
            .layout_of::<u32>()
            .allocator(&allocator)
            .build()
            .unwrap();

        for value in 0..64_u32 {
            vec.push_back(&value.to_le_bytes()).unwrap();
        }
        vec.sort_by(|a, b| compare(b, a)).unwrap();
        vec.remove_block(0, 60).unwrap();
        vec.clear();

        assert_eq!(allocator.outstanding(), 1);
    }

    assert_eq!(allocator.outstanding(), 0);
    assert!(allocator.total() > 1);
}

#[test]
fn exhausted_allocator_fails_construction() {
    let result = OpaqueVec::builder()
        .item_size(16)
        .capacity(8)
        .allocator(ExhaustedAllocator)
        .build();

    assert_eq!(
        result.map(|vec| vec.len()),
        Err(Error::AllocationFailure { bytes: 128 })
    );

    let result = TypedVec::<u8, _>::with_capacity_in(0, ExhaustedAllocator);
    assert!(matches!(
        result,
        Err(Error::AllocationFailure {
            bytes: DEFAULT_CAPACITY
        })
    ));
}

#[test]
fn errors_describe_the_problem() {
    let mut vec = OpaqueVec::builder().item_size(4).build().unwrap();
    vec.push_back(&[0; 4]).unwrap();

    let error = vec.insert(1, &[0; 4]).unwrap_err();
    assert_eq!(
        error.to_string(),
        "range of 1 item(s) at index 1 is out of range for vector of size 1"
    );

    let error = vec.push_back(&[0; 3]).unwrap_err();
    assert!(error.to_string().contains("item size"), "{error}");
}

#[test]
fn for_each_reports_every_item() {
    let mut vec = OpaqueVec::builder().item_size(1).build().unwrap();
    vec.push_back_block(b"abc").unwrap();

    let mut seen = String::new();
    vec.for_each(|item, index, len| {
        let item = item.expect("vector is not empty");
        seen.push(char::from(item[0]));
        assert!(index < len);
        assert_eq!(len, 3);
    });

    assert_eq!(seen, "abc");
}
