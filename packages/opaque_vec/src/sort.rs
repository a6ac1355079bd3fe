use core::cmp::{self, Ordering};
use core::ptr::NonNull;

use crate::ItemGeometry;

/// Sorts `len` items in the buffer at `base` with a stable, iterative merge sort.
///
/// Adjacent runs of width 1, 2, 4, … are merged pairwise into `scratch`, and each merged
/// range is copied back into `base` before the next pair is processed, so `scratch` only
/// ever needs room for `len` items and is reused for the whole sort.
///
/// Ties are resolved in favor of the left run, which is what makes the sort stable.
///
/// # Safety
///
/// The caller must ensure that:
/// - `base` is valid for reads and writes of `len` items.
/// - `scratch` is valid for reads and writes of `len` items.
/// - The two buffers do not overlap.
pub(crate) unsafe fn merge_sort<F>(
    geometry: &ItemGeometry,
    base: NonNull<u8>,
    scratch: NonNull<u8>,
    len: usize,
    compare: &mut F,
) where
    F: FnMut(NonNull<u8>, NonNull<u8>) -> Ordering,
{
    let mut width: usize = 1;

    while width < len {
        let mut left: usize = 0;

        while left < len {
            let mid = cmp::min(left.saturating_add(width), len);
            let right = cmp::min(mid.saturating_add(width), len);

            // A trailing run without a partner is already in order.
            if mid < right {
                // SAFETY: left < mid < right <= len, so all accessed items are in bounds of
                // both buffers, which the caller guarantees to be valid and non-overlapping.
                unsafe {
                    merge_runs(geometry, base, scratch, left, mid, right, compare);
                }
            }

            left = right;
        }

        width = width.saturating_mul(2);
    }
}

/// Merges the sorted runs `[left, mid)` and `[mid, right)` of `base` via `scratch`.
///
/// # Safety
///
/// The caller must ensure `left < mid < right` and that both buffers are valid for
/// `right` items and do not overlap.
unsafe fn merge_runs<F>(
    geometry: &ItemGeometry,
    base: NonNull<u8>,
    scratch: NonNull<u8>,
    left: usize,
    mid: usize,
    right: usize,
    compare: &mut F,
) where
    F: FnMut(NonNull<u8>, NonNull<u8>) -> Ordering,
{
    let mut next_left = left;
    let mut next_right = mid;
    let mut merged: usize = 0;

    while next_left < mid && next_right < right {
        // SAFETY: next_left < mid <= right, within the buffer per the caller.
        let left_item = unsafe { geometry.slot(base, next_left) };
        // SAFETY: next_right < right, within the buffer per the caller.
        let right_item = unsafe { geometry.slot(base, next_right) };

        // None of the cursors can overflow because they are bounded by `right`.
        let taken = if compare(left_item, right_item) == Ordering::Greater {
            next_right = next_right.wrapping_add(1);
            right_item
        } else {
            next_left = next_left.wrapping_add(1);
            left_item
        };

        // SAFETY: merged < right - left, within the scratch buffer per the caller.
        let target = unsafe { geometry.slot(scratch, merged) };

        // SAFETY: Both pointers are valid for one item and the buffers do not overlap.
        unsafe {
            geometry.copy_items(taken, target, 1);
        }

        merged = merged.wrapping_add(1);
    }

    // At most one of the runs still has items, which are already in order.
    for (start, end) in [(next_left, mid), (next_right, right)] {
        if start == end {
            continue;
        }

        // SAFETY: start < end <= right, within the buffer per the caller.
        let source = unsafe { geometry.slot(base, start) };
        // SAFETY: merged + (end - start) == right - left, within the scratch buffer.
        let target = unsafe { geometry.slot(scratch, merged) };
        let remaining = end.wrapping_sub(start);

        // SAFETY: Both ranges are in bounds (see above) and the buffers do not overlap.
        unsafe {
            geometry.copy_items(source, target, remaining);
        }

        merged = merged.wrapping_add(remaining);
    }

    debug_assert_eq!(merged, right.wrapping_sub(left));

    // SAFETY: left < right, within the buffer per the caller.
    let destination = unsafe { geometry.slot(base, left) };

    // SAFETY: The scratch buffer now holds `merged` items, which fit in both buffers.
    unsafe {
        geometry.copy_items(scratch, destination, merged);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;
    use core::alloc::Layout;

    use super::*;

    fn geometry_of(item_size: usize) -> ItemGeometry {
        ItemGeometry::new(Layout::from_size_align(item_size, 1).unwrap()).unwrap()
    }

    /// Sorts `bytes` as items of `item_size` bytes, comparing by the first byte only.
    fn sort_by_first_byte(bytes: &mut [u8], item_size: usize) -> usize {
        let geometry = geometry_of(item_size);
        let len = bytes.len() / item_size;
        let mut scratch = vec![0_u8; bytes.len()];
        let mut comparisons = 0_usize;

        let mut compare = |a: NonNull<u8>, b: NonNull<u8>| {
            comparisons += 1;
            unsafe { a.read().cmp(&b.read()) }
        };

        unsafe {
            merge_sort(
                &geometry,
                NonNull::from(&mut *bytes).cast::<u8>(),
                NonNull::from(scratch.as_mut_slice()).cast::<u8>(),
                len,
                &mut compare,
            );
        }

        comparisons
    }

    #[test]
    fn sorts_single_byte_items() {
        let mut items = [5_u8, 2, 8, 1, 9, 3];

        sort_by_first_byte(&mut items, 1);

        assert_eq!(items, [1, 2, 3, 5, 8, 9]);
    }

    #[test]
    fn empty_and_single_item_need_no_comparisons() {
        let mut empty: [u8; 0] = [];
        assert_eq!(sort_by_first_byte(&mut empty, 1), 0);

        let mut single = [42_u8];
        assert_eq!(sort_by_first_byte(&mut single, 1), 0);
        assert_eq!(single, [42]);
    }

    #[test]
    fn equal_keys_keep_input_order() {
        // Each item is (key, tag); sorting looks only at the key.
        let mut items = [3_u8, 0, 1, 1, 3, 2, 1, 3, 2, 4, 1, 5, 3, 6];

        sort_by_first_byte(&mut items, 2);

        assert_eq!(items, [1, 1, 1, 3, 1, 5, 2, 4, 3, 0, 3, 2, 3, 6]);
    }

    #[test]
    fn already_sorted_and_reversed_inputs() {
        let mut ascending: Vec<u8> = (0..37).collect();
        sort_by_first_byte(&mut ascending, 1);
        assert_eq!(ascending, (0..37).collect::<Vec<u8>>());

        let mut descending: Vec<u8> = (0..37).rev().collect();
        sort_by_first_byte(&mut descending, 1);
        assert_eq!(descending, (0..37).collect::<Vec<u8>>());
    }

    #[test]
    fn matches_slice_sort_for_odd_lengths() {
        // A simple linear congruential sequence gives repeatable, unordered input with
        // plenty of duplicate keys.
        let mut state = 0x2545_f491_u32;

        for len in [3_usize, 7, 13, 31, 64, 100] {
            let mut items: Vec<u8> = (0..len)
                .map(|_| {
                    state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                    (state >> 24) as u8 % 16
                })
                .collect();

            let mut expected = items.clone();
            expected.sort_unstable();

            sort_by_first_byte(&mut items, 1);

            assert_eq!(items, expected, "length {len}");
        }
    }

    #[test]
    fn comparison_count_is_bounded_by_n_log_n() {
        let mut items: Vec<u8> = (0..128_u32).map(|i| (i * 37 % 128) as u8).collect();

        let comparisons = sort_by_first_byte(&mut items, 1);

        // 128 items, 7 passes, at most 127 comparisons per pass.
        assert!(comparisons <= 7 * 127, "{comparisons} comparisons");
        assert!(items.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
