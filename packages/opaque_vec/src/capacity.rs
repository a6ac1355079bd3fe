//! Capacity policy: how much to grow by, and when and how far to shrink.
//!
//! These are pure functions of the current capacity and length so the policy can be
//! reasoned about (and tested) separately from the memory relocation that applies it.

use core::cmp;

/// The capacity a vector starts with when no initial capacity is requested.
///
/// Automatic shrinking, [`shrink_to_fit()`][crate::OpaqueVec::shrink_to_fit] and
/// [`clear()`][crate::OpaqueVec::clear] never reduce the capacity below this value.
pub const DEFAULT_CAPACITY: usize = 4;

/// Resolves the requested initial capacity, with zero meaning "use the default".
#[must_use]
pub(crate) fn initial_capacity(requested: usize) -> usize {
    if requested == 0 {
        DEFAULT_CAPACITY
    } else {
        requested
    }
}

/// Whether `additional` more items do not fit into the current capacity.
#[must_use]
pub(crate) fn needs_growth(capacity: usize, len: usize, additional: usize) -> bool {
    debug_assert!(len <= capacity);

    // Cannot underflow because length never exceeds capacity.
    capacity.wrapping_sub(len) < additional
}

/// Which growth rule an insertion follows when its items do not fit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Growth {
    /// A single-item operation (`push_back`, `push_front`, `insert`).
    Item,

    /// A block operation, regardless of how many items the block holds.
    Block,
}

/// Returns the capacity to grow to when `additional` more items do not fit.
///
/// [`Growth::Item`] doubles the capacity. [`Growth::Block`] uses the larger of the doubled
/// capacity and twice the resulting length, so one large block does not trigger another
/// reallocation on the very next insertion.
///
/// Saturates at `usize::MAX` instead of overflowing. Such a capacity can never be
/// allocated, which the caller reports as an allocation failure.
#[must_use]
pub(crate) fn grown_capacity(
    capacity: usize,
    len: usize,
    additional: usize,
    growth: Growth,
) -> usize {
    let doubled = capacity.saturating_mul(2);

    match growth {
        Growth::Item => doubled,
        Growth::Block => {
            let fitted = len.saturating_add(additional).saturating_mul(2);
            cmp::max(doubled, fitted)
        }
    }
}

/// Returns the reduced capacity to apply after a removal, or `None` if the vector is
/// still at least half full or already at the capacity floor.
#[must_use]
pub(crate) fn shrunk_capacity_after_removal(capacity: usize, len: usize) -> Option<usize> {
    if capacity > DEFAULT_CAPACITY && capacity > len.saturating_mul(2) {
        Some(cmp::max(len, DEFAULT_CAPACITY))
    } else {
        None
    }
}

/// Returns the capacity that exactly fits `len` items (respecting the floor), or `None`
/// if there is no excess capacity to release.
#[must_use]
pub(crate) fn fitted_capacity(capacity: usize, len: usize) -> Option<usize> {
    if capacity > DEFAULT_CAPACITY && capacity > len {
        Some(cmp::max(len, DEFAULT_CAPACITY))
    } else {
        None
    }
}

/// Returns the capacity to reset to when the vector is cleared, or `None` if the
/// capacity is already at or below the default.
#[must_use]
pub(crate) fn cleared_capacity(capacity: usize) -> Option<usize> {
    (capacity > DEFAULT_CAPACITY).then_some(DEFAULT_CAPACITY)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::integer_division,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use super::*;

    #[test]
    fn initial_capacity_zero_means_default() {
        assert_eq!(initial_capacity(0), DEFAULT_CAPACITY);
        assert_eq!(initial_capacity(1), 1);
        assert_eq!(initial_capacity(100), 100);
    }

    #[test]
    fn growth_only_when_items_do_not_fit() {
        assert!(!needs_growth(4, 0, 4));
        assert!(!needs_growth(4, 3, 1));
        assert!(!needs_growth(10, 5, 5));

        assert!(needs_growth(4, 4, 1));
        assert!(needs_growth(4, 3, 2));
        assert!(needs_growth(10, 5, 6));
    }

    #[test]
    fn single_item_growth_doubles_exactly() {
        assert_eq!(grown_capacity(4, 4, 1, Growth::Item), 8);
        assert_eq!(grown_capacity(5, 5, 1, Growth::Item), 10);
        assert_eq!(grown_capacity(1, 1, 1, Growth::Item), 2);
    }

    #[test]
    fn block_growth_uses_larger_of_doubling_and_twice_fitted() {
        assert_eq!(grown_capacity(8, 7, 2, Growth::Block), 18);
        assert_eq!(grown_capacity(4, 3, 10, Growth::Block), 26);
        assert_eq!(grown_capacity(4, 4, 2, Growth::Block), 12);

        // Doubling wins when the capacity is large relative to the length.
        assert_eq!(grown_capacity(100, 10, 2, Growth::Block), 200);
    }

    #[test]
    fn one_item_block_still_uses_block_growth() {
        assert_eq!(grown_capacity(4, 4, 1, Growth::Block), 10);
        assert_eq!(grown_capacity(1, 1, 1, Growth::Block), 4);

        // Doubling still wins when it is larger.
        assert_eq!(grown_capacity(100, 10, 1, Growth::Block), 200);
    }

    #[test]
    fn growth_saturates_instead_of_overflowing() {
        assert_eq!(
            grown_capacity(usize::MAX, usize::MAX, 1, Growth::Item),
            usize::MAX
        );
        assert_eq!(
            grown_capacity(usize::MAX / 2 + 1, usize::MAX / 2 + 1, 1, Growth::Item),
            usize::MAX
        );
        assert_eq!(
            grown_capacity(usize::MAX / 2 + 1, usize::MAX / 2 + 1, 1, Growth::Block),
            usize::MAX
        );
        assert_eq!(grown_capacity(4, 4, usize::MAX, Growth::Block), usize::MAX);
    }

    #[test]
    fn shrink_after_removal_only_below_half() {
        assert_eq!(shrunk_capacity_after_removal(16, 8), None);
        assert_eq!(shrunk_capacity_after_removal(16, 7), Some(7));
        assert_eq!(shrunk_capacity_after_removal(16, 0), Some(DEFAULT_CAPACITY));
        assert_eq!(shrunk_capacity_after_removal(16, 2), Some(DEFAULT_CAPACITY));
    }

    #[test]
    fn shrink_after_removal_respects_floor() {
        assert_eq!(shrunk_capacity_after_removal(DEFAULT_CAPACITY, 0), None);
        assert_eq!(shrunk_capacity_after_removal(2, 0), None);
        assert_eq!(shrunk_capacity_after_removal(5, 1), Some(DEFAULT_CAPACITY));
    }

    #[test]
    fn fitted_capacity_releases_any_excess() {
        assert_eq!(fitted_capacity(16, 15), Some(15));
        assert_eq!(fitted_capacity(16, 16), None);
        assert_eq!(fitted_capacity(16, 1), Some(DEFAULT_CAPACITY));
        assert_eq!(fitted_capacity(DEFAULT_CAPACITY, 0), None);
    }

    #[test]
    fn cleared_capacity_resets_to_default() {
        assert_eq!(cleared_capacity(64), Some(DEFAULT_CAPACITY));
        assert_eq!(cleared_capacity(DEFAULT_CAPACITY), None);
        assert_eq!(cleared_capacity(1), None);
    }
}
