//! Debug assertion macros for the slot ring invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead on the release-build hot path.

// =============================================================================
// Bounded count: 0 ≤ (tail - head) ≤ capacity
// =============================================================================

/// Assert that the item count never exceeds the ring capacity.
///
/// Used after a producer reserves a tail index. A violation here means a
/// caller pushed more pointers into the pool than it ever handed out
/// (double release) on the unbounded enqueue path.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded count violated: {} items in a ring of {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// Monotonic progress: counters only move forward (modulo u32 wrap)
// =============================================================================

/// Assert that a 32-bit position counter advanced, using wrapping distance.
///
/// The counters wrap every 2^32 operations per slot; a forward step has a
/// small wrapping delta while a backward step shows up as a huge one.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new.wrapping_sub($old) < u32::MAX / 2,
            "{} moved backwards: {} -> {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// Published entries are never null
// =============================================================================

/// Assert that a consumable entry holds a real pointer.
///
/// A producer always stores the entry before publishing its epoch tag, so a
/// consumer that observed `ages[i] == head` must find a non-null pointer.
macro_rules! debug_assert_published_entry {
    ($ptr:expr, $epoch:expr) => {
        debug_assert!(
            !$ptr.is_null(),
            "null entry published at epoch {}",
            $epoch
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_published_entry;
