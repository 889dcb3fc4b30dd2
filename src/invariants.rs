//! Debug assertion macros for container invariants.
//!
//! Active only in debug builds, so there is zero overhead in release builds.

// =============================================================================
// INV-RING-01: Conservation
// =============================================================================

/// Assert the ring's one-reserved-slot accounting.
///
/// **Invariant**: `used + free = capacity - 1` for every valid ring at rest.
///
/// Used in: every ring mutator, after the position update.
macro_rules! debug_assert_ring_conservation {
    ($used:expr, $free:expr, $capacity:expr) => {
        debug_assert!(
            $capacity == 0 || $used + $free == $capacity - 1,
            "ring conservation violated: used {} + free {} != capacity {} - 1",
            $used,
            $free,
            $capacity
        )
    };
}

// =============================================================================
// INV-RING-02: All-or-nothing
// =============================================================================

/// Assert that a composite ring operation reported either the full requested
/// size or zero — partial counts are forbidden.
macro_rules! debug_assert_all_or_nothing {
    ($returned:expr, $requested:expr) => {
        debug_assert!(
            $returned == 0 || $returned == $requested,
            "partial ring operation: returned {} of {}",
            $returned,
            $requested
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_all_or_nothing;
pub(crate) use debug_assert_ring_conservation;
