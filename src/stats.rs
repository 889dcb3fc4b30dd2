/// Counter snapshot of a [`FreeList`](crate::FreeList).
///
/// `alloc_count` and `use_count` are authoritative at rest
/// (`0 <= use_count <= alloc_count`); under contention they are hints.
/// `unique_count` is the head cell's tag — the total number of successful
/// mutations of the free list, useful for observing churn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreeListStats {
    /// Nodes ever minted from the allocator.
    pub alloc_count: i64,
    /// Nodes currently handed out.
    pub use_count: i64,
    /// Tag churn of the head cell.
    pub unique_count: u64,
}

/// Counter snapshot of a [`Stack`](crate::Stack) or [`Queue`](crate::Queue).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// Size hint; exact only when externally quiesced.
    pub size: i64,
    /// Tag churn of the head (stack: top) cell.
    pub unique_count: u64,
}
