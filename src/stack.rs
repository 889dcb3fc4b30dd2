use crate::backoff::Backoff;
use crate::freelist::{FreeList, Node, PoolError};
use crate::stats::{ContainerStats, FreeListStats};
use crate::tagged::{Tagged, TaggedCell};
use crossbeam_utils::CachePadded;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI64, Ordering};

/// Lock-free LIFO stack.
///
/// Nodes are recycled through an embedded [`FreeList`]; the top cell is a
/// tagged 128-bit atom, so a pop CAS cannot succeed against a superseded
/// observation even when the recycler hands the same node back out.
///
/// Both `push` and `pop` are lock-free: a failed CAS always means another
/// thread's operation committed.
pub struct Stack<T> {
    top: CachePadded<TaggedCell<Node<T>>>,
    size: CachePadded<AtomicI64>,
    pool: FreeList<T>,
}

unsafe impl<T: Send> Send for Stack<T> {}
unsafe impl<T: Send> Sync for Stack<T> {}

impl<T> Stack<T> {
    pub fn new() -> Self {
        Self {
            top: CachePadded::new(TaggedCell::new(Tagged::null())),
            size: CachePadded::new(AtomicI64::new(0)),
            pool: FreeList::with_placement(),
        }
    }

    /// Insert `value` as the new top.
    pub fn push(&self, value: T) -> Result<(), PoolError> {
        let node = self.pool.alloc_node()?;
        unsafe { node.as_ref().write(value) };

        let mut backoff = Backoff::new();
        loop {
            let cur = self.top.load();
            // The node is freshly owned; linking it is invisible until the CAS.
            unsafe { node.as_ref() }.next().store(cur.ptr, Ordering::Relaxed);
            if self.top.cas(cur, cur.bump(node.as_ptr())) {
                break;
            }
            backoff.spin();
        }

        self.size.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Remove and return the top value, or `None` when the stack is
    /// observably empty.
    pub fn pop(&self) -> Option<T> {
        // Speculative claim: decrement first; a negative result means empty.
        // The re-increment reconciles the dip before reporting, tolerating a
        // pusher whose size increment has not yet retired.
        if self.size.fetch_sub(1, Ordering::AcqRel) - 1 < 0 {
            self.size.fetch_add(1, Ordering::AcqRel);
            return None;
        }

        let mut backoff = Backoff::new();
        loop {
            let cur = self.top.load();
            let Some(node) = NonNull::new(cur.ptr) else {
                // Covered claim: a push has committed but not yet linked in
                // our view, or racing poppers are mid-unlink. Wait it out.
                backoff.snooze();
                continue;
            };
            // `node` may already be recycled by a racing pop; its storage
            // stays valid and the tagged CAS below rejects the stale view.
            let next = unsafe { node.as_ref() }.next().load(Ordering::Acquire);
            if self.top.cas(cur, cur.bump(next)) {
                // The node is exclusively ours: move the value out, then
                // return the storage.
                let slot = unsafe { node.as_ref().read_slot() };
                unsafe { self.pool.free_node(node) };
                return Some(unsafe { slot.assume_init() });
            }
            backoff.spin();
        }
    }

    /// Size hint; not a synchronization point.
    pub fn size(&self) -> i64 {
        self.size.load(Ordering::Relaxed).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            size: self.size(),
            unique_count: self.top.tag(),
        }
    }

    /// Counters of the embedded node recycler.
    pub fn pool_stats(&self) -> FreeListStats {
        self.pool.stats()
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Stack<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
