use crate::backoff::Backoff;
use crate::freelist::{FreeList, Node, PoolError};
use crate::stats::{ContainerStats, FreeListStats};
use crate::tagged::{Tagged, TaggedCell};
use crossbeam_utils::CachePadded;
use std::alloc::{handle_alloc_error, Layout};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicI64, Ordering};

/// Lock-free FIFO queue (Michael–Scott, dummy head, cooperative tail
/// advance).
///
/// A permanent dummy node sits between `head` and `tail`; the logical first
/// element is `head.ptr->next`. Enqueue links at the tail with a
/// pointer-only CAS on `next` (that pointer transitions monotonically from
/// null to a node), then publishes the new tail with a tagged CAS whose
/// outcome does not matter: any thread that observes a linked-but-
/// unpublished tail helps advance it before proceeding, so no operation
/// waits on another thread's scheduling.
///
/// Dequeue swings `head` forward with a tagged CAS and returns the
/// superseded dummy to the recycler; the node the value was read from
/// becomes the new dummy.
pub struct Queue<T> {
    head: CachePadded<TaggedCell<Node<T>>>,
    tail: CachePadded<TaggedCell<Node<T>>>,
    size: CachePadded<AtomicI64>,
    pool: FreeList<T>,
}

unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Queue<T> {
    pub fn new() -> Self {
        let pool = FreeList::with_placement();
        let dummy = match pool.alloc_node() {
            Ok(node) => node,
            Err(PoolError::OutOfMemory) => handle_alloc_error(Layout::new::<Node<T>>()),
        };
        unsafe { dummy.as_ref() }
            .next()
            .store(ptr::null_mut(), Ordering::Relaxed);

        let endpoint = Tagged {
            ptr: dummy.as_ptr(),
            tag: 0,
        };
        Self {
            head: CachePadded::new(TaggedCell::new(endpoint)),
            tail: CachePadded::new(TaggedCell::new(endpoint)),
            size: CachePadded::new(AtomicI64::new(0)),
            pool,
        }
    }

    /// Append `value` at the tail.
    pub fn enqueue(&self, value: T) -> Result<(), PoolError> {
        let node = self.pool.alloc_node()?;
        unsafe {
            node.as_ref().write(value);
            node.as_ref().next().store(ptr::null_mut(), Ordering::Relaxed);
        }

        let mut backoff = Backoff::new();
        loop {
            let tail = self.tail.load();
            // The tail pointer is never null; a stale tail node's storage
            // stays valid (recycler discipline) and its next read is atomic.
            let tail_node = unsafe { &*tail.ptr };
            let next = tail_node.next().load(Ordering::Acquire);

            if !next.is_null() {
                // Another enqueuer linked but has not yet advanced the tail:
                // help it along and retry.
                let _ = self.tail.cas(tail, tail.bump(next));
                continue;
            }

            if tail_node
                .next()
                .compare_exchange(
                    ptr::null_mut(),
                    node.as_ptr(),
                    Ordering::Release,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                // Linked: the enqueue is committed. Publish the tail; losing
                // this CAS is fine, a helper already moved it.
                let _ = self.tail.cas(tail, tail.bump(node.as_ptr()));
                break;
            }
            backoff.spin();
        }

        self.size.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Remove and return the head value, or `None` when no real nodes exist.
    pub fn dequeue(&self) -> Option<T> {
        // Speculative claim, as in the stack: reconcile a negative dip and
        // report empty.
        if self.size.fetch_sub(1, Ordering::AcqRel) - 1 < 0 {
            self.size.fetch_add(1, Ordering::AcqRel);
            return None;
        }

        let mut backoff = Backoff::new();
        loop {
            let tail = self.tail.load();
            let tail_next = unsafe { &*tail.ptr }.next().load(Ordering::Acquire);
            if !tail_next.is_null() {
                // Tail has fallen behind a committed enqueue: help first.
                let _ = self.tail.cas(tail, tail.bump(tail_next));
                continue;
            }

            let head = self.head.load();
            let first = unsafe { &*head.ptr }.next().load(Ordering::Acquire);
            let Some(first) = NonNull::new(first) else {
                // The claim says an element exists; its link is still in
                // flight. Spin until it becomes visible.
                backoff.snooze();
                continue;
            };

            // Copy the value BEFORE the CAS: once head moves, `first` is the
            // new dummy and the next dequeuer may vacate and recycle it. The
            // copy is bitwise and ownerless until the CAS succeeds.
            let slot = unsafe { first.as_ref().read_slot() };

            if self.head.cas(head, head.bump(first.as_ptr())) {
                // The superseded dummy is exclusively ours to recycle.
                unsafe {
                    self.pool
                        .free_node(NonNull::new_unchecked(head.ptr));
                }
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

    /// Drain every queued value.
    pub fn clear(&mut self) {
        while self.dequeue().is_some() {}
    }

    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            size: self.size(),
            unique_count: self.head.tag(),
        }
    }

    /// Counters of the embedded node recycler.
    pub fn pool_stats(&self) -> FreeListStats {
        self.pool.stats()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        self.clear();
        // After the drain head == tail == dummy; release it so the pool's
        // teardown sees every node idle.
        if let Some(dummy) = NonNull::new(self.head.load().ptr) {
            unsafe { self.pool.free_node(dummy) };
        }
    }
}
