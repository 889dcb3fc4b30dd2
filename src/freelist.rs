use crate::backoff::Backoff;
use crate::stats::FreeListStats;
use crate::tagged::{Tagged, TaggedCell};
use crossbeam_utils::CachePadded;
use std::alloc::{alloc, dealloc, Layout};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicI64, AtomicPtr, Ordering};
use thiserror::Error;

/// Error type for node allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The allocator could not serve a fresh node.
    #[error("node allocation failed")]
    OutOfMemory,
}

// =============================================================================
// NODE
// =============================================================================

/// A heap-resident record carrying one value slot and one outgoing link.
///
/// `value` is the first field of a `repr(C)` struct, so a pointer to the
/// value and a pointer to its node coincide; the typed surface hands out
/// value pointers and recovers the node by casting back.
///
/// A node is owned exclusively by the free list while idle and by whichever
/// structure currently references it while live. Its storage is released
/// only at free-list teardown — never mid-run — so a stale traversal through
/// a recycled node reads valid memory, and the tagged CAS rejects any
/// decision based on what it saw.
#[repr(C)]
pub(crate) struct Node<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    #[inline]
    pub(crate) fn next(&self) -> &AtomicPtr<Node<T>> {
        &self.next
    }

    /// Pointer to the value slot.
    #[inline]
    pub(crate) fn value_ptr(&self) -> *mut T {
        self.value.get().cast()
    }

    /// Move a value into the slot.
    ///
    /// # Safety
    /// The caller must own the slot's vacancy (a node it just obtained).
    #[inline]
    pub(crate) unsafe fn write(&self, value: T) {
        (*self.value.get()).write(value);
    }

    /// Bitwise copy of the slot.
    ///
    /// The copy carries no ownership and no validity claim; callers
    /// `assume_init` it only after winning the CAS that transfers the value
    /// to them, and forget it otherwise.
    #[inline]
    pub(crate) unsafe fn read_slot(&self) -> MaybeUninit<T> {
        ptr::read(self.value.get())
    }
}

// =============================================================================
// FREE LIST
// =============================================================================

/// Lock-free node recycler.
///
/// `alloc` pops an idle node from a tagged LIFO or mints one from the global
/// allocator; `free` links a node back in. The claim protocol makes the pop
/// loop total for the claimant: `use_count` is incremented *before* deciding
/// between pop and mint, so a claim covered by `alloc_count` is guaranteed a
/// node on (or in flight to) the list.
///
/// With placement mode on, the contained value is constructed on `alloc` and
/// destroyed on `free`; otherwise a node's value is constructed once when
/// the node is minted and persists for the node's entire lifetime.
pub struct FreeList<T> {
    head: CachePadded<TaggedCell<Node<T>>>,
    alloc_count: CachePadded<AtomicI64>,
    use_count: CachePadded<AtomicI64>,
    placement: bool,
}

// Safety: nodes only migrate between threads through the tagged head cell,
// whose CAS is the release/acquire pair.
unsafe impl<T: Send> Send for FreeList<T> {}
unsafe impl<T: Send> Sync for FreeList<T> {}

impl<T> FreeList<T> {
    /// A recycler whose node values persist across tenures.
    pub fn new() -> Self {
        Self::with_mode(false)
    }

    /// A recycler that constructs the value on `alloc` and drops it on
    /// `free`.
    pub fn with_placement() -> Self {
        Self::with_mode(true)
    }

    fn with_mode(placement: bool) -> Self {
        Self {
            head: CachePadded::new(TaggedCell::new(Tagged::null())),
            alloc_count: CachePadded::new(AtomicI64::new(0)),
            use_count: CachePadded::new(AtomicI64::new(0)),
            placement,
        }
    }

    /// Counter snapshot. `unique_count` is the head cell's tag.
    pub fn stats(&self) -> FreeListStats {
        FreeListStats {
            alloc_count: self.alloc_count.load(Ordering::Relaxed),
            use_count: self.use_count.load(Ordering::Relaxed),
            unique_count: self.head.tag(),
        }
    }

    // -------------------------------------------------------------------------
    // Raw node surface (stack/queue): value slots are the caller's business.
    // -------------------------------------------------------------------------

    /// Obtain a node whose slot content is unspecified. The caller must write
    /// the slot before reading it and vacate it before [`free_node`].
    ///
    /// [`free_node`]: Self::free_node
    pub(crate) fn alloc_node(&self) -> Result<NonNull<Node<T>>, PoolError> {
        self.obtain().map(|(node, _)| node)
    }

    /// Link a node back into the free list. Decrements `use_count` after the
    /// link-in succeeds.
    ///
    /// # Safety
    /// `node` must have been obtained from this free list, must not be
    /// reachable from any container, and its slot must be vacated.
    pub(crate) unsafe fn free_node(&self, node: NonNull<Node<T>>) {
        let mut backoff = Backoff::new();
        loop {
            let cur = self.head.load();
            // Publish the link through the CAS below; success is a release.
            node.as_ref().next.store(cur.ptr, Ordering::Relaxed);
            if self.head.cas(cur, cur.bump(node.as_ptr())) {
                break;
            }
            backoff.spin();
        }
        self.use_count.fetch_sub(1, Ordering::AcqRel);
    }

    /// Claim a node: pop when the claim is covered, mint otherwise.
    fn obtain(&self) -> Result<(NonNull<Node<T>>, bool), PoolError> {
        let claim = self.use_count.fetch_add(1, Ordering::AcqRel) + 1;
        if claim <= self.alloc_count.load(Ordering::Acquire) {
            Ok((self.pop_claimed(), false))
        } else {
            match self.mint() {
                Ok(node) => Ok((node, true)),
                Err(err) => {
                    self.use_count.fetch_sub(1, Ordering::AcqRel);
                    Err(err)
                }
            }
        }
    }

    /// Pop the head node. Total for a covered claim: a transiently empty
    /// head means a `free_node` link-in is in flight.
    fn pop_claimed(&self) -> NonNull<Node<T>> {
        let mut backoff = Backoff::new();
        loop {
            let cur = self.head.load();
            let Some(node) = NonNull::new(cur.ptr) else {
                backoff.snooze();
                continue;
            };
            let next = unsafe { node.as_ref() }.next.load(Ordering::Acquire);
            if self.head.cas(cur, cur.bump(next)) {
                return node;
            }
            backoff.spin();
        }
    }

    /// Return a previously allocated `T` to the pool.
    ///
    /// # Safety
    /// `value` must have come from [`alloc`](Self::alloc) on this free list
    /// and must not be used after this call.
    pub unsafe fn free(&self, value: NonNull<T>) {
        // repr(C) with the value first: the value pointer is the node pointer.
        let node = value.cast::<Node<T>>();
        if self.placement {
            ptr::drop_in_place(value.as_ptr());
        }
        self.free_node(node);
    }

    /// Mint a fresh node from the global allocator. The value slot is left
    /// uninitialized; `alloc_count` is incremented once the storage exists.
    fn mint(&self) -> Result<NonNull<Node<T>>, PoolError> {
        let layout = Layout::new::<Node<T>>();
        // SAFETY: Node always contains the link, so the layout is non-zero.
        let raw = unsafe { alloc(layout) }.cast::<Node<T>>();
        let Some(node) = NonNull::new(raw) else {
            return Err(PoolError::OutOfMemory);
        };
        unsafe {
            ptr::addr_of_mut!((*node.as_ptr()).next).write(AtomicPtr::new(ptr::null_mut()));
        }
        self.alloc_count.fetch_add(1, Ordering::AcqRel);
        Ok(node)
    }
}

impl<T: Default> FreeList<T> {
    /// Hand out a pointer to an unused `T`.
    ///
    /// Persistence mode: a recycled value is returned as the previous holder
    /// left it; a minted one starts at `T::default()`. Placement mode: the
    /// value is freshly constructed on every call.
    pub fn alloc(&self) -> Result<NonNull<T>, PoolError> {
        let (node, fresh) = self.obtain()?;
        unsafe {
            if fresh || self.placement {
                node.as_ref().write(T::default());
            }
            Ok(NonNull::new_unchecked(node.as_ref().value_ptr()))
        }
    }
}

impl<T> Default for FreeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for FreeList<T> {
    fn drop(&mut self) {
        // Teardown is externally serialized; outstanding pointers are the
        // caller's contract. Only idle nodes are reachable here.
        let layout = Layout::new::<Node<T>>();
        let mut cur = self.head.load().ptr;
        while let Some(node) = NonNull::new(cur) {
            unsafe {
                cur = node.as_ref().next.load(Ordering::Relaxed);
                if !self.placement {
                    // Persistent values live until teardown.
                    ptr::drop_in_place(node.as_ref().value_ptr());
                }
                dealloc(node.as_ptr().cast(), layout);
            }
        }
    }
}
