use crate::invariants::{debug_assert_all_or_nothing, debug_assert_ring_conservation};
use crate::policy::{LockPolicy, MutexLock, NoLock};
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default ring capacity in bytes.
pub const DEFAULT_RING_CAPACITY: usize = 65536;

// =============================================================================
// SERIALIZATION & ALL-OR-NOTHING CONTRACT
// =============================================================================
//
// The ring's contract is serialized access: concurrency is supplied by the
// locking policy, not by the ring itself. Every composite operation either
// completes at exactly its requested size or leaves the ring untouched and
// returns zero — a partial copy is never observable, because the size gate
// runs under the same guard as the copy and the position update.
//
// One slot is deliberately reserved so that `read == write` unambiguously
// means empty; usable capacity is therefore `capacity - 1`.
//
// Positions are relaxed atomics rather than plain cells so that the
// `data_size`/`free_size` hints stay well-defined reads when a mutex-policy
// ring is polled without the lock. They are exact only under external
// serialization, which is the no-op policy's case.
//
// =============================================================================

/// Byte ring buffer with all-or-nothing enqueue/dequeue, restartable peek
/// and explicit consume.
///
/// `P` selects the locking discipline: [`NoLock`] for externally serialized
/// use, [`MutexLock`] for shared use.
pub struct RingBuffer<P: LockPolicy = NoLock> {
    buf: UnsafeCell<Box<[u8]>>,
    capacity: usize,
    read: AtomicUsize,
    write: AtomicUsize,
    lock: P,
}

// Safety: the mutex policy serializes every buffer and position access.
unsafe impl Sync for RingBuffer<MutexLock> {}

impl<P: LockPolicy> RingBuffer<P> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RING_CAPACITY)
    }

    /// A ring of `capacity` bytes, of which `capacity - 1` are usable.
    ///
    /// A zero capacity yields a permanently invalid ring: every operation
    /// returns 0 and [`is_valid`](Self::is_valid) is false.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
            capacity,
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
            lock: P::default(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.capacity > 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently stored. A hint unless access is serialized.
    pub fn data_size(&self) -> usize {
        let r = self.read.load(Ordering::Relaxed);
        let w = self.write.load(Ordering::Relaxed);
        if w >= r {
            w - r
        } else {
            self.capacity - r + w
        }
    }

    /// Bytes currently free. A hint unless access is serialized.
    pub fn free_size(&self) -> usize {
        if self.capacity == 0 {
            return 0;
        }
        let used = self.data_size();
        if used >= self.capacity - 1 {
            0
        } else {
            self.capacity - used - 1
        }
    }

    /// Copy all of `src` in, or nothing.
    ///
    /// Returns `src.len()` on success, 0 when free space is insufficient or
    /// the arguments are invalid.
    pub fn enqueue(&self, src: &[u8]) -> usize {
        if src.is_empty() || !self.is_valid() {
            return 0;
        }
        let _guard = self.lock.acquire();

        let n = src.len();
        if self.free_size() < n {
            debug_assert_all_or_nothing!(0, n);
            return 0;
        }

        let w = self.write.load(Ordering::Relaxed);
        let first = n.min(self.capacity - w);
        // SAFETY: the guard serializes buffer access; both segments are in
        // bounds and disjoint from `src`.
        unsafe {
            let base = (*self.buf.get()).as_mut_ptr();
            ptr::copy_nonoverlapping(src.as_ptr(), base.add(w), first);
            if n > first {
                ptr::copy_nonoverlapping(src.as_ptr().add(first), base, n - first);
            }
        }
        self.write.store((w + n) % self.capacity, Ordering::Relaxed);

        debug_assert_ring_conservation!(self.data_size(), self.free_size(), self.capacity);
        n
    }

    /// Copy exactly `dst.len()` bytes out and advance the read position, or
    /// do nothing.
    pub fn dequeue(&self, dst: &mut [u8]) -> usize {
        if dst.is_empty() || !self.is_valid() {
            return 0;
        }
        let _guard = self.lock.acquire();

        let n = dst.len();
        if self.data_size() < n {
            debug_assert_all_or_nothing!(0, n);
            return 0;
        }

        unsafe { self.copy_out(dst) };
        let r = self.read.load(Ordering::Relaxed);
        self.read.store((r + n) % self.capacity, Ordering::Relaxed);

        debug_assert_ring_conservation!(self.data_size(), self.free_size(), self.capacity);
        n
    }

    /// Copy exactly `dst.len()` bytes out without advancing the read
    /// position, or do nothing. Restartable: repeated peeks see the same
    /// bytes.
    pub fn peek(&self, dst: &mut [u8]) -> usize {
        if dst.is_empty() || !self.is_valid() {
            return 0;
        }
        let _guard = self.lock.acquire();

        let n = dst.len();
        if self.data_size() < n {
            debug_assert_all_or_nothing!(0, n);
            return 0;
        }

        unsafe { self.copy_out(dst) };
        n
    }

    /// Discard exactly `n` bytes, or nothing.
    pub fn consume(&self, n: usize) -> usize {
        if n == 0 || !self.is_valid() {
            return 0;
        }
        let _guard = self.lock.acquire();

        if self.data_size() < n {
            debug_assert_all_or_nothing!(0, n);
            return 0;
        }

        let r = self.read.load(Ordering::Relaxed);
        self.read.store((r + n) % self.capacity, Ordering::Relaxed);

        debug_assert_ring_conservation!(self.data_size(), self.free_size(), self.capacity);
        n
    }

    /// Reset to empty.
    pub fn clear(&self) {
        if !self.is_valid() {
            return;
        }
        let _guard = self.lock.acquire();
        self.read.store(0, Ordering::Relaxed);
        self.write.store(0, Ordering::Relaxed);
    }

    /// Shared copy-out of `peek` and `dequeue`: up to two contiguous
    /// segments, far end first.
    ///
    /// # Safety
    /// Caller holds the guard and has checked `data_size() >= dst.len()`.
    unsafe fn copy_out(&self, dst: &mut [u8]) {
        let r = self.read.load(Ordering::Relaxed);
        let n = dst.len();
        let first = n.min(self.capacity - r);
        let base = (*self.buf.get()).as_ptr();
        ptr::copy_nonoverlapping(base.add(r), dst.as_mut_ptr(), first);
        if n > first {
            ptr::copy_nonoverlapping(base, dst.as_mut_ptr().add(first), n - first);
        }
    }
}

impl<P: LockPolicy> Default for RingBuffer<P> {
    fn default() -> Self {
        Self::new()
    }
}
