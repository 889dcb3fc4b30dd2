use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locking discipline of a [`RingBuffer`](crate::RingBuffer), chosen at
/// construction.
///
/// The policy guards each composite operation in its entirety, which is what
/// preserves the all-or-nothing contract under sharing. Implementations are
/// types, not runtime branches: the no-op policy must compile down to no
/// instruction.
pub trait LockPolicy: Default {
    type Guard<'a>
    where
        Self: 'a;

    /// Acquire for the duration of one composite operation.
    fn acquire(&self) -> Self::Guard<'_>;
}

/// No-op policy for externally serialized access.
///
/// A ring with this policy is `Send` but deliberately not `Sync`: the
/// compiler enforces the caller's serialization promise.
#[derive(Debug, Default)]
pub struct NoLock;

impl LockPolicy for NoLock {
    type Guard<'a>
        = ()
    where
        Self: 'a;

    #[inline(always)]
    fn acquire(&self) {}
}

/// Mutex policy for rings shared by multiple writers and/or readers.
///
/// The lock is held across the whole composite operation; a poisoned lock is
/// ignored (ring state is position arithmetic, valid after any unwind).
#[derive(Debug, Default)]
pub struct MutexLock {
    inner: Mutex<()>,
}

impl LockPolicy for MutexLock {
    type Guard<'a>
        = MutexGuard<'a, ()>
    where
        Self: 'a;

    #[inline]
    fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
