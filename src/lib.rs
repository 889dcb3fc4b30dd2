//! lockring — concurrent in-process building blocks for server runtimes.
//!
//! Two families share one ABA-avoidance discipline:
//!
//! - **Lock-free containers**: a node recycler ([`FreeList`]), a LIFO
//!   [`Stack`] and a FIFO [`Queue`] (Michael–Scott with a dummy head), all
//!   coordinating through 16-byte `{pointer, tag}` cells mutated only by
//!   double-width compare-and-swap. Every operation is lock-free: a failed
//!   CAS always means another thread committed.
//! - **A byte ring** ([`RingBuffer`]): all-or-nothing enqueue/dequeue,
//!   restartable peek and explicit consume, parameterized by a locking
//!   policy — [`NoLock`] for externally serialized use, [`MutexLock`] for
//!   shared use.
//!
//! A [`ShardedPool`] layers per-thread hot/cold caches over sharded free
//! lists for allocation-heavy callers.
//!
//! # Example
//!
//! ```
//! use lockring::{Queue, RingBuffer, NoLock};
//!
//! let queue = Queue::new();
//! queue.enqueue(1u64).unwrap();
//! queue.enqueue(2).unwrap();
//! assert_eq!(queue.dequeue(), Some(1));
//! assert_eq!(queue.dequeue(), Some(2));
//!
//! let ring = RingBuffer::<NoLock>::with_capacity(1024);
//! assert_eq!(ring.enqueue(b"frame"), 5);
//! let mut out = [0u8; 5];
//! assert_eq!(ring.dequeue(&mut out), 5);
//! assert_eq!(&out, b"frame");
//! ```

mod backoff;
mod freelist;
mod invariants;
mod policy;
mod pool;
mod queue;
mod ring;
mod stack;
mod stats;
mod tagged;

pub use backoff::Backoff;
pub use freelist::{FreeList, PoolError};
pub use policy::{LockPolicy, MutexLock, NoLock};
pub use pool::{PoolConfig, PoolHandle, ShardedPool};
pub use queue::Queue;
pub use ring::{RingBuffer, DEFAULT_RING_CAPACITY};
pub use stack::Stack;
pub use stats::{ContainerStats, FreeListStats};
