//! Concurrent Memoization
//!
//! Thread-safe memoizing caches, available with the `concurrent` feature.
//!
//! # Why Mutex Instead of RwLock?
//!
//! Every hit moves its entry to the most recently used end of the recency
//! list, so even lookups mutate the store. An `RwLock` would hand out write
//! locks for every call anyway. `parking_lot::Mutex` has less bookkeeping and
//! makes the mutual exclusion explicit.
//!
//! # Single-Flight
//!
//! The lock is never held while the wrapped function runs. Instead, the first
//! caller to miss on a key registers an in-flight computation and everybody
//! else asking for that key waits for it, so a slow function is not run
//! several times for the same arguments.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConcurrentMemoizingCache`] | One lock, single-flight misses, any [`EvictionPolicy`](crate::policy::EvictionPolicy) |

mod flight;
pub mod memo;

pub use self::memo::ConcurrentMemoizingCache;
