#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Call Flow
//!
//! ```text
//!   Args ──▶ KeyCodec ──▶ Key ──▶ EntryStore ──hit──▶ clone of V
//!                                     │
//!                                    miss
//!                                     ▼
//!                               f(&Args) ──▶ insert ──▶ EvictionPolicy picks victim
//!                                                         when the store is full
//!   StatsCollector counts hits, misses and evictions along the way.
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Role |
//! |------|------|
//! | [`MemoizingCache`] | Single-threaded memoizing wrapper |
//! | [`ConcurrentMemoizingCache`] | Thread-safe wrapper with single-flight misses (`concurrent` feature) |
//! | [`Args`] / [`Arg`] | Dynamic call arguments |
//! | [`KeyCodec`] / [`Key`] | Normalizes arguments into hashable keys |
//! | [`EntryStore`] | Bounded hash index plus recency list |
//! | [`LruPolicy`], [`FifoPolicy`], [`LfuPolicy`] | Eviction policies |
//! | [`Stats`] | Hit, miss and eviction counters |
//!
//! ## Numeric Keys
//!
//! By default arguments that compare equal share a key, whatever their type:
//!
//! ```rust
//! use memo_rs::{Args, MemoizingCache};
//! use core::convert::Infallible;
//!
//! let mut cache = MemoizingCache::new(|args: &Args| Ok::<_, Infallible>(args.len()), Some(8), false).unwrap();
//! cache.call(&Args::new().arg(1)).unwrap();
//! cache.call(&Args::new().arg(1.0)).unwrap();
//! cache.call(&Args::new().arg(true)).unwrap();
//! assert_eq!(cache.cache_info().hits, 2);
//! ```
//!
//! With `distinguish_types` each of those is its own entry:
//!
//! ```rust
//! use memo_rs::{Args, MemoizingCache};
//! use core::convert::Infallible;
//!
//! let mut cache = MemoizingCache::new(|args: &Args| Ok::<_, Infallible>(args.len()), Some(8), true).unwrap();
//! cache.call(&Args::new().arg(1)).unwrap();
//! cache.call(&Args::new().arg(1.0)).unwrap();
//! assert_eq!(cache.cache_info().misses, 2);
//! ```
//!
//! ## Mutable Arguments
//!
//! Lists and maps are rejected as keys. Freeze them to cache by value:
//!
//! ```rust
//! use memo_rs::{Arg, Args, CallError, MemoizingCache};
//! use core::convert::Infallible;
//!
//! let mut cache = MemoizingCache::new(|args: &Args| Ok::<_, Infallible>(args.len()), None, false).unwrap();
//! let args = Args::new().arg(Arg::list([1, 2, 3]));
//!
//! assert!(matches!(cache.call(&args), Err(CallError::BadKey(_))));
//! assert_eq!(cache.call(&args.freeze()).unwrap(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`key`]: Argument model and key normalization
//! - [`store`]: Capacity-bounded entry store
//! - [`policy`]: Eviction policies and the recency view they read
//! - [`memo`]: The memoizing façade
//! - [`config`]: Configuration structures
//! - [`metrics`]: Statistics collection and reporting
//! - [`error`]: Error types
//! - [`concurrent`]: Thread-safe façade (requires `concurrent` feature)

#![no_std]

extern crate alloc;

#[cfg(not(feature = "hashbrown"))]
extern crate std;

/// Cache entry type.
///
/// Holds the key, the cached value, and the logical-clock metadata eviction
/// policies read.
pub mod entry;

/// Doubly linked list implementation with in-place editing capabilities.
///
/// **Note**: This module is internal infrastructure. It exposes unsafe raw
/// pointer operations that require careful invariant maintenance.
pub(crate) mod list;

/// Dynamic call arguments and their normalization into cache keys.
pub mod key;

/// Error types.
pub mod error;

/// Cache configuration structures.
pub mod config;

/// Eviction policies.
///
/// A policy reads the store's recency order and names the entry to evict.
pub mod policy;

/// Capacity-bounded key/value store with a strict recency order.
pub mod store;

/// Cache metrics system.
///
/// Hit, miss and eviction counters plus a uniform `BTreeMap` report.
pub mod metrics;

/// Single-threaded memoizing cache.
pub mod memo;

/// Concurrent memoizing cache.
///
/// One lock around store, statistics and in-flight table; the wrapped
/// function runs outside it with single-flight deduplication.
///
/// Available when the `concurrent` feature is enabled.
#[cfg(feature = "concurrent")]
pub mod concurrent;

pub use config::{Capacity, MemoConfig};
pub use entry::{CacheEntry, EntryMeta};
pub use error::{ArgPosition, CallError, ConfigError, EncodeError, InvariantError};
pub use key::{Arg, Args, Key, KeyCodec};
pub use memo::MemoizingCache;
pub use metrics::{CacheMetrics, Stats, StatsCollector};
pub use policy::{EvictionPolicy, FifoPolicy, LfuPolicy, LruPolicy};
pub use store::EntryStore;

#[cfg(feature = "concurrent")]
pub use concurrent::ConcurrentMemoizingCache;
