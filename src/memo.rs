//! Memoizing Cache
//!
//! [`MemoizingCache`] wraps a fallible function of [`Args`] and remembers its
//! successful results. Each call is encoded into a [`Key`]; a key already in
//! the store is a hit and returns a clone of the stored value, anything else is
//! a miss that invokes the wrapped function exactly once and stores the result,
//! evicting the policy's victim when the store is full.
//!
//! ```text
//!   call(args)
//!      │
//!      ▼
//!   KeyCodec::encode ──Err──▶ CallError::BadKey      (stats untouched)
//!      │
//!      ▼
//!   EntryStore::get ──hit──▶ record_hit, clone value
//!      │ miss
//!      ▼
//!   record_miss, f(args) ──Err──▶ CallError::Function (nothing stored)
//!      │ Ok
//!      ▼
//!   EntryStore::insert ──victim──▶ record_eviction
//!      │
//!      ▼
//!   record_insertion, return value
//! ```
//!
//! The façade is single-threaded: every operation takes `&mut self`. For
//! shared use across threads, see `ConcurrentMemoizingCache` (feature
//! `concurrent`).
//!
//! # Example
//!
//! ```
//! use memo_rs::{Args, MemoizingCache};
//! use core::convert::Infallible;
//!
//! let square = |args: &Args| Ok::<_, Infallible>(args.get(0).and_then(|a| a.as_i64()).unwrap_or(0).pow(2));
//! let mut cache = MemoizingCache::new(square, Some(2), false).unwrap();
//!
//! for n in [2, 3, 2, 4] {
//!     cache.call(&Args::new().arg(n)).unwrap();
//! }
//!
//! let info = cache.cache_info();
//! assert_eq!((info.hits, info.misses, info.evictions), (1, 3, 1));
//! assert_eq!(cache.peek(&Args::new().arg(4)).unwrap(), Some(&16));
//! assert_eq!(cache.peek(&Args::new().arg(3)).unwrap(), None);
//! ```

extern crate alloc;

use crate::config::{Capacity, MemoConfig};
use crate::error::{CallError, ConfigError, EncodeError, InvariantError};
use crate::key::{Args, Key, KeyCodec};
use crate::metrics::{CacheMetrics, Stats, StatsCollector};
use crate::policy::{EvictionPolicy, LruPolicy};
use crate::store::EntryStore;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use core::fmt;
use tracing::{debug, trace};

/// Bounded memoizing wrapper around a function of [`Args`].
///
/// `F` is the wrapped function, `P` the eviction policy (LRU by default).
/// Only successful results are cached; errors are passed through as
/// [`CallError::Function`] and the next call with the same arguments invokes
/// the function again.
///
/// `V` is the cached value type. It is inferred from the first [`call`], so a
/// cache that is never called needs it spelled out:
/// `MemoizingCache::<i64, _>::new(f, Some(8), false)`.
///
/// [`call`]: MemoizingCache::call
pub struct MemoizingCache<V, F, P = LruPolicy> {
    func: F,
    codec: KeyCodec,
    store: EntryStore<Key, V, P>,
    stats: StatsCollector,
    config: MemoConfig,
}

impl<V, F> MemoizingCache<V, F, LruPolicy> {
    /// Wraps `func` in an LRU cache holding at most `capacity` results.
    ///
    /// `None` means unbounded. `Some(0)` is rejected.
    pub fn new(func: F, capacity: Option<usize>, distinguish_types: bool) -> Result<Self, ConfigError> {
        Self::init(
            MemoConfig {
                capacity,
                distinguish_types,
            },
            func,
        )
    }

    /// Wraps `func` in an LRU cache configured by `config`.
    pub fn init(config: MemoConfig, func: F) -> Result<Self, ConfigError> {
        Self::with_policy(config, LruPolicy, func)
    }
}

impl<V, F, P: EvictionPolicy> MemoizingCache<V, F, P> {
    /// Wraps `func` in a cache that evicts with `policy`.
    pub fn with_policy(config: MemoConfig, policy: P, func: F) -> Result<Self, ConfigError> {
        let capacity = config.validate()?;
        debug!(
            capacity = capacity.get(),
            distinguish_types = config.distinguish_types,
            policy = policy.name(),
            "memoizing cache created"
        );
        Ok(MemoizingCache {
            func,
            codec: KeyCodec::new(config.distinguish_types),
            store: EntryStore::with_policy(capacity, policy),
            stats: StatsCollector::new(capacity),
            config,
        })
    }

    /// Calls the wrapped function through the cache.
    ///
    /// Returns [`CallError::BadKey`] without invoking the function or touching
    /// the statistics when `args` cannot form a key.
    pub fn call<E>(&mut self, args: &Args) -> Result<V, CallError<E>>
    where
        F: FnMut(&Args) -> Result<V, E>,
        V: Clone,
    {
        let key = self.codec.encode(args)?;

        if let Some(value) = self.store.get(&key).cloned() {
            self.stats.record_hit();
            trace!(policy = self.store.policy().name(), "memo hit");
            return Ok(value);
        }

        self.stats.record_miss();
        trace!(policy = self.store.policy().name(), "memo miss");
        let value = (self.func)(args).map_err(CallError::Function)?;

        if let Some((evicted, _)) = self.store.insert(key, value.clone()) {
            self.stats.record_eviction();
            debug!(key = ?evicted, "evicted memoized result");
        }
        self.stats.record_insertion();
        Ok(value)
    }

    /// Current statistics.
    pub fn cache_info(&self) -> Stats {
        self.stats.snapshot()
    }

    /// Drops every cached result and zeroes the statistics.
    pub fn cache_clear(&mut self) {
        let dropped = self.store.len();
        self.store.clear();
        self.stats.reset();
        debug!(dropped, "memoizing cache cleared");
    }

    /// Changes the capacity, evicting least valuable entries until the store fits.
    ///
    /// Each eviction is counted. An invalid capacity leaves the cache untouched.
    pub fn resize(&mut self, capacity: Option<usize>) -> Result<(), ConfigError> {
        let bound = Capacity::from_option(capacity)?;
        let evicted = self.store.set_capacity(bound);
        for _ in &evicted {
            self.stats.record_eviction();
        }
        self.stats.set_capacity(bound);
        self.config.capacity = capacity;
        debug!(capacity = bound.get(), evicted = evicted.len(), "memoizing cache resized");
        Ok(())
    }

    /// Whether a result for `args` is cached. No stats, no recency update.
    pub fn contains(&self, args: &Args) -> Result<bool, EncodeError> {
        let key = self.codec.encode(args)?;
        Ok(self.store.contains_key(&key))
    }

    /// The cached result for `args`, if any. No stats, no recency update.
    pub fn peek(&self, args: &Args) -> Result<Option<&V>, EncodeError> {
        let key = self.codec.encode(args)?;
        Ok(self.store.peek(&key))
    }

    /// Drops the cached result for `args` and returns it. Not counted as an eviction.
    pub fn invalidate(&mut self, args: &Args) -> Result<Option<V>, EncodeError> {
        let key = self.codec.encode(args)?;
        let removed = self.store.remove(&key);
        if removed.is_some() {
            self.stats.record_removal();
        }
        Ok(removed)
    }

    pub fn config(&self) -> &MemoConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.store.policy().name()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Read-only access to the underlying store.
    pub fn store(&self) -> &EntryStore<Key, V, P> {
        &self.store
    }

    /// Checks the store and that the statistics agree with it.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.store.check_invariants()?;
        let stats = self.stats.snapshot();
        if stats.current_size != self.store.len() {
            return Err(InvariantError::new(format!(
                "stats report {} entries but the store holds {}",
                stats.current_size,
                self.store.len()
            )));
        }
        Ok(())
    }
}

impl<V, F, P: EvictionPolicy> CacheMetrics for MemoizingCache<V, F, P> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.stats.snapshot().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        self.policy_name()
    }
}

impl<V, F, P: EvictionPolicy> fmt::Debug for MemoizingCache<V, F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizingCache")
            .field("config", &self.config)
            .field("policy", &self.store.policy().name())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Arg;
    use crate::policy::FifoPolicy;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::cell::Cell;
    use core::convert::Infallible;

    fn square(args: &Args) -> Result<i64, Infallible> {
        let n = args.get(0).and_then(Arg::as_i64).unwrap_or_default();
        Ok(n * n)
    }

    fn one(n: impl Into<Arg>) -> Args {
        Args::new().arg(n)
    }

    #[test]
    fn test_square_scenario() {
        let mut cache = MemoizingCache::new(square, Some(2), false).unwrap();
        assert_eq!(cache.call(&one(2)).unwrap(), 4);
        assert_eq!(cache.call(&one(3)).unwrap(), 9);
        assert_eq!(cache.call(&one(2)).unwrap(), 4);
        assert_eq!(cache.call(&one(4)).unwrap(), 16);

        assert_eq!(
            cache.cache_info(),
            Stats {
                hits: 1,
                misses: 3,
                evictions: 1,
                current_size: 2,
                capacity: Some(2),
            }
        );
        assert_eq!(cache.peek(&one(2)).unwrap(), Some(&4));
        assert_eq!(cache.peek(&one(4)).unwrap(), Some(&16));
        assert!(!cache.contains(&one(3)).unwrap());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_repeated_call_does_not_reinvoke() {
        let calls = Cell::new(0);
        let mut cache = MemoizingCache::new(
            |args: &Args| {
                calls.set(calls.get() + 1);
                square(args)
            },
            Some(8),
            false,
        )
        .unwrap();

        for _ in 0..5 {
            assert_eq!(cache.call(&one(7)).unwrap(), 49);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.cache_info().hits, 4);
    }

    #[test]
    fn test_function_failure_is_not_cached() {
        let mut cache = MemoizingCache::new(
            |args: &Args| match args.get(0).and_then(Arg::as_i64) {
                Some(5) => Err("five is not allowed"),
                Some(n) => Ok(n),
                None => Err("missing"),
            },
            Some(4),
            false,
        )
        .unwrap();

        let err = cache.call(&one(5)).unwrap_err();
        assert_eq!(err.into_function_error(), Some("five is not allowed"));
        assert!(cache.call(&one(5)).is_err());

        let info = cache.cache_info();
        assert_eq!(info.misses, 2);
        assert_eq!(info.current_size, 0);
        assert!(!cache.contains(&one(5)).unwrap());
    }

    #[test]
    fn test_bad_key_touches_nothing() {
        let calls = Cell::new(0);
        let mut cache = MemoizingCache::new(
            |_: &Args| {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>(0)
            },
            Some(4),
            false,
        )
        .unwrap();

        let err = cache.call(&one(Arg::list([1, 2]))).unwrap_err();
        assert!(err.is_bad_key());
        assert_eq!(calls.get(), 0);
        assert_eq!(cache.cache_info(), Stats { capacity: Some(4), ..Stats::default() });

        // Frozen lists are cached by value
        cache.call(&one(Arg::list([1, 2]).freeze())).unwrap();
        cache.call(&one(Arg::tuple([1, 2]))).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_distinguish_types() {
        let mut loose = MemoizingCache::new(square, None, false).unwrap();
        loose.call(&one(1)).unwrap();
        loose.call(&one(1.0)).unwrap();
        assert_eq!((loose.cache_info().hits, loose.cache_info().misses), (1, 1));

        let mut strict = MemoizingCache::new(square, None, true).unwrap();
        strict.call(&one(1)).unwrap();
        strict.call(&one(1.0)).unwrap();
        assert_eq!((strict.cache_info().hits, strict.cache_info().misses), (0, 2));
    }

    #[test]
    fn test_keyword_order_is_irrelevant() {
        let mut cache = MemoizingCache::new(
            |args: &Args| Ok::<_, Infallible>(args.len()),
            Some(4),
            false,
        )
        .unwrap();
        cache.call(&Args::new().kwarg("a", 1).kwarg("b", 2)).unwrap();
        cache.call(&Args::new().kwarg("b", 2).kwarg("a", 1)).unwrap();
        assert_eq!(cache.cache_info().hits, 1);
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = MemoizingCache::new(square, Some(3), false).unwrap();
        for n in 0..5 {
            cache.call(&one(n)).unwrap();
        }
        cache.call(&one(4)).unwrap();
        cache.cache_clear();
        assert_eq!(
            cache.cache_info(),
            Stats {
                hits: 0,
                misses: 0,
                evictions: 0,
                current_size: 0,
                capacity: Some(3),
            }
        );
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_resize_records_evictions() {
        let mut cache = MemoizingCache::new(square, Some(4), false).unwrap();
        for n in 0..4 {
            cache.call(&one(n)).unwrap();
        }
        cache.resize(Some(1)).unwrap();
        let info = cache.cache_info();
        assert_eq!(info.evictions, 3);
        assert_eq!(info.current_size, 1);
        assert_eq!(info.capacity, Some(1));
        assert!(cache.contains(&one(3)).unwrap());
        assert_eq!(cache.config().capacity, Some(1));

        assert_eq!(cache.resize(Some(0)), Err(ConfigError::ZeroCapacity));
        assert_eq!(cache.cache_info().capacity, Some(1));

        cache.resize(None).unwrap();
        for n in 10..100 {
            cache.call(&one(n)).unwrap();
        }
        assert_eq!(cache.len(), 91);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = MemoizingCache::<i64, _>::new(square, Some(0), false);
        assert_eq!(result.err(), Some(ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_invalidate() {
        let mut cache = MemoizingCache::new(square, Some(2), false).unwrap();
        cache.call(&one(3)).unwrap();
        assert_eq!(cache.invalidate(&one(3)).unwrap(), Some(9));
        assert_eq!(cache.invalidate(&one(3)).unwrap(), None);
        let info = cache.cache_info();
        assert_eq!((info.current_size, info.evictions), (0, 0));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_peek_does_not_protect() {
        let mut cache = MemoizingCache::new(square, Some(2), false).unwrap();
        cache.call(&one(1)).unwrap();
        cache.call(&one(2)).unwrap();
        cache.peek(&one(1)).unwrap();
        cache.call(&one(3)).unwrap();
        assert!(!cache.contains(&one(1)).unwrap());
        assert_eq!(cache.cache_info().hits, 0);
    }

    #[test]
    fn test_fifo_policy_cache() {
        let config = MemoConfig {
            capacity: Some(2),
            distinguish_types: false,
        };
        let mut cache = MemoizingCache::with_policy(config, FifoPolicy, square).unwrap();
        cache.call(&one(1)).unwrap();
        cache.call(&one(2)).unwrap();
        cache.call(&one(1)).unwrap();
        cache.call(&one(3)).unwrap();
        assert!(!cache.contains(&one(1)).unwrap());
        assert_eq!(cache.policy_name(), "FIFO");
        assert_eq!(cache.algorithm_name(), "FIFO");
    }

    #[test]
    fn test_metrics_report() {
        let mut cache = MemoizingCache::new(square, Some(2), false).unwrap();
        cache.call(&one(1)).unwrap();
        cache.call(&one(1)).unwrap();
        let metrics = cache.metrics();
        assert_eq!(metrics.get("cache_hits"), Some(&1.0));
        assert_eq!(metrics.get("cache_misses"), Some(&1.0));
        assert_eq!(metrics.get("current_size"), Some(&1.0));
        let names: Vec<String> = metrics.keys().cloned().collect();
        assert!(names.contains(&"hit_rate".to_string()));
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut cache = MemoizingCache::new(square, Some(5), false).unwrap();
        for i in 0..200i64 {
            cache.call(&one((i * 7919) % 37)).unwrap();
            assert!(cache.cache_info().current_size <= 5);
        }
        cache.check_invariants().unwrap();
    }
}
