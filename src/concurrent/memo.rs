//! Thread-safe memoizing cache with single-flight misses.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                 ConcurrentMemoizingCache                      │
//! │                                                               │
//! │   func: F (runs outside the lock)                             │
//! │                                                               │
//! │   Mutex ─┬─ EntryStore<Key, V, P>                             │
//! │          ├─ StatsCollector                                    │
//! │          └─ in_flight: HashMap<Key, Arc<Flight<V>>>           │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store, the statistics and the in-flight table sit behind one
//! `parking_lot::Mutex`, so a lookup with its recency update, an insert with
//! its eviction, a clear, and a resize are each a single critical section.
//!
//! A caller that misses and finds no flight for its key becomes the leader:
//! it registers a [`Flight`], releases the lock and runs the function. Callers
//! that arrive while the flight is up wait on it instead of calling the
//! function again. A waiter that receives the leader's value counts as a hit.
//! If the leader fails or unwinds, the flight is retired and waiters probe
//! again, so one of them leads the next attempt. The leader's error is
//! returned to the leader alone.

extern crate alloc;

use super::flight::{Flight, Landing};
use crate::config::{Capacity, MemoConfig};
use crate::error::{CallError, ConfigError, EncodeError, InvariantError};
use crate::key::{Args, Key, KeyCodec};
use crate::metrics::{CacheMetrics, Stats, StatsCollector};
use crate::policy::{EvictionPolicy, LruPolicy};
use crate::store::EntryStore;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

struct Shared<V, P> {
    store: EntryStore<Key, V, P>,
    stats: StatsCollector,
    in_flight: HashMap<Key, Arc<Flight<V>>>,
    config: MemoConfig,
    /// Bumped by every clear. Waiters that joined before it do not count a hit.
    epoch: u64,
}

/// Thread-safe counterpart of [`MemoizingCache`](crate::MemoizingCache).
///
/// Share it by reference (scoped threads) or through an `Arc`. The wrapped
/// function must be `Fn + Sync` because several leaders for different keys
/// may run it at the same time.
///
/// # Example
///
/// ```
/// use memo_rs::{Args, ConcurrentMemoizingCache};
/// use core::convert::Infallible;
/// use std::thread;
///
/// let cache = ConcurrentMemoizingCache::new(
///     |args: &Args| Ok::<_, Infallible>(args.get(0).and_then(|a| a.as_i64()).unwrap_or(0) * 2),
///     Some(64),
///     false,
/// )
/// .unwrap();
///
/// thread::scope(|s| {
///     for _ in 0..4 {
///         s.spawn(|| {
///             for n in 0..16 {
///                 assert_eq!(cache.call(&Args::new().arg(n)).unwrap(), n * 2);
///             }
///         });
///     }
/// });
///
/// let info = cache.cache_info();
/// assert_eq!(info.requests(), 64);
/// assert_eq!(info.current_size, 16);
/// ```
pub struct ConcurrentMemoizingCache<V, F, P = LruPolicy> {
    func: F,
    codec: KeyCodec,
    shared: Mutex<Shared<V, P>>,
}

enum Role<V> {
    Leader(Arc<Flight<V>>),
    Waiter(Arc<Flight<V>>, u64),
}

impl<V, F> ConcurrentMemoizingCache<V, F, LruPolicy> {
    /// Wraps `func` in a thread-safe LRU cache holding at most `capacity` results.
    pub fn new(func: F, capacity: Option<usize>, distinguish_types: bool) -> Result<Self, ConfigError> {
        Self::init(
            MemoConfig {
                capacity,
                distinguish_types,
            },
            func,
        )
    }

    pub fn init(config: MemoConfig, func: F) -> Result<Self, ConfigError> {
        Self::with_policy(config, LruPolicy, func)
    }
}

impl<V, F, P: EvictionPolicy> ConcurrentMemoizingCache<V, F, P> {
    pub fn with_policy(config: MemoConfig, policy: P, func: F) -> Result<Self, ConfigError> {
        let capacity = config.validate()?;
        debug!(
            capacity = capacity.get(),
            distinguish_types = config.distinguish_types,
            policy = policy.name(),
            "concurrent memoizing cache created"
        );
        Ok(ConcurrentMemoizingCache {
            func,
            codec: KeyCodec::new(config.distinguish_types),
            shared: Mutex::new(Shared {
                store: EntryStore::with_policy(capacity, policy),
                stats: StatsCollector::new(capacity),
                in_flight: HashMap::new(),
                config,
                epoch: 0,
            }),
        })
    }

    /// Calls the wrapped function through the cache.
    ///
    /// At most one call per key runs the function at a time; concurrent callers
    /// for that key block until it finishes and share its value.
    pub fn call<E>(&self, args: &Args) -> Result<V, CallError<E>>
    where
        F: Fn(&Args) -> Result<V, E>,
        V: Clone,
    {
        let key = self.codec.encode(args)?;

        loop {
            let role = {
                let mut guard = self.shared.lock();
                let shared = &mut *guard;

                if let Some(value) = shared.store.get(&key).cloned() {
                    shared.stats.record_hit();
                    trace!("memo hit");
                    return Ok(value);
                }

                match shared.in_flight.get(&key) {
                    Some(flight) => Role::Waiter(Arc::clone(flight), shared.epoch),
                    None => {
                        let flight = Arc::new(Flight::new());
                        shared.in_flight.insert(key.clone(), Arc::clone(&flight));
                        shared.stats.record_miss();
                        trace!("memo miss");
                        Role::Leader(flight)
                    }
                }
            };

            match role {
                Role::Leader(flight) => return self.lead(key, &flight, args),
                Role::Waiter(flight, joined) => match flight.wait() {
                    Landing::Ready(value) => {
                        let mut guard = self.shared.lock();
                        if guard.epoch == joined {
                            guard.stats.record_hit();
                            trace!("memo hit on shared flight");
                        }
                        return Ok(value);
                    }
                    Landing::Failed | Landing::Abandoned => {
                        trace!("flight landed without a value, probing again");
                    }
                },
            }
        }
    }

    fn lead<E>(&self, key: Key, flight: &Flight<V>, args: &Args) -> Result<V, CallError<E>>
    where
        F: Fn(&Args) -> Result<V, E>,
        V: Clone,
    {
        let pilot = Pilot {
            shared: &self.shared,
            flight,
            key: Some(key),
        };

        match (self.func)(args) {
            Ok(value) => Ok(pilot.land_value(value)),
            Err(e) => {
                pilot.land_failure();
                Err(CallError::Function(e))
            }
        }
    }

    pub fn cache_info(&self) -> Stats {
        self.shared.lock().stats.snapshot()
    }

    /// Drops every cached result and zeroes the statistics.
    ///
    /// Flights already running are not cancelled; their results are stored when
    /// they land. Callers waiting on such a flight get its value but are not
    /// counted, since they asked before the statistics were reset.
    pub fn cache_clear(&self) {
        let mut guard = self.shared.lock();
        let dropped = guard.store.len();
        guard.store.clear();
        guard.stats.reset();
        guard.epoch += 1;
        debug!(dropped, "concurrent memoizing cache cleared");
    }

    /// Changes the capacity, evicting until the store fits. Each eviction is counted.
    pub fn resize(&self, capacity: Option<usize>) -> Result<(), ConfigError> {
        let bound = Capacity::from_option(capacity)?;
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        let evicted = shared.store.set_capacity(bound);
        for _ in &evicted {
            shared.stats.record_eviction();
        }
        shared.stats.set_capacity(bound);
        shared.config.capacity = capacity;
        debug!(capacity = bound.get(), evicted = evicted.len(), "concurrent memoizing cache resized");
        Ok(())
    }

    pub fn contains(&self, args: &Args) -> Result<bool, EncodeError> {
        let key = self.codec.encode(args)?;
        Ok(self.shared.lock().store.contains_key(&key))
    }

    /// A clone of the cached result for `args`. No stats, no recency update.
    pub fn peek(&self, args: &Args) -> Result<Option<V>, EncodeError>
    where
        V: Clone,
    {
        let key = self.codec.encode(args)?;
        Ok(self.shared.lock().store.peek(&key).cloned())
    }

    /// Drops the cached result for `args` and returns it. Not counted as an eviction.
    pub fn invalidate(&self, args: &Args) -> Result<Option<V>, EncodeError> {
        let key = self.codec.encode(args)?;
        let mut guard = self.shared.lock();
        let removed = guard.store.remove(&key);
        if removed.is_some() {
            guard.stats.record_removal();
        }
        Ok(removed)
    }

    pub fn config(&self) -> MemoConfig {
        self.shared.lock().config
    }

    pub fn policy_name(&self) -> &'static str {
        self.shared.lock().store.policy().name()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().store.is_empty()
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight.len()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let guard = self.shared.lock();
        guard.store.check_invariants()?;
        let current_size = guard.stats.snapshot().current_size;
        if current_size != guard.store.len() {
            return Err(InvariantError::new(format!(
                "stats report {} entries but the store holds {}",
                current_size,
                guard.store.len()
            )));
        }
        Ok(())
    }
}

impl<V, F, P: EvictionPolicy> CacheMetrics for ConcurrentMemoizingCache<V, F, P> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.cache_info().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        self.policy_name()
    }
}

impl<V, F, P: EvictionPolicy> fmt::Debug for ConcurrentMemoizingCache<V, F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.shared.lock();
        f.debug_struct("ConcurrentMemoizingCache")
            .field("config", &guard.config)
            .field("policy", &guard.store.policy().name())
            .field("stats", &guard.stats.snapshot())
            .field("in_flight", &guard.in_flight.len())
            .finish()
    }
}

/// The leader's hold on a flight. Dropping it without landing retires the
/// flight as abandoned, which is what happens when the function panics.
struct Pilot<'a, V, P> {
    shared: &'a Mutex<Shared<V, P>>,
    flight: &'a Flight<V>,
    key: Option<Key>,
}

impl<V: Clone, P: EvictionPolicy> Pilot<'_, V, P> {
    fn land_value(mut self, value: V) -> V {
        let Some(key) = self.key.take() else {
            return value;
        };

        {
            let mut guard = self.shared.lock();
            let shared = &mut *guard;
            shared.in_flight.remove(&key);
            let fresh = !shared.store.contains_key(&key);
            if let Some((evicted, _)) = shared.store.insert(key, value.clone()) {
                shared.stats.record_eviction();
                debug!(key = ?evicted, "evicted memoized result");
            }
            if fresh {
                shared.stats.record_insertion();
            }
        }

        self.flight.land(Landing::Ready(value.clone()));
        value
    }

    fn land_failure(mut self) {
        if let Some(key) = self.key.take() {
            self.shared.lock().in_flight.remove(&key);
        }
        self.flight.land(Landing::Failed);
    }
}

impl<V, P> Drop for Pilot<'_, V, P> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            warn!("memoized function unwound, abandoning its flight");
            self.shared.lock().in_flight.remove(&key);
            self.flight.land(Landing::Abandoned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Arg;
    use core::convert::Infallible;
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use core::time::Duration;

    extern crate std;
    use std::sync::Barrier;
    use std::thread;
    use std::vec::Vec;

    fn one(n: impl Into<Arg>) -> Args {
        Args::new().arg(n)
    }

    #[test]
    fn test_square_scenario() {
        let cache = ConcurrentMemoizingCache::new(
            |args: &Args| {
                let n = args.get(0).and_then(Arg::as_i64).unwrap_or_default();
                Ok::<_, Infallible>(n * n)
            },
            Some(2),
            false,
        )
        .unwrap();

        for n in [2, 3, 2, 4] {
            cache.call(&one(n)).unwrap();
        }
        let info = cache.cache_info();
        assert_eq!((info.hits, info.misses, info.evictions), (1, 3, 1));
        assert_eq!(cache.peek(&one(2)).unwrap(), Some(4));
        assert_eq!(cache.peek(&one(4)).unwrap(), Some(16));
        assert_eq!(cache.peek(&one(3)).unwrap(), None);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_single_flight_runs_function_once() {
        const THREADS: usize = 8;
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);
        let cache = ConcurrentMemoizingCache::new(
            |_: &Args| {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
                Ok::<_, Infallible>(42u64)
            },
            Some(4),
            false,
        )
        .unwrap();

        let results: Vec<u64> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.call(&one("answer")).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|&v| v == 42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let info = cache.cache_info();
        assert_eq!(info.misses, 1);
        assert_eq!(info.hits, THREADS as u64 - 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[test]
    fn test_leader_failure_hands_over() {
        const THREADS: usize = 6;
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);
        let cache = ConcurrentMemoizingCache::new(
            |_: &Args| {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                if attempt == 0 {
                    Err("transient")
                } else {
                    Ok(attempt)
                }
            },
            None,
            false,
        )
        .unwrap();

        let results: Vec<Result<usize, CallError<&str>>> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.call(&one(1))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let failures = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(failures, 1);
        assert!(results.iter().flatten().all(|&v| v == 1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let info = cache.cache_info();
        assert_eq!(info.misses, 2);
        assert_eq!(info.requests(), THREADS as u64);
        assert_eq!(info.current_size, 1);
    }

    #[test]
    fn test_panicking_leader_does_not_wedge_key() {
        let calls = AtomicUsize::new(0);
        let cache = ConcurrentMemoizingCache::new(
            |_: &Args| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("boom");
                }
                Ok::<_, Infallible>(7)
            },
            Some(2),
            false,
        )
        .unwrap();

        thread::scope(|s| {
            let leader = s.spawn(|| cache.call(&one(0)));
            assert!(leader.join().is_err());
        });

        assert_eq!(cache.in_flight(), 0);
        assert_eq!(cache.call(&one(0)).unwrap(), 7);
        assert_eq!(cache.len(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_bounded_under_contention() {
        let cache = ConcurrentMemoizingCache::new(
            |args: &Args| Ok::<_, Infallible>(args.get(0).and_then(Arg::as_i64).unwrap_or_default()),
            Some(16),
            false,
        )
        .unwrap();

        thread::scope(|s| {
            for t in 0..4i64 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..500i64 {
                        let n = (i * 31 + t) % 64;
                        assert_eq!(cache.call(&one(n)).unwrap(), n);
                    }
                });
            }
        });

        let info = cache.cache_info();
        assert_eq!(info.requests(), 2000);
        assert!(info.current_size <= 16);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_clear_during_flight_drops_waiter_hit() {
        let release = AtomicBool::new(false);
        let cache = ConcurrentMemoizingCache::new(
            |_: &Args| {
                while !release.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
                Ok::<_, Infallible>(5)
            },
            Some(4),
            false,
        )
        .unwrap();
        let holders = || {
            cache
                .shared
                .lock()
                .in_flight
                .values()
                .next()
                .map_or(0, Arc::strong_count)
        };

        thread::scope(|s| {
            let leader = s.spawn(|| cache.call(&one(1)).unwrap());
            while holders() < 2 {
                thread::yield_now();
            }
            let waiter = s.spawn(|| cache.call(&one(1)).unwrap());
            while holders() < 3 {
                thread::yield_now();
            }

            cache.cache_clear();
            release.store(true, Ordering::SeqCst);
            assert_eq!(leader.join().unwrap(), 5);
            assert_eq!(waiter.join().unwrap(), 5);
        });

        let info = cache.cache_info();
        assert_eq!((info.hits, info.misses), (0, 0));
        assert_eq!(info.current_size, 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_management_operations() {
        let cache = ConcurrentMemoizingCache::new(
            |args: &Args| Ok::<_, Infallible>(args.len()),
            Some(4),
            true,
        )
        .unwrap();

        for n in 0..4 {
            cache.call(&one(n)).unwrap();
        }
        cache.call(&one(0.0)).unwrap();
        assert_eq!(cache.cache_info().evictions, 1);

        assert_eq!(cache.invalidate(&one(3)).unwrap(), Some(1));
        assert!(!cache.contains(&one(3)).unwrap());

        cache.resize(Some(1)).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.config().capacity, Some(1));
        assert_eq!(cache.resize(Some(0)), Err(ConfigError::ZeroCapacity));

        cache.cache_clear();
        assert_eq!(cache.cache_info(), Stats { capacity: Some(1), ..Stats::default() });
        assert_eq!(cache.policy_name(), "LRU");
        assert!(cache.contains(&one(Arg::list([1]))).is_err());
    }
}
