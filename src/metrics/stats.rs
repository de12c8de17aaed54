//! Hit, miss and eviction accounting.

extern crate alloc;

use crate::config::Capacity;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use core::fmt;

/// Point-in-time statistics of a memoizing cache.
///
/// `hits + misses` equals the number of lookups since construction or the
/// last clear. Calls rejected with a bad key are not lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that invoked the wrapped function, whether it succeeded or not.
    pub misses: u64,
    /// Entries removed to make room, including those removed by a shrinking resize.
    pub evictions: u64,
    /// Entries currently stored.
    pub current_size: usize,
    /// Maximum number of entries, `None` when unbounded.
    pub capacity: Option<usize>,
}

impl Stats {
    #[inline]
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Ratio of hits to requests, between 0.0 and 1.0, or 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        match self.requests() {
            0 => 0.0,
            requests => self.hits as f64 / requests as f64,
        }
    }

    /// Ratio of misses to requests, between 0.0 and 1.0, or 0.0 before any request.
    pub fn miss_rate(&self) -> f64 {
        match self.requests() {
            0 => 0.0,
            requests => self.misses as f64 / requests as f64,
        }
    }

    /// How full the cache is, or 0.0 when unbounded.
    pub fn utilization(&self) -> f64 {
        match self.capacity {
            Some(capacity) if capacity > 0 => self.current_size as f64 / capacity as f64,
            _ => 0.0,
        }
    }

    /// Flattens the snapshot into alphabetically ordered metrics.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("cache_hits".to_string(), self.hits as f64);
        metrics.insert("cache_misses".to_string(), self.misses as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("requests".to_string(), self.requests() as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());

        metrics.insert("current_size".to_string(), self.current_size as f64);
        if let Some(capacity) = self.capacity {
            metrics.insert("capacity".to_string(), capacity as f64);
            metrics.insert("cache_utilization".to_string(), self.utilization());
        }

        if self.requests() > 0 {
            metrics.insert(
                "eviction_rate".to_string(),
                self.evictions as f64 / self.requests() as f64,
            );
        }

        metrics
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={}, misses={}, evictions={}, current_size={}, capacity=",
            self.hits, self.misses, self.evictions, self.current_size
        )?;
        match self.capacity {
            Some(capacity) => write!(f, "{}", capacity),
            None => f.write_str("unbounded"),
        }
    }
}

/// Running counters behind a [`Stats`] snapshot.
///
/// The collector trusts its caller: a miss that evicts calls
/// [`record_miss`](Self::record_miss), [`record_eviction`](Self::record_eviction)
/// and [`record_insertion`](Self::record_insertion) within the same operation,
/// so a snapshot never sees half of it.
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    hits: u64,
    misses: u64,
    evictions: u64,
    current_size: usize,
    capacity: Option<usize>,
}

impl StatsCollector {
    pub fn new(capacity: Capacity) -> Self {
        StatsCollector {
            capacity: capacity.get(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    #[inline]
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// An entry left to make room.
    #[inline]
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
        self.current_size = self.current_size.saturating_sub(1);
    }

    /// A new entry was stored.
    #[inline]
    pub fn record_insertion(&mut self) {
        self.current_size += 1;
    }

    /// An entry was dropped on request; not an eviction.
    #[inline]
    pub fn record_removal(&mut self) {
        self.current_size = self.current_size.saturating_sub(1);
    }

    /// Zeroes every counter and the size. The capacity is kept.
    pub fn reset(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
        self.current_size = 0;
    }

    pub fn set_capacity(&mut self, capacity: Capacity) {
        self.capacity = capacity.get();
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            current_size: self.current_size,
            capacity: self.capacity,
        }
    }
}
