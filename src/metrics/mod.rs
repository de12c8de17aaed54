//! Cache Metrics System
//!
//! Every memoizing façade owns one [`StatsCollector`] and reports a [`Stats`]
//! snapshot through `cache_info()`. The [`CacheMetrics`] trait exposes the
//! same numbers as a flat `BTreeMap<String, f64>` for benchmarks and
//! dashboards.
//!
//! BTreeMap is used instead of HashMap so metrics always come out in the same
//! order; reports and test assertions stay reproducible.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;

pub mod stats;

pub use stats::{Stats, StatsCollector};

/// Uniform metrics reporting for every cache façade.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Name of the eviction policy in use (e.g. "LRU", "FIFO").
    fn algorithm_name(&self) -> &'static str;
}
