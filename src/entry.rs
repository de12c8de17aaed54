//! Cache Entry Type
//!
//! Every node of an [`EntryStore`](crate::store::EntryStore) holds one
//! [`CacheEntry`]: the key, the cached value, and the [`EntryMeta`] recency
//! bookkeeping that eviction policies read.
//!
//! # Logical Clock
//!
//! Timestamps are ticks of a per-store logical clock, not wall time. Every
//! insertion and every hit advances the clock by one, so two entries never
//! share a tick and ordering by tick is a strict total order.
//!
//! # Memory Layout
//!
//! - `key: K`, `value: V` - user types
//! - `meta: EntryMeta` - 24 bytes (three `u64` counters)
//! - list links - 16 bytes
//!
//! # Usage Examples
//!
//! ```
//! use memo_rs::entry::{CacheEntry, EntryMeta};
//!
//! let entry = CacheEntry::new("key", 42, 7);
//! assert_eq!(entry.meta, EntryMeta { inserted_at: 7, last_access: 7, hits: 0 });
//! ```

use core::fmt;

/// Recency and frequency bookkeeping for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryMeta {
    /// Clock tick at which the entry was inserted.
    pub inserted_at: u64,
    /// Clock tick of the most recent insertion or hit.
    pub last_access: u64,
    /// Number of hits since insertion.
    pub hits: u64,
}

impl EntryMeta {
    /// Metadata for an entry inserted at `tick`.
    #[inline]
    pub fn new(tick: u64) -> Self {
        EntryMeta {
            inserted_at: tick,
            last_access: tick,
            hits: 0,
        }
    }

    /// Records a hit at `tick`.
    #[inline]
    pub fn touch(&mut self, tick: u64) {
        self.last_access = tick;
        self.hits = self.hits.saturating_add(1);
    }
}

/// A cached key/value pair plus its metadata.
///
/// The value is never mutated in place while the entry exists; replacing it
/// goes through [`EntryStore::insert`](crate::store::EntryStore::insert).
pub struct CacheEntry<K, V> {
    /// The cached key.
    pub key: K,
    /// The cached result.
    pub value: V,
    /// Recency bookkeeping.
    pub meta: EntryMeta,
}

impl<K, V> CacheEntry<K, V> {
    /// Creates an entry inserted at clock tick `tick`.
    pub fn new(key: K, value: V, tick: u64) -> Self {
        CacheEntry {
            key,
            value,
            meta: EntryMeta::new(tick),
        }
    }

    /// Splits the entry into its key and value.
    #[inline]
    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CacheEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("meta", &self.meta)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_meta_touch() {
        let mut meta = EntryMeta::new(3);
        meta.touch(9);
        meta.touch(12);
        assert_eq!(meta.inserted_at, 3);
        assert_eq!(meta.last_access, 12);
        assert_eq!(meta.hits, 2);
    }

    #[test]
    fn test_entry_into_pair() {
        let entry = CacheEntry::new("k", 5, 0);
        assert_eq!(entry.into_pair(), ("k", 5));
    }
}
