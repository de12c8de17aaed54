//! Eviction Policies
//!
//! An [`EvictionPolicy`] decides which entry leaves a full
//! [`EntryStore`](crate::store::EntryStore). The store owns the storage and
//! the recency ordering; the policy only reads that ordering through a
//! [`RecencyOrder`] view and points at a victim. Swapping policies never
//! touches the store's storage mechanics.
//!
//! | Policy | Victim | Cost |
//! |--------|--------|------|
//! | [`LruPolicy`] | least recently used entry | O(1) |
//! | [`FifoPolicy`] | oldest insertion, ignoring hits | O(n) |
//! | [`LfuPolicy`] | fewest hits, least recently used among ties | O(n) |
//!
//! # Tie-break
//!
//! The recency order is strict: entries that have not been hit since they
//! were inserted sit in insertion order, so whenever a policy has to pick
//! among otherwise equal entries the oldest insertion goes first.
//!
//! # Custom Policies
//!
//! ```
//! use memo_rs::policy::{EntryRef, EvictionPolicy, RecencyOrder};
//!
//! /// Evicts the most recently used entry.
//! #[derive(Debug, Default)]
//! struct MruPolicy;
//!
//! impl EvictionPolicy for MruPolicy {
//!     fn select_victim<'a, K, V>(&self, order: &RecencyOrder<'a, K, V>) -> Option<EntryRef<'a, K, V>> {
//!         order.most_recent()
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "MRU"
//!     }
//! }
//! ```

use crate::entry::{CacheEntry, EntryMeta};
use crate::list::{Entry, List, Nodes};
use core::fmt;
use core::iter::Rev;
use core::marker::PhantomData;
use core::ptr::NonNull;

pub(crate) type Node<K, V> = Entry<CacheEntry<K, V>>;

/// Chooses the entry to evict from a full store.
pub trait EvictionPolicy {
    /// Returns the entry to evict, or `None` if `order` is empty.
    fn select_victim<'a, K, V>(&self, order: &RecencyOrder<'a, K, V>)
        -> Option<EntryRef<'a, K, V>>;

    /// Short policy name used in metrics and logs.
    fn name(&self) -> &'static str;
}

/// Least recently used. The default policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LruPolicy;

impl EvictionPolicy for LruPolicy {
    #[inline]
    fn select_victim<'a, K, V>(
        &self,
        order: &RecencyOrder<'a, K, V>,
    ) -> Option<EntryRef<'a, K, V>> {
        order.least_recent()
    }

    fn name(&self) -> &'static str {
        "LRU"
    }
}

/// First in, first out: hits do not protect an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FifoPolicy;

impl EvictionPolicy for FifoPolicy {
    fn select_victim<'a, K, V>(
        &self,
        order: &RecencyOrder<'a, K, V>,
    ) -> Option<EntryRef<'a, K, V>> {
        order.iter().min_by_key(|entry| entry.meta().inserted_at)
    }

    fn name(&self) -> &'static str {
        "FIFO"
    }
}

/// Least frequently used, falling back to least recently used on ties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LfuPolicy;

impl EvictionPolicy for LfuPolicy {
    fn select_victim<'a, K, V>(
        &self,
        order: &RecencyOrder<'a, K, V>,
    ) -> Option<EntryRef<'a, K, V>> {
        // `min_by_key` keeps the first minimum and `iter` walks from the LRU end.
        order.iter().min_by_key(|entry| entry.meta().hits)
    }

    fn name(&self) -> &'static str {
        "LFU"
    }
}

/// Read-only view of a store's entries in recency order.
pub struct RecencyOrder<'a, K, V> {
    list: &'a List<CacheEntry<K, V>>,
}

impl<'a, K, V> RecencyOrder<'a, K, V> {
    pub(crate) fn new(list: &'a List<CacheEntry<K, V>>) -> Self {
        RecencyOrder { list }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The entry whose last access is oldest.
    pub fn least_recent(&self) -> Option<EntryRef<'a, K, V>> {
        self.list.last().map(EntryRef::new)
    }

    /// The entry accessed or inserted last.
    pub fn most_recent(&self) -> Option<EntryRef<'a, K, V>> {
        self.list.first().map(EntryRef::new)
    }

    /// Entries from least to most recently used.
    pub fn iter(&self) -> OrderIter<'a, K, V> {
        OrderIter {
            nodes: self.list.nodes().rev(),
        }
    }
}

impl<K, V> fmt::Debug for RecencyOrder<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecencyOrder")
            .field("len", &self.list.len())
            .finish()
    }
}

/// Iterator over a [`RecencyOrder`], least recently used first.
pub struct OrderIter<'a, K, V> {
    nodes: Rev<Nodes<'a, CacheEntry<K, V>>>,
}

impl<'a, K, V> Iterator for OrderIter<'a, K, V> {
    type Item = EntryRef<'a, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.nodes.next().map(EntryRef::new)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for OrderIter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.nodes.next_back().map(EntryRef::new)
    }
}

impl<K, V> ExactSizeIterator for OrderIter<'_, K, V> {}

impl<K, V> fmt::Debug for OrderIter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderIter")
            .field("remaining", &self.nodes.len())
            .finish()
    }
}

/// A borrowed handle to one live entry, as seen by a policy.
pub struct EntryRef<'a, K, V> {
    node: NonNull<Node<K, V>>,
    _marker: PhantomData<&'a CacheEntry<K, V>>,
}

impl<'a, K, V> EntryRef<'a, K, V> {
    fn new(node: NonNull<Node<K, V>>) -> Self {
        EntryRef {
            node,
            _marker: PhantomData,
        }
    }

    fn entry(&self) -> &'a CacheEntry<K, V> {
        // SAFETY: the node is a live, initialized entry of the list borrowed
        // for 'a, and that list cannot be mutated while the borrow exists.
        unsafe { (*self.node.as_ptr()).get_value() }
    }

    pub fn key(&self) -> &'a K {
        &self.entry().key
    }

    pub fn value(&self) -> &'a V {
        &self.entry().value
    }

    pub fn meta(&self) -> &'a EntryMeta {
        &self.entry().meta
    }

    pub(crate) fn node(&self) -> NonNull<Node<K, V>> {
        self.node
    }
}

impl<K, V> Clone for EntryRef<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for EntryRef<'_, K, V> {}

impl<K: fmt::Debug, V> fmt::Debug for EntryRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryRef")
            .field("key", self.key())
            .field("meta", self.meta())
            .finish()
    }
}
