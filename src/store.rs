//! Capacity-Bounded Entry Store
//!
//! [`EntryStore`] maps keys to cached values and keeps every entry in a strict
//! recency order, most recently used at the front. When a bounded store is
//! full, an insert first evicts the victim chosen by the store's
//! [`EvictionPolicy`] (least recently used by default).
//!
//! # Structure
//!
//! ```text
//!   index: HashMap<K, *node>                recency list (MRU ... LRU)
//!   ┌──────────┐                      head ─▶ [k3] ⇄ [k1] ⇄ [k2] ◀─ tail
//!   │ k1 ──────┼──────────────────────────────────▶ ▲
//!   │ k2 ──────┼─────────────────────────────────────────▶ ▲
//!   │ k3 ──────┼────────────────────────▶ ▲
//!   └──────────┘
//! ```
//!
//! The index and the list always hold exactly the same keys. Both are updated
//! inside the same `&mut self` call, so no caller can observe one without the
//! other.
//!
//! # Performance Characteristics
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `get` / `peek` / `remove` | O(1) |
//! | `insert` | O(1) with [`LruPolicy`]; policy cost otherwise |
//! | `set_capacity` | O(evicted) with [`LruPolicy`] |
//! | `clear` | O(n) |
//!
//! # Thread Safety
//!
//! The store is not thread-safe. `ConcurrentMemoizingCache` wraps it in a
//! `parking_lot::Mutex`; recency-updating reads need exclusive access anyway.

extern crate alloc;

use crate::config::Capacity;
use crate::entry::{CacheEntry, EntryMeta};
use crate::error::InvariantError;
use crate::list::{List, Nodes};
use crate::policy::{EvictionPolicy, LruPolicy, Node, RecencyOrder};
use alloc::format;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ptr::NonNull;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Hash index plus recency list, bounded by a [`Capacity`].
///
/// # Examples
///
/// ```
/// use memo_rs::config::Capacity;
/// use memo_rs::store::EntryStore;
///
/// let mut store: EntryStore<&str, i32> = EntryStore::new(Capacity::from_option(Some(2)).unwrap());
/// store.insert("apple", 1);
/// store.insert("banana", 2);
///
/// // "apple" becomes most recently used
/// assert_eq!(store.get(&"apple"), Some(&1));
///
/// // so "banana" is the victim
/// assert_eq!(store.insert("cherry", 3), Some(("banana", 2)));
/// assert_eq!(store.len(), 2);
/// ```
///
/// # Safety
///
/// The index holds raw pointers into `list`. They are valid as long as:
/// - the pointer was obtained from the list's `add()`
/// - the node has not been removed from the list
/// - the store has not been dropped
pub struct EntryStore<K, V, P = LruPolicy, S = DefaultHashBuilder> {
    capacity: Capacity,
    list: List<CacheEntry<K, V>>,
    map: HashMap<K, NonNull<Node<K, V>>, S>,
    policy: P,
    clock: u64,
}

// SAFETY: EntryStore owns all data and raw pointers point only to nodes owned by `list`.
unsafe impl<K: Send, V: Send, P: Send, S: Send> Send for EntryStore<K, V, P, S> {}

// SAFETY: All mutation requires &mut self; shared references cannot cause data races.
unsafe impl<K: Sync, V: Sync, P: Sync, S: Sync> Sync for EntryStore<K, V, P, S> {}

impl<K: Hash + Eq, V, P: EvictionPolicy + Default> EntryStore<K, V, P, DefaultHashBuilder> {
    /// Creates an empty store with the default policy and hasher.
    pub fn new(capacity: Capacity) -> Self {
        Self::with_policy(capacity, P::default())
    }
}

impl<K: Hash + Eq, V, P: EvictionPolicy> EntryStore<K, V, P, DefaultHashBuilder> {
    /// Creates an empty store with the given eviction policy.
    pub fn with_policy(capacity: Capacity, policy: P) -> Self {
        Self::with_policy_and_hasher(capacity, policy, DefaultHashBuilder::default())
    }
}

impl<K: Hash + Eq, V, P: EvictionPolicy, S: BuildHasher> EntryStore<K, V, P, S> {
    pub fn with_policy_and_hasher(capacity: Capacity, policy: P, hash_builder: S) -> Self {
        EntryStore {
            capacity,
            list: List::new(),
            map: HashMap::with_capacity_and_hasher(capacity.index_hint(), hash_builder),
            policy,
            clock: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    #[inline]
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Looks up `key` and, on a hit, makes it the most recently used entry.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = self.map.get(key).copied()?;
        let tick = self.tick();
        // SAFETY: node comes from our map
        unsafe {
            self.list.move_to_front(node.as_ptr());
            let entry = (*node.as_ptr()).get_value_mut();
            entry.meta.touch(tick);
            Some(&entry.value)
        }
    }

    /// Looks up `key` without touching its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = self.map.get(key).copied()?;
        // SAFETY: node comes from our map
        unsafe { Some(&(*node.as_ptr()).get_value().value) }
    }

    /// Metadata of `key`'s entry, without touching its recency.
    pub fn meta<Q>(&self, key: &Q) -> Option<EntryMeta>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = self.map.get(key).copied()?;
        // SAFETY: node comes from our map
        unsafe { Some((*node.as_ptr()).get_value().meta) }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.contains_key(key)
    }

    /// Removes `key` and returns its value. Not counted as an eviction.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = self.map.remove(key)?;
        // SAFETY: node comes from our map and was just unindexed
        unsafe {
            let boxed = self.list.remove(node.as_ptr())?;
            Some(boxed.into_value().value)
        }
    }

    /// The store's entries in recency order, for policies and inspection.
    pub fn order(&self) -> RecencyOrder<'_, K, V> {
        RecencyOrder::new(&self.list)
    }

    /// Entries from most to least recently used. Does not touch recency.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: self.list.nodes(),
        }
    }

    /// Empties the index and the list.
    pub fn clear(&mut self) {
        self.map.clear();
        self.list.clear();
        self.clock = 0;
    }

    /// Evicts the entry the policy selects, if any.
    pub fn pop_victim(&mut self) -> Option<(K, V)> {
        let victim = self.policy.select_victim(&self.order())?.node();
        // SAFETY: the policy returned a node of our own list
        unsafe { self.unlink(victim) }
    }

    /// Removes a node from both structures.
    ///
    /// # Safety
    ///
    /// `node` must be a live node of `self.list`.
    unsafe fn unlink(&mut self, node: NonNull<Node<K, V>>) -> Option<(K, V)> {
        // SAFETY: guaranteed by the caller
        let entry = unsafe { self.list.remove(node.as_ptr())?.into_value() };
        self.map.remove(&entry.key);
        Some(entry.into_pair())
    }

    /// Changes the bound, evicting victims one at a time until the store fits.
    ///
    /// Returns the evicted entries in eviction order.
    pub fn set_capacity(&mut self, capacity: Capacity) -> Vec<(K, V)> {
        self.capacity = capacity;
        let mut evicted = Vec::new();
        while capacity.is_exceeded_by(self.len()) {
            match self.pop_victim() {
                Some(pair) => evicted.push(pair),
                None => break,
            }
        }
        evicted
    }

    /// Verifies that the index and the recency list agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.map.len() != self.list.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but recency list holds {}",
                self.map.len(),
                self.list.len()
            )));
        }
        if self.capacity.is_exceeded_by(self.len()) {
            return Err(InvariantError::new(format!(
                "{} entries exceed capacity {}",
                self.len(),
                self.capacity
            )));
        }
        let mut newer: Option<u64> = None;
        for node in self.list.nodes() {
            // SAFETY: nodes yielded by the list are live and initialized
            let entry = unsafe { (*node.as_ptr()).get_value() };
            if self.map.get(&entry.key).copied() != Some(node) {
                return Err(InvariantError::new(
                    "recency list holds an entry the index does not point to",
                ));
            }
            if newer.is_some_and(|tick| tick <= entry.meta.last_access) {
                return Err(InvariantError::new(
                    "recency list is not ordered by last access",
                ));
            }
            newer = Some(entry.meta.last_access);
        }
        Ok(())
    }
}

impl<K: Hash + Eq + Clone, V, P: EvictionPolicy, S: BuildHasher> EntryStore<K, V, P, S> {
    /// Inserts at the most recently used end.
    ///
    /// If the store was full, the policy's victim is evicted first and
    /// returned. Returns `None` when nothing was evicted, which is always the
    /// case for unbounded stores. Inserting a key that is already present
    /// replaces its value in place, makes it most recently used, and evicts
    /// nothing.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(node) = self.map.get(&key).copied() {
            let tick = self.tick();
            // SAFETY: node comes from our map
            unsafe {
                self.list.move_to_front(node.as_ptr());
                let entry = (*node.as_ptr()).get_value_mut();
                entry.value = value;
                entry.meta.last_access = tick;
            }
            return None;
        }

        let evicted = if self.capacity.is_full(self.len()) {
            self.pop_victim()
        } else {
            None
        };

        let tick = self.tick();
        let node = self.list.add(CacheEntry::new(key.clone(), value, tick));
        self.map.insert(key, node);
        evicted
    }
}

impl<K, V, P: EvictionPolicy, S> fmt::Debug for EntryStore<K, V, P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryStore")
            .field("capacity", &self.capacity)
            .field("len", &self.list.len())
            .field("policy", &self.policy.name())
            .finish()
    }
}

/// Iterator over a store's entries, most recently used first.
pub struct Iter<'a, K, V> {
    nodes: Nodes<'a, CacheEntry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.next()?;
        // SAFETY: the store is borrowed for 'a, so the node stays live
        let entry = unsafe { (*node.as_ptr()).get_value() };
        Some((&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("remaining", &self.nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{FifoPolicy, LfuPolicy};
    use alloc::string::String;
    use alloc::vec;

    fn bounded(n: usize) -> Capacity {
        Capacity::from_option(Some(n)).unwrap()
    }

    fn keys<K: Copy, V, P, S>(store: &EntryStore<K, V, P, S>) -> Vec<K>
    where
        K: Hash + Eq,
        P: EvictionPolicy,
        S: BuildHasher,
    {
        store.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_store_get_insert() {
        let mut store: EntryStore<&str, i32> = EntryStore::new(bounded(2));
        assert_eq!(store.insert("apple", 1), None);
        assert_eq!(store.insert("banana", 2), None);
        assert_eq!(store.get(&"apple"), Some(&1));
        assert_eq!(store.get(&"banana"), Some(&2));
        assert_eq!(store.get(&"cherry"), None);
        assert_eq!(store.insert("cherry", 3), Some(("apple", 1)));
        assert_eq!(store.get(&"apple"), None);
        assert_eq!(store.len(), 2);
        store.check_invariants().unwrap();
    }

    #[test]
    fn test_store_lru_without_access_evicts_first_insert() {
        let mut store: EntryStore<u32, u32> = EntryStore::new(bounded(3));
        for k in 1..=3 {
            assert_eq!(store.insert(k, k * 10), None);
        }
        assert_eq!(store.insert(4, 40), Some((1, 10)));
        assert_eq!(keys(&store), vec![4, 3, 2]);
    }

    #[test]
    fn test_store_get_protects_from_eviction() {
        let mut store: EntryStore<u32, u32> = EntryStore::new(bounded(3));
        for k in 1..=3 {
            store.insert(k, k);
        }
        store.get(&1);
        assert_eq!(store.insert(4, 4), Some((2, 2)));
        assert_eq!(keys(&store), vec![4, 1, 3]);
    }

    #[test]
    fn test_store_peek_does_not_touch_recency() {
        let mut store: EntryStore<u32, u32> = EntryStore::new(bounded(2));
        store.insert(1, 1);
        store.insert(2, 2);
        assert_eq!(store.peek(&1), Some(&1));
        assert_eq!(store.insert(3, 3), Some((1, 1)));
        assert!(!store.contains_key(&1));
    }

    #[test]
    fn test_store_reinsert_replaces_without_eviction() {
        let mut store: EntryStore<u32, &str> = EntryStore::new(bounded(2));
        store.insert(1, "one");
        store.insert(2, "two");
        assert_eq!(store.insert(1, "uno"), None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.peek(&1), Some(&"uno"));
        assert_eq!(keys(&store), vec![1, 2]);
        store.check_invariants().unwrap();
    }

    #[test]
    fn test_store_unbounded_never_evicts() {
        let mut store: EntryStore<u32, u32> = EntryStore::new(Capacity::Unbounded);
        for k in 0..1000 {
            assert_eq!(store.insert(k, k), None);
        }
        assert_eq!(store.len(), 1000);
        store.check_invariants().unwrap();
    }

    #[test]
    fn test_store_remove() {
        let mut store: EntryStore<String, u32> = EntryStore::new(bounded(2));
        store.insert(String::from("a"), 1);
        store.insert(String::from("b"), 2);
        assert_eq!(store.remove("a"), Some(1));
        assert_eq!(store.remove("a"), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.insert(String::from("c"), 3), None);
        store.check_invariants().unwrap();
    }

    #[test]
    fn test_store_clear() {
        let mut store: EntryStore<u32, u32> = EntryStore::new(bounded(4));
        for k in 0..4 {
            store.insert(k, k);
        }
        store.clear();
        assert!(store.is_empty());
        assert!(store.order().is_empty());
        assert_eq!(store.get(&0), None);
        store.insert(9, 9);
        assert_eq!(store.meta(&9).unwrap().inserted_at, 1);
        store.check_invariants().unwrap();
    }

    #[test]
    fn test_store_set_capacity_shrinks_lru_first() {
        let mut store: EntryStore<u32, u32> = EntryStore::new(bounded(5));
        for k in 1..=5 {
            store.insert(k, k);
        }
        store.get(&1);
        let evicted = store.set_capacity(bounded(2));
        assert_eq!(evicted, vec![(2, 2), (3, 3), (4, 4)]);
        assert_eq!(keys(&store), vec![1, 5]);

        // Growing evicts nothing
        assert!(store.set_capacity(Capacity::Unbounded).is_empty());
        assert_eq!(store.capacity(), Capacity::Unbounded);
        store.check_invariants().unwrap();
    }

    #[test]
    fn test_store_meta_tracks_hits() {
        let mut store: EntryStore<u32, u32> = EntryStore::new(bounded(2));
        store.insert(1, 1);
        store.get(&1);
        store.get(&1);
        let meta = store.meta(&1).unwrap();
        assert_eq!(meta.hits, 2);
        assert_eq!(meta.inserted_at, 1);
        assert_eq!(meta.last_access, 3);
    }

    #[test]
    fn test_store_fifo_policy() {
        let mut store: EntryStore<u32, u32, FifoPolicy> = EntryStore::new(bounded(2));
        store.insert(1, 1);
        store.insert(2, 2);
        store.get(&1);
        // FIFO ignores the hit on 1
        assert_eq!(store.insert(3, 3), Some((1, 1)));
        assert_eq!(store.policy().name(), "FIFO");
    }

    #[test]
    fn test_store_lfu_policy() {
        let mut store: EntryStore<u32, u32, LfuPolicy> = EntryStore::new(bounded(3));
        store.insert(1, 1);
        store.insert(2, 2);
        store.insert(3, 3);
        store.get(&1);
        store.get(&1);
        store.get(&3);
        assert_eq!(store.insert(4, 4), Some((2, 2)));
        // 4 has no hits and is the only zero-hit entry left
        assert_eq!(store.insert(5, 5), Some((4, 4)));
    }

    #[test]
    fn test_store_order_view() {
        let mut store: EntryStore<u32, u32> = EntryStore::new(bounded(3));
        store.insert(1, 10);
        store.insert(2, 20);
        store.get(&1);
        let order = store.order();
        assert_eq!(order.least_recent().map(|e| *e.key()), Some(2));
        assert_eq!(order.most_recent().map(|e| *e.value()), Some(10));
    }

    #[test]
    fn test_store_concurrent_access_behind_mutex() {
        extern crate std;
        use std::sync::{Arc, Mutex};
        use std::thread;

        let store = Arc::new(Mutex::new(EntryStore::<u64, u64>::new(bounded(50))));
        let mut handles = Vec::new();

        for t in 0..8u64 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..500u64 {
                    let mut guard = store.lock().unwrap();
                    if i % 2 == 0 {
                        guard.insert(i % 100, t * 1000 + i);
                    } else {
                        let _ = guard.get(&(i % 100));
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let guard = store.lock().unwrap();
        assert!(guard.len() <= 50);
        guard.check_invariants().unwrap();
    }
}
