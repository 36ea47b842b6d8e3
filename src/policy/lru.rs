//! LRU (Least Recently Used) eviction policy.
//!
//! One intrusive queue in recency order: every hit moves the touched node
//! to the tail, so the head is always the least recently used entry and is
//! the one evicted when the cache is full.
//!
//! ## Architecture
//!
//! ```text
//!   queue (recency order)
//!   head                       tail
//!    ▼                           ▼
//!   [coldest] ◄──► ... ◄──► [hottest]
//!    ▲                           ▲
//!    evict here        hits/inserts land here
//! ```
//!
//! ## Operations
//!
//! | Operation  | Time | Notes                                    |
//! |------------|------|------------------------------------------|
//! | `get`      | O(1) | Moves the node to the tail; lazy TTL     |
//! | `set`      | O(1) | Overwrite refreshes recency; may evict   |
//! | `remove`   | O(1) | Unlinks and recycles the node            |
//! | `contains` | O(1) | No recency update                        |
//!
//! Invariant: `queue.len() <= capacity` after every operation.

use crate::clock::Clock;
use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::node_pool::{Node, NodePool, NodeRef};
use crate::error::CacheError;
use crate::store::node_map::NodeMap;

#[cfg(feature = "metrics")]
use crate::metrics::CacheMetrics;

/// LRU policy core over the shared pool/list/map substrate.
///
/// # Example
///
/// ```
/// use shardcache::clock::Clock;
/// use shardcache::policy::lru::LruCore;
///
/// let mut cache: LruCore<u64, &str> = LruCore::new(2, 2, Clock::new());
/// cache.set(1, "a", None, 1).unwrap();
/// cache.set(2, "b", None, 2).unwrap();
///
/// // Touching 1 makes 2 the least recently used entry.
/// cache.get(&1, 1);
/// cache.set(3, "c", None, 3).unwrap();
///
/// assert_eq!(cache.get(&2, 2), None);
/// assert_eq!(cache.get(&1, 1), Some(&"a"));
/// ```
#[derive(Debug)]
pub struct LruCore<K, V> {
    pool: NodePool<K, V, ()>,
    map: NodeMap<K, V, ()>,
    queue: IntrusiveList,
    capacity: usize,
    clock: Clock,
    #[cfg(feature = "metrics")]
    metrics: CacheMetrics,
}

impl<K: Eq, V> LruCore<K, V> {
    /// Creates an LRU core holding at most `capacity` entries, with
    /// `pool_size` nodes preallocated.
    pub fn new(capacity: usize, pool_size: usize, clock: Clock) -> Self {
        debug_assert!(capacity > 0);
        Self {
            pool: NodePool::with_capacity(pool_size),
            map: NodeMap::with_capacity(capacity),
            queue: IntrusiveList::new(),
            capacity,
            clock,
            #[cfg(feature = "metrics")]
            metrics: CacheMetrics::default(),
        }
    }

    /// Returns the number of cached entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the cache is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the configured capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retrieves a value by key, refreshing its recency.
    ///
    /// Expired entries are reaped and reported absent.
    pub fn get(&mut self, key: &K, hash: u64) -> Option<&V> {
        let Some(id) = self.map.find(&self.pool, key, hash) else {
            #[cfg(feature = "metrics")]
            {
                self.metrics.misses += 1;
            }
            return None;
        };

        if self.pool[id].expired_at(self.clock.now_millis()) {
            self.evict_entry(id);
            #[cfg(feature = "metrics")]
            {
                self.metrics.misses += 1;
                self.metrics.expirations += 1;
            }
            return None;
        }

        self.queue.move_to_back(&mut self.pool, id);
        #[cfg(feature = "metrics")]
        {
            self.metrics.hits += 1;
        }
        Some(&self.pool[id].value)
    }

    /// Inserts or replaces an entry, evicting the least recently used one
    /// when full. Overwriting refreshes the entry's recency.
    pub fn set(
        &mut self,
        key: K,
        value: V,
        ttl_ms: Option<u64>,
        hash: u64,
    ) -> Result<(), CacheError> {
        let expiry = ttl_ms.map(|ttl| self.clock.now_millis().saturating_add(ttl));

        if let Some(id) = self.map.find(&self.pool, &key, hash) {
            let node = &mut self.pool[id];
            node.value = value;
            node.expiry = expiry;
            self.queue.move_to_back(&mut self.pool, id);
            #[cfg(feature = "metrics")]
            {
                self.metrics.updates += 1;
            }
            return Ok(());
        }

        let id = self.pool.acquire(Node::new(key, value, hash, expiry, ()))?;
        if let Err(err) = self.map.insert(&self.pool, id, hash) {
            self.pool.release(id);
            return Err(err);
        }

        if self.queue.len() >= self.capacity {
            if let Some(victim) = self.queue.pop_front(&mut self.pool) {
                let victim_hash = self.pool[victim].hash;
                self.map.remove_ref(victim, victim_hash);
                self.pool.release(victim);
                #[cfg(feature = "metrics")]
                {
                    self.metrics.evictions += 1;
                }
            }
        }
        self.queue.push_back(&mut self.pool, id);

        #[cfg(feature = "metrics")]
        {
            self.metrics.inserts += 1;
        }
        Ok(())
    }

    /// Removes an entry; returns `true` if the key was present.
    pub fn remove(&mut self, key: &K, hash: u64) -> bool {
        match self.map.remove(&self.pool, key, hash) {
            Some(id) => {
                self.queue.unlink(&mut self.pool, id);
                self.pool.release(id);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `key` maps to a live (unexpired) entry.
    ///
    /// Does not update recency and never mutates the cache.
    pub fn contains(&self, key: &K, hash: u64) -> bool {
        match self.map.find(&self.pool, key, hash) {
            Some(id) => !self.pool[id].expired_at(self.clock.now_millis()),
            None => false,
        }
    }

    /// Drops every entry, keeping allocations for reuse.
    pub fn clear(&mut self) {
        self.queue.clear(&mut self.pool);
        self.map.clear();
        self.pool.clear();
    }

    /// Returns operation counters (feature `metrics`).
    #[cfg(feature = "metrics")]
    #[inline]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Resets operation counters to zero (feature `metrics`).
    #[cfg(feature = "metrics")]
    #[inline]
    pub fn reset_metrics(&mut self) {
        self.metrics = CacheMetrics::default();
    }

    fn evict_entry(&mut self, id: NodeRef) {
        let hash = self.pool[id].hash;
        self.map.remove_ref(id, hash);
        self.queue.unlink(&mut self.pool, id);
        self.pool.release(id);
    }

    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.map.len() != self.queue.len() {
            return Err(format!(
                "map has {} entries but queue has {}",
                self.map.len(),
                self.queue.len()
            ));
        }
        if self.queue.len() > self.capacity {
            return Err(format!(
                "queue length {} exceeds capacity {}",
                self.queue.len(),
                self.capacity
            ));
        }
        for id in self.queue.iter(&self.pool) {
            let node = &self.pool[id];
            if self.map.find(&self.pool, &node.key, node.hash) != Some(id) {
                return Err("queued node not registered in map".to_string());
            }
        }
        self.queue.debug_validate_invariants(&self.pool);
        self.pool.debug_validate_invariants();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> LruCore<u64, &'static str> {
        LruCore::new(capacity, capacity, Clock::new())
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = cache(3);
        cache.set(1, "a", None, 1).unwrap();
        cache.set(2, "b", None, 2).unwrap();
        cache.set(3, "c", None, 3).unwrap();

        // 1 becomes most recent; 2 is now the LRU entry.
        assert_eq!(cache.get(&1, 1), Some(&"a"));
        cache.set(4, "d", None, 4).unwrap();

        assert_eq!(cache.get(&2, 2), None);
        assert_eq!(cache.get(&1, 1), Some(&"a"));
        assert_eq!(cache.get(&3, 3), Some(&"c"));
        assert_eq!(cache.get(&4, 4), Some(&"d"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn overwrite_refreshes_recency() {
        let mut cache = cache(2);
        cache.set(1, "a", None, 1).unwrap();
        cache.set(2, "b", None, 2).unwrap();

        // Overwriting 1 makes it most recent, so 2 is evicted next.
        cache.set(1, "a2", None, 1).unwrap();
        cache.set(3, "c", None, 3).unwrap();

        assert_eq!(cache.get(&2, 2), None);
        assert_eq!(cache.get(&1, 1), Some(&"a2"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn contains_does_not_refresh_recency() {
        let mut cache = cache(2);
        cache.set(1, "a", None, 1).unwrap();
        cache.set(2, "b", None, 2).unwrap();

        // contains must not save 1 from eviction.
        assert!(cache.contains(&1, 1));
        cache.set(3, "c", None, 3).unwrap();
        assert_eq!(cache.get(&1, 1), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut cache = cache(2);
        cache.set(1, "a", None, 1).unwrap();
        assert!(cache.remove(&1, 1));
        assert!(!cache.remove(&1, 1));
        assert!(cache.is_empty());
    }

    #[test]
    fn ttl_expiry_reaps_on_get() {
        let mut cache = cache(2);
        cache.set(1, "a", Some(20), 1).unwrap();
        cache.set(2, "b", Some(5_000), 2).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(40));
        assert_eq!(cache.get(&1, 1), None);
        assert_eq!(cache.get(&2, 2), Some(&"b"));
        assert_eq!(cache.len(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn expired_lru_entry_is_still_evicted_structurally() {
        let mut cache = cache(2);
        cache.set(1, "a", Some(10), 1).unwrap();
        cache.set(2, "b", None, 2).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(30));

        // 1 is expired but still occupies a slot until touched; a new
        // insert evicts it by position.
        cache.set(3, "c", None, 3).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&2, 2), Some(&"b"));
        assert_eq!(cache.get(&3, 3), Some(&"c"));
    }
}
