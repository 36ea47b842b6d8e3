//! FIFO (First In, First Out) eviction policy.
//!
//! The simplest policy: one intrusive queue in insertion order. Hits do not
//! reorder anything, so `get` costs a map lookup plus an expiry check.
//! When the queue is full, the oldest entry is evicted regardless of how
//! recently it was accessed.
//!
//! ## Architecture
//!
//! ```text
//!   queue (insertion order)
//!   head                      tail
//!    ▼                          ▼
//!   [oldest] ◄──► ... ◄──► [newest]
//!    ▲                          ▲
//!    evict here            insert here
//! ```
//!
//! ## Operations
//!
//! | Operation  | Time | Notes                               |
//! |------------|------|-------------------------------------|
//! | `get`      | O(1) | No reordering; lazy TTL check       |
//! | `set`      | O(1) | May evict the queue head            |
//! | `remove`   | O(1) | Unlinks and recycles the node       |
//! | `contains` | O(1) | No metadata update                  |
//!
//! Invariant: `queue.len() <= capacity` after every operation.

use crate::clock::Clock;
use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::node_pool::{Node, NodePool, NodeRef};
use crate::error::CacheError;
use crate::store::node_map::NodeMap;

#[cfg(feature = "metrics")]
use crate::metrics::CacheMetrics;

/// FIFO policy core over the shared pool/list/map substrate.
///
/// Operations take the key's precomputed 64-bit hash; the sharded front
/// ends hash each key once and pass the hash down.
///
/// # Example
///
/// ```
/// use shardcache::clock::Clock;
/// use shardcache::policy::fifo::FifoCore;
///
/// let mut cache: FifoCore<u64, &str> = FifoCore::new(2, 2, Clock::new());
/// cache.set(1, "a", None, 1).unwrap();
/// cache.set(2, "b", None, 2).unwrap();
/// cache.set(3, "c", None, 3).unwrap();
///
/// // 1 was inserted first, so it was evicted.
/// assert_eq!(cache.get(&1, 1), None);
/// assert_eq!(cache.get(&3, 3), Some(&"c"));
/// ```
#[derive(Debug)]
pub struct FifoCore<K, V> {
    pool: NodePool<K, V, ()>,
    map: NodeMap<K, V, ()>,
    queue: IntrusiveList,
    capacity: usize,
    clock: Clock,
    #[cfg(feature = "metrics")]
    metrics: CacheMetrics,
}

impl<K: Eq, V> FifoCore<K, V> {
    /// Creates a FIFO core holding at most `capacity` entries, with
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

    /// Retrieves a value by key. Expired entries are reaped and reported
    /// absent. FIFO applies no on-hit update.
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

        #[cfg(feature = "metrics")]
        {
            self.metrics.hits += 1;
        }
        Some(&self.pool[id].value)
    }

    /// Inserts or replaces an entry, evicting the queue head when full.
    ///
    /// `ttl_ms` of `None` means the entry never expires. A failed `set`
    /// leaves the cache structurally unchanged.
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
    /// Does not update any policy metadata and never mutates the cache.
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
