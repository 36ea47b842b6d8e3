//! W-TinyLFU (Windowed TinyLFU) eviction policy.
//!
//! A small admission window in front of a segmented main area, with a
//! Count-Min Sketch arbitrating admission. New entries prove themselves in
//! the Window; when it overflows, the displaced candidate is admitted to
//! the Probationary segment only if its sketch estimate beats the estimate
//! of the entry it would displace. Re-accessed probationary entries are
//! promoted to Protected.
//!
//! ## Architecture
//!
//! ```text
//!   WINDOW (W, ~1%)            MAIN AREA
//!   head         tail          ┌──────────────────────────────────────┐
//!    ▼             ▼           │ PROBATIONARY (P)     PROTECTED (T)   │
//!   [old] ◄──► [new]           │ head ◄──► tail       head ◄──► tail  │
//!    │                         │  ▲  hit: promote ──────►  tail       │
//!    │ overflow: candidate C   │  │                   overflow: demote│
//!    ▼                         │  │◄──────────────────── head         │
//!   admission: estimate(C) vs  │                                      │
//!   estimate(P head); loser    └──────────────────────────────────────┘
//!   is discarded
//!
//!   every touch: sketch.increment(hash)
//! ```
//!
//! Sizing: `|W| = max(1, capacity/100)`, `|T| = max(1, (capacity-|W|)*4/5)`,
//! `|P| = max(1, capacity - |W| - |T|)`. Small capacities round; each region
//! keeps at least one slot.
//!
//! ## Operations
//!
//! | Operation  | Time | Notes                                         |
//! |------------|------|-----------------------------------------------|
//! | `get`      | O(1) | Sketch bump + region move; lazy TTL           |
//! | `set`      | O(1) | Window overflow runs one admission round      |
//! | `remove`   | O(1) | Unlinks from the tagged region                |
//! | `contains` | O(1) | No sketch or region update                    |
//!
//! ## References
//!
//! - Einziger et al., "TinyLFU: A Highly Efficient Cache Admission Policy"

use crate::clock::Clock;
use crate::ds::frequency_sketch::FrequencySketch;
use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::node_pool::{Node, NodePool, NodeRef};
use crate::error::CacheError;
use crate::store::node_map::NodeMap;

#[cfg(feature = "metrics")]
use crate::metrics::CacheMetrics;

/// Which region a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Region {
    Window,
    Probationary,
    Protected,
}

/// W-TinyLFU policy core over the shared pool/list/map substrate plus a
/// per-instance Count-Min Sketch.
///
/// # Example
///
/// ```
/// use shardcache::clock::Clock;
/// use shardcache::policy::tiny_lfu::TinyLfuCore;
///
/// let mut cache: TinyLfuCore<u64, &str> = TinyLfuCore::new(100, 100, Clock::new());
/// cache.set(1, "hot", None, 1).unwrap();
/// cache.get(&1, 1);
/// cache.get(&1, 1);
/// assert_eq!(cache.get(&1, 1), Some(&"hot"));
/// ```
#[derive(Debug)]
pub struct TinyLfuCore<K, V> {
    pool: NodePool<K, V, Region>,
    map: NodeMap<K, V, Region>,
    window: IntrusiveList,
    probationary: IntrusiveList,
    protected: IntrusiveList,
    window_cap: usize,
    probationary_cap: usize,
    protected_cap: usize,
    sketch: FrequencySketch,
    capacity: usize,
    clock: Clock,
    #[cfg(feature = "metrics")]
    metrics: CacheMetrics,
}

impl<K: Eq, V> TinyLfuCore<K, V> {
    /// Creates a W-TinyLFU core for `capacity` entries, with `pool_size`
    /// nodes preallocated.
    ///
    /// The sketch is sized to `capacity` (width rounded up to a power of
    /// two) and belongs to this instance; one sketch per shard.
    pub fn new(capacity: usize, pool_size: usize, clock: Clock) -> Self {
        debug_assert!(capacity > 0);
        let window_cap = (capacity / 100).max(1);
        let rest = capacity.saturating_sub(window_cap);
        let protected_cap = (rest * 4 / 5).max(1);
        let probationary_cap = rest.saturating_sub(protected_cap).max(1);

        Self {
            pool: NodePool::with_capacity(pool_size),
            map: NodeMap::with_capacity(capacity),
            window: IntrusiveList::new(),
            probationary: IntrusiveList::new(),
            protected: IntrusiveList::new(),
            window_cap,
            probationary_cap,
            protected_cap,
            sketch: FrequencySketch::new(capacity),
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

    /// Returns the number of entries in the Window.
    #[inline]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Returns the number of entries in the Probationary segment.
    #[inline]
    pub fn probationary_len(&self) -> usize {
        self.probationary.len()
    }

    /// Returns the number of entries in the Protected segment.
    #[inline]
    pub fn protected_len(&self) -> usize {
        self.protected.len()
    }

    /// Retrieves a value by key, bumping the sketch and applying the
    /// region's on-hit move. Expired entries are reaped and reported
    /// absent.
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

        self.sketch.increment(hash);
        match self.pool[id].meta {
            Region::Window => self.window.move_to_back(&mut self.pool, id),
            Region::Protected => self.protected.move_to_back(&mut self.pool, id),
            Region::Probationary => self.promote_to_protected(id),
        }

        #[cfg(feature = "metrics")]
        {
            self.metrics.hits += 1;
        }
        Some(&self.pool[id].value)
    }

    /// Inserts or replaces an entry.
    ///
    /// New keys enter the Window; overflow pops the Window head and runs
    /// one admission round against the Probationary head. Overwriting an
    /// existing key updates value and expiry in place and refreshes its
    /// position without changing region.
    pub fn set(
        &mut self,
        key: K,
        value: V,
        ttl_ms: Option<u64>,
        hash: u64,
    ) -> Result<(), CacheError> {
        let expiry = ttl_ms.map(|ttl| self.clock.now_millis().saturating_add(ttl));

        if let Some(id) = self.map.find(&self.pool, &key, hash) {
            self.sketch.increment(hash);
            let node = &mut self.pool[id];
            node.value = value;
            node.expiry = expiry;
            match node.meta {
                Region::Window => self.window.move_to_back(&mut self.pool, id),
                Region::Probationary => self.probationary.move_to_back(&mut self.pool, id),
                Region::Protected => self.protected.move_to_back(&mut self.pool, id),
            }
            #[cfg(feature = "metrics")]
            {
                self.metrics.updates += 1;
            }
            return Ok(());
        }

        self.sketch.increment(hash);
        let id = self
            .pool
            .acquire(Node::new(key, value, hash, expiry, Region::Window))?;
        if let Err(err) = self.map.insert(&self.pool, id, hash) {
            self.pool.release(id);
            return Err(err);
        }
        self.window.push_back(&mut self.pool, id);

        while self.window.len() > self.window_cap {
            let Some(candidate) = self.window.pop_front(&mut self.pool) else {
                break;
            };
            self.admit_to_main(candidate);
        }

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
                self.unlink_tagged(id);
                self.pool.release(id);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `key` maps to a live (unexpired) entry.
    ///
    /// Does not touch the sketch or any region and never mutates the cache.
    pub fn contains(&self, key: &K, hash: u64) -> bool {
        match self.map.find(&self.pool, key, hash) {
            Some(id) => !self.pool[id].expired_at(self.clock.now_millis()),
            None => false,
        }
    }

    /// Drops every entry and resets the sketch.
    pub fn clear(&mut self) {
        self.window.clear(&mut self.pool);
        self.probationary.clear(&mut self.pool);
        self.protected.clear(&mut self.pool);
        self.map.clear();
        self.pool.clear();
        self.sketch.clear();
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

    /// Moves a probationary entry to the Protected tail, demoting the
    /// Protected head back to Probationary when Protected is full.
    fn promote_to_protected(&mut self, id: NodeRef) {
        self.probationary.unlink(&mut self.pool, id);
        if self.protected.len() >= self.protected_cap {
            if let Some(demoted) = self.protected.pop_front(&mut self.pool) {
                self.pool[demoted].meta = Region::Probationary;
                self.probationary.push_back(&mut self.pool, demoted);
            }
        }
        self.pool[id].meta = Region::Protected;
        self.protected.push_back(&mut self.pool, id);
    }

    /// One admission round for a candidate popped off the Window.
    ///
    /// With room in Probationary the candidate is admitted outright.
    /// Otherwise the sketch arbitrates: the Probationary head survives
    /// only if its estimate strictly beats the candidate's.
    fn admit_to_main(&mut self, candidate: NodeRef) {
        if self.probationary.len() < self.probationary_cap {
            self.pool[candidate].meta = Region::Probationary;
            self.probationary.push_back(&mut self.pool, candidate);
            return;
        }

        let Some(victim) = self.probationary.front() else {
            self.pool[candidate].meta = Region::Probationary;
            self.probationary.push_back(&mut self.pool, candidate);
            return;
        };

        let victim_estimate = self.sketch.estimate(self.pool[victim].hash);
        let candidate_estimate = self.sketch.estimate(self.pool[candidate].hash);
        if victim_estimate > candidate_estimate {
            self.release_entry(candidate);
        } else {
            self.probationary.unlink(&mut self.pool, victim);
            self.release_entry(victim);
            self.pool[candidate].meta = Region::Probationary;
            self.probationary.push_back(&mut self.pool, candidate);
        }
    }

    /// Map-removes and pool-releases an already unlinked node.
    fn release_entry(&mut self, id: NodeRef) {
        let hash = self.pool[id].hash;
        self.map.remove_ref(id, hash);
        self.pool.release(id);
        #[cfg(feature = "metrics")]
        {
            self.metrics.evictions += 1;
        }
    }

    /// Unlinks a node from whichever region its tag names.
    fn unlink_tagged(&mut self, id: NodeRef) {
        match self.pool[id].meta {
            Region::Window => self.window.unlink(&mut self.pool, id),
            Region::Probationary => self.probationary.unlink(&mut self.pool, id),
            Region::Protected => self.protected.unlink(&mut self.pool, id),
        }
    }

    fn evict_entry(&mut self, id: NodeRef) {
        self.unlink_tagged(id);
        let hash = self.pool[id].hash;
        self.map.remove_ref(id, hash);
        self.pool.release(id);
    }

    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) -> Result<(), String> {
        let total = self.window.len() + self.probationary.len() + self.protected.len();
        if self.map.len() != total {
            return Err(format!(
                "map has {} entries but regions hold {}",
                self.map.len(),
                total
            ));
        }
        if self.window.len() > self.window_cap {
            return Err(format!(
                "window length {} exceeds cap {}",
                self.window.len(),
                self.window_cap
            ));
        }
        if self.protected.len() > self.protected_cap {
            return Err(format!(
                "protected length {} exceeds cap {}",
                self.protected.len(),
                self.protected_cap
            ));
        }
        if self.probationary.len() > self.probationary_cap {
            return Err(format!(
                "probationary length {} exceeds cap {}",
                self.probationary.len(),
                self.probationary_cap
            ));
        }
        for (list, region) in [
            (&self.window, Region::Window),
            (&self.probationary, Region::Probationary),
            (&self.protected, Region::Protected),
        ] {
            for id in list.iter(&self.pool) {
                let node = &self.pool[id];
                if node.meta != region {
                    return Err(format!(
                        "node tagged {:?} linked in {:?} list",
                        node.meta, region
                    ));
                }
                if self.map.find(&self.pool, &node.key, node.hash) != Some(id) {
                    return Err("linked node not registered in map".to_string());
                }
            }
            list.debug_validate_invariants(&self.pool);
        }
        self.pool.debug_validate_invariants();
        Ok(())
    }
}
