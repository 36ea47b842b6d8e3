//! S3-FIFO (Simple, Scalable, Scan-resistant FIFO) eviction policy.
//!
//! Three FIFO queues over one node pool: Small filters one-hit wonders,
//! Main holds proven-warm entries, and Ghost retains recently demoted
//! entries so a quick re-insert is admitted straight into Main. Each node
//! carries a saturating 2-bit frequency counter and a queue tag.
//!
//! ## Architecture
//!
//! ```text
//!   SMALL (S)                          MAIN (M)
//!   head                tail           head                tail
//!    ▼                    ▼             ▼                    ▼
//!   [oldest] ◄──► [newest]             [oldest] ◄──► [newest]
//!    │ pop on evict                     │ pop on evict
//!    │  freq > 0 ──► promote to M tail  │  freq > 0 ──► re-append, freq -= 1
//!    │  freq = 0 ──► demote to G tail   │  freq = 0 ──► release
//!    ▼                                  ▼
//!   GHOST (G) — value retained, still served by get;
//!               a set() on a ghosted key re-admits it to Main
//! ```
//!
//! Sizing: `|S| = max(1, capacity/10)`, `|M| = |G| = max(1, (capacity-|S|)/2)`.
//! The maximum total residency is the sum of the three caps; Ghost entries
//! occupy map slots and count toward `len`.
//!
//! ## Operations
//!
//! | Operation  | Time           | Notes                                    |
//! |------------|----------------|------------------------------------------|
//! | `get`      | O(1)           | Bumps `freq` unless ghosted; lazy TTL    |
//! | `set`      | amortized O(1) | Eviction loop bounded by region sizes    |
//! | `remove`   | O(1)           | Unlinks from the tagged queue            |
//! | `contains` | O(1)           | No frequency update                      |
//!
//! Small-to-Main promotion triggers on `freq > 0` rather than the paper's
//! `freq > 1`; the looser gate improves short-window hit rate.
//!
//! ## References
//!
//! - Yang et al., "FIFO queues are all you need for cache eviction", SOSP 2023

use crate::clock::Clock;
use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::node_pool::{Node, NodePool, NodeRef};
use crate::error::CacheError;
use crate::store::node_map::NodeMap;

#[cfg(feature = "metrics")]
use crate::metrics::CacheMetrics;

/// Maximum frequency value (2 bits).
const MAX_FREQ: u8 = 3;

/// Which queue a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueueKind {
    Small,
    Main,
    Ghost,
}

/// Per-node S3-FIFO metadata: queue tag plus 2-bit frequency.
#[derive(Debug, Clone, Copy)]
pub(crate) struct S3Meta {
    queue: QueueKind,
    freq: u8,
}

impl S3Meta {
    fn fresh() -> Self {
        Self {
            queue: QueueKind::Small,
            freq: 0,
        }
    }
}

/// S3-FIFO policy core over the shared pool/list/map substrate.
///
/// # Example
///
/// ```
/// use shardcache::clock::Clock;
/// use shardcache::policy::s3_fifo::S3FifoCore;
///
/// let mut cache: S3FifoCore<u64, &str> = S3FifoCore::new(10, 10, Clock::new());
/// cache.set(1, "hot", None, 1).unwrap();
/// cache.get(&1, 1); // freq bump: survives the Small queue
///
/// for i in 100..120 {
///     cache.set(i, "scan", None, i).unwrap();
/// }
/// assert_eq!(cache.get(&1, 1), Some(&"hot"));
/// ```
#[derive(Debug)]
pub struct S3FifoCore<K, V> {
    pool: NodePool<K, V, S3Meta>,
    map: NodeMap<K, V, S3Meta>,
    small: IntrusiveList,
    main: IntrusiveList,
    ghost: IntrusiveList,
    small_cap: usize,
    main_cap: usize,
    ghost_cap: usize,
    /// `small_cap + main_cap + ghost_cap`; eviction keeps residency below this.
    max_total: usize,
    capacity: usize,
    clock: Clock,
    #[cfg(feature = "metrics")]
    metrics: CacheMetrics,
}

impl<K: Eq, V> S3FifoCore<K, V> {
    /// Creates an S3-FIFO core for `capacity` entries, with `pool_size`
    /// nodes preallocated.
    ///
    /// Region caps are derived as `|S| = max(1, capacity/10)` and
    /// `|M| = |G| = max(1, (capacity - |S|)/2)`.
    pub fn new(capacity: usize, pool_size: usize, clock: Clock) -> Self {
        debug_assert!(capacity > 0);
        let small_cap = (capacity / 10).max(1);
        let main_cap = (capacity.saturating_sub(small_cap) / 2).max(1);
        let ghost_cap = main_cap;

        Self {
            pool: NodePool::with_capacity(pool_size),
            map: NodeMap::with_capacity(capacity),
            small: IntrusiveList::new(),
            main: IntrusiveList::new(),
            ghost: IntrusiveList::new(),
            small_cap,
            main_cap,
            ghost_cap,
            max_total: small_cap + main_cap + ghost_cap,
            capacity,
            clock,
            #[cfg(feature = "metrics")]
            metrics: CacheMetrics::default(),
        }
    }

    /// Returns the number of resident entries, Ghost included.
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

    /// Returns the number of entries in the Small queue.
    #[inline]
    pub fn small_len(&self) -> usize {
        self.small.len()
    }

    /// Returns the number of entries in the Main queue.
    #[inline]
    pub fn main_len(&self) -> usize {
        self.main.len()
    }

    /// Returns the number of entries in the Ghost queue.
    #[inline]
    pub fn ghost_len(&self) -> usize {
        self.ghost.len()
    }

    /// Retrieves a value by key, bumping its frequency unless ghosted.
    ///
    /// Ghost entries retain their value and are served here; a ghost hit
    /// does not change frequency or queue membership. Expired entries are
    /// reaped and reported absent.
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

        let node = &mut self.pool[id];
        if node.meta.queue != QueueKind::Ghost {
            node.meta.freq = (node.meta.freq + 1).min(MAX_FREQ);
        }
        #[cfg(feature = "metrics")]
        {
            self.metrics.hits += 1;
        }
        Some(&self.pool[id].value)
    }

    /// Inserts or replaces an entry.
    ///
    /// A key resident in Ghost is re-admitted: retagged Main and moved to
    /// the Main tail with its frequency preserved. A brand-new key enters
    /// the Small tail with `freq = 0` after the eviction loop has brought
    /// total residency under the cap.
    pub fn set(
        &mut self,
        key: K,
        value: V,
        ttl_ms: Option<u64>,
        hash: u64,
    ) -> Result<(), CacheError> {
        let expiry = ttl_ms.map(|ttl| self.clock.now_millis().saturating_add(ttl));

        if let Some(id) = self.map.find(&self.pool, &key, hash) {
            let ghosted = self.pool[id].meta.queue == QueueKind::Ghost;
            let node = &mut self.pool[id];
            node.value = value;
            node.expiry = expiry;
            if ghosted {
                node.meta.queue = QueueKind::Main;
                self.ghost.unlink(&mut self.pool, id);
                self.main.push_back(&mut self.pool, id);
            } else {
                node.meta.freq = (node.meta.freq + 1).min(MAX_FREQ);
            }
            #[cfg(feature = "metrics")]
            {
                self.metrics.updates += 1;
            }
            return Ok(());
        }

        let id = self
            .pool
            .acquire(Node::new(key, value, hash, expiry, S3Meta::fresh()))?;
        if let Err(err) = self.map.insert(&self.pool, id, hash) {
            self.pool.release(id);
            return Err(err);
        }

        while self.total_len() >= self.max_total {
            self.evict_one();
        }
        self.small.push_back(&mut self.pool, id);

        #[cfg(feature = "metrics")]
        {
            self.metrics.inserts += 1;
        }
        Ok(())
    }

    /// Removes an entry (Ghost included); returns `true` if present.
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

    /// Returns `true` if `key` maps to a live (unexpired) entry, Ghost
    /// included. Does not update frequency and never mutates the cache.
    pub fn contains(&self, key: &K, hash: u64) -> bool {
        match self.map.find(&self.pool, key, hash) {
            Some(id) => !self.pool[id].expired_at(self.clock.now_millis()),
            None => false,
        }
    }

    /// Drops every entry, keeping allocations for reuse.
    pub fn clear(&mut self) {
        self.small.clear(&mut self.pool);
        self.main.clear(&mut self.pool);
        self.ghost.clear(&mut self.pool);
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

    #[inline]
    fn total_len(&self) -> usize {
        self.small.len() + self.main.len() + self.ghost.len()
    }

    /// One eviction round: drain Small while it is at or over its share,
    /// otherwise work on Main.
    fn evict_one(&mut self) {
        if self.small.len() >= self.small_cap {
            self.evict_from_small();
        } else {
            self.evict_from_main();
        }
    }

    /// Pops the Small head: promotion to Main on `freq > 0` (note: the
    /// paper gates on `freq > 1`), demotion to Ghost otherwise. Demotion
    /// first releases the Ghost head when Ghost is at capacity.
    fn evict_from_small(&mut self) {
        let Some(id) = self.small.pop_front(&mut self.pool) else {
            return;
        };

        if self.pool[id].meta.freq > 0 {
            let node = &mut self.pool[id];
            node.meta.freq = 0;
            node.meta.queue = QueueKind::Main;
            self.main.push_back(&mut self.pool, id);
        } else {
            if self.ghost.len() >= self.ghost_cap {
                if let Some(gh) = self.ghost.pop_front(&mut self.pool) {
                    self.release_entry(gh);
                }
            }
            self.pool[id].meta.queue = QueueKind::Ghost;
            self.ghost.push_back(&mut self.pool, id);
        }
    }

    /// Pops Main heads, re-appending second-chance candidates with their
    /// frequency decremented, until one entry is fully released.
    fn evict_from_main(&mut self) {
        while let Some(id) = self.main.pop_front(&mut self.pool) {
            if self.pool[id].meta.freq > 0 {
                self.pool[id].meta.freq -= 1;
                self.main.push_back(&mut self.pool, id);
            } else {
                self.release_entry(id);
                return;
            }
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

    /// Unlinks a node from whichever queue its tag names.
    fn unlink_tagged(&mut self, id: NodeRef) {
        match self.pool[id].meta.queue {
            QueueKind::Small => self.small.unlink(&mut self.pool, id),
            QueueKind::Main => self.main.unlink(&mut self.pool, id),
            QueueKind::Ghost => self.ghost.unlink(&mut self.pool, id),
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
        let total = self.total_len();
        if self.map.len() != total {
            return Err(format!(
                "map has {} entries but queues hold {}",
                self.map.len(),
                total
            ));
        }
        if total > self.max_total {
            return Err(format!(
                "total residency {} exceeds max {}",
                total, self.max_total
            ));
        }
        for (list, kind) in [
            (&self.small, QueueKind::Small),
            (&self.main, QueueKind::Main),
            (&self.ghost, QueueKind::Ghost),
        ] {
            for id in list.iter(&self.pool) {
                let node = &self.pool[id];
                if node.meta.queue != kind {
                    return Err(format!(
                        "node tagged {:?} linked in {:?} queue",
                        node.meta.queue, kind
                    ));
                }
                if node.meta.freq > MAX_FREQ {
                    return Err(format!("freq {} above cap", node.meta.freq));
                }
                if self.map.find(&self.pool, &node.key, node.hash) != Some(id) {
                    return Err("queued node not registered in map".to_string());
                }
            }
            list.debug_validate_invariants(&self.pool);
        }
        self.pool.debug_validate_invariants();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> S3FifoCore<u64, &'static str> {
        S3FifoCore::new(capacity, capacity, Clock::new())
    }

    #[test]
    fn region_caps_follow_capacity() {
        let cache = cache(5);
        assert_eq!(cache.small_cap, 1);
        assert_eq!(cache.main_cap, 2);
        assert_eq!(cache.ghost_cap, 2);
        assert_eq!(cache.max_total, 5);

        let big = super::S3FifoCore::<u64, u64>::new(100, 100, Clock::new());
        assert_eq!(big.small_cap, 10);
        assert_eq!(big.main_cap, 45);
        assert_eq!(big.ghost_cap, 45);
    }

    #[test]
    fn accessed_entries_survive_via_promotion() {
        let mut cache = cache(5);
        for key in 1..=5 {
            cache.set(key, "v", None, key).unwrap();
        }
        for key in 1..=4 {
            assert!(cache.get(&key, key).is_some());
        }
        cache.set(6, "v", None, 6).unwrap();

        // 1..4 promoted to Main during the eviction sweep; 5 fell to
        // Ghost; the sweep released one Main entry to make room.
        assert_eq!(cache.get(&1, 1), None);
        for key in 2..=6 {
            assert!(cache.get(&key, key).is_some(), "key {} missing", key);
        }
        cache.check_invariants().unwrap();
    }

    #[test]
    fn ghost_entries_are_still_retrievable() {
        let mut cache = cache(5);
        for key in 1..=5 {
            cache.set(key, "v", None, key).unwrap();
        }
        // 5 was never accessed: the sweep demotes it to Ghost.
        for key in 1..=4 {
            cache.get(&key, key);
        }
        cache.set(6, "v", None, 6).unwrap();

        assert_eq!(cache.ghost_len(), 1);
        assert!(cache.contains(&5, 5));
        assert_eq!(cache.get(&5, 5), Some(&"v"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn ghosted_key_readmits_to_main_on_set() {
        let mut cache = cache(5);
        for key in 1..=5 {
            cache.set(key, "v", None, key).unwrap();
        }
        for key in 1..=4 {
            cache.get(&key, key);
        }
        cache.set(6, "v", None, 6).unwrap();
        assert_eq!(cache.ghost_len(), 1);
        let main_before = cache.main_len();

        // 5 sits in Ghost; a set re-admits it into Main.
        cache.set(5, "v2", None, 5).unwrap();
        assert_eq!(cache.ghost_len(), 0);
        assert_eq!(cache.main_len(), main_before + 1);
        assert_eq!(cache.get(&5, 5), Some(&"v2"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn scan_does_not_flush_hot_entries() {
        let mut cache = cache(20);
        cache.set(1, "hot", None, 1).unwrap();
        cache.get(&1, 1);
        cache.get(&1, 1);

        for key in 100..200 {
            cache.set(key, "scan", None, key).unwrap();
        }
        assert_eq!(cache.get(&1, 1), Some(&"hot"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn total_residency_stays_bounded() {
        let mut cache = cache(10);
        for key in 0..1000 {
            cache.set(key, "v", None, key).unwrap();
            assert!(cache.total_len() <= cache.max_total);
        }
        cache.check_invariants().unwrap();
    }

    #[test]
    fn remove_works_in_every_region() {
        let mut cache = cache(5);
        for key in 1..=5 {
            cache.set(key, "v", None, key).unwrap();
        }
        for key in 1..=4 {
            cache.get(&key, key);
        }
        cache.set(6, "v", None, 6).unwrap();

        // 5 is ghosted, 2 is in Main, 6 is in Small.
        assert!(cache.remove(&5, 5));
        assert!(cache.remove(&2, 2));
        assert!(cache.remove(&6, 6));
        assert!(!cache.remove(&6, 6));
        assert_eq!(cache.get(&5, 5), None);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn ttl_expiry_reaps_on_get() {
        let mut cache = cache(5);
        cache.set(1, "a", Some(20), 1).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(40));
        assert_eq!(cache.get(&1, 1), None);
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn overwrite_updates_value_in_place() {
        let mut cache = cache(5);
        cache.set(1, "a", None, 1).unwrap();
        cache.set(1, "b", None, 1).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&1, 1), Some(&"b"));
    }
}
