//! Sharded cache front ends.
//!
//! Both front ends partition the keyspace across independent policy
//! instances: each key is hashed once with `FxHasher`, the hash selects a
//! shard, and the same hash drives the shard-local map lookup. No state is
//! shared between shards.
//!
//! ## Architecture
//!
//! ```text
//!   caller ──hash(key)──► ShardSelector ──► shards[h % N]
//!                                             │
//!                                             ▼
//!                                        PolicyCore (map + lists + pool)
//! ```
//!
//! [`Cache`] is single-threaded: operations take `&mut self` and no locks
//! exist anywhere. [`ConcurrentCache`] wraps every shard in a
//! `parking_lot::RwLock`; `get`, `set`, and `remove` take the write lock
//! (`get` mutates recency/frequency metadata), while `contains` and
//! `count` run under the read lock.
//!
//! Within one shard all operations are totally ordered by its lock;
//! across shards there is no global snapshot, and `count` sums per-shard
//! lengths taken independently.

use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use parking_lot::RwLock;
use rustc_hash::FxHasher;

use crate::ds::shard::ShardSelector;
use crate::error::CacheError;
use crate::policy::PolicyCore;

#[inline]
fn hash_key<K: Hash>(key: &K) -> u64 {
    BuildHasherDefault::<FxHasher>::default().hash_one(key)
}

/// Single-threaded sharded cache.
///
/// Built by [`CacheBuilder`](crate::builder::CacheBuilder). Values are
/// returned by clone so the policy internals never leak references.
///
/// # Example
///
/// ```
/// use shardcache::builder::{CacheBuilder, EvictionPolicy};
///
/// let mut cache = CacheBuilder::new(100)
///     .policy(EvictionPolicy::S3Fifo)
///     .build::<String, u64>()
///     .unwrap();
///
/// cache.set("a".to_string(), 1).unwrap();
/// cache.set_with_ttl("b".to_string(), 2, 60_000).unwrap();
///
/// assert_eq!(cache.get(&"a".to_string()), Some(1));
/// assert!(cache.contains(&"b".to_string()));
/// assert_eq!(cache.count(), 2);
/// ```
#[derive(Debug)]
pub struct Cache<K, V> {
    shards: Vec<PolicyCore<K, V>>,
    selector: ShardSelector,
    capacity: usize,
}

impl<K: Eq + Hash, V: Clone> Cache<K, V> {
    pub(crate) fn from_parts(
        shards: Vec<PolicyCore<K, V>>,
        selector: ShardSelector,
        capacity: usize,
    ) -> Self {
        Self {
            shards,
            selector,
            capacity,
        }
    }

    /// Inserts or replaces an entry with no TTL.
    pub fn set(&mut self, key: K, value: V) -> Result<(), CacheError> {
        let hash = hash_key(&key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].set(key, value, None, hash)
    }

    /// Inserts or replaces an entry that expires `ttl_ms` milliseconds
    /// from now.
    pub fn set_with_ttl(&mut self, key: K, value: V, ttl_ms: u64) -> Result<(), CacheError> {
        let hash = hash_key(&key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].set(key, value, Some(ttl_ms), hash)
    }

    /// Retrieves a value, updating the owning shard's policy metadata.
    ///
    /// Expired entries are reaped lazily and reported absent.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let hash = hash_key(key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].get(key, hash).cloned()
    }

    /// Removes an entry; returns `true` iff the key was present.
    pub fn remove(&mut self, key: &K) -> bool {
        let hash = hash_key(key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].remove(key, hash)
    }

    /// Returns `true` if `key` maps to a live entry, without updating any
    /// policy metadata.
    pub fn contains(&self, key: &K) -> bool {
        let hash = hash_key(key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].contains(key, hash)
    }

    /// Returns the number of resident entries, summed across shards.
    pub fn count(&self) -> usize {
        self.shards.iter().map(PolicyCore::len).sum()
    }

    /// Returns the configured total capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of shards.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.selector.shard_count()
    }

    /// Drops every entry in every shard.
    pub fn clear(&mut self) {
        for shard in &mut self.shards {
            shard.clear();
        }
    }

    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) -> Result<(), String> {
        for shard in &self.shards {
            shard.check_invariants()?;
        }
        Ok(())
    }
}

/// Thread-safe sharded cache with one `parking_lot::RwLock` per shard.
///
/// `get`/`set`/`remove` take the shard's exclusive lock (`get` mutates
/// recency and frequency metadata); `contains` and `count` take shared
/// locks. Shards lock independently, so operations on different shards
/// proceed in parallel.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use shardcache::builder::{CacheBuilder, EvictionPolicy};
///
/// let cache = Arc::new(
///     CacheBuilder::new(1000)
///         .policy(EvictionPolicy::TinyLfu)
///         .shards(8)
///         .build_concurrent::<u64, u64>()
///         .unwrap(),
/// );
///
/// let writer = Arc::clone(&cache);
/// std::thread::spawn(move || writer.set(1, 10).unwrap())
///     .join()
///     .unwrap();
///
/// assert_eq!(cache.get(&1), Some(10));
/// ```
#[derive(Debug)]
pub struct ConcurrentCache<K, V> {
    shards: Vec<RwLock<PolicyCore<K, V>>>,
    selector: ShardSelector,
    capacity: usize,
}

impl<K: Eq + Hash, V: Clone> ConcurrentCache<K, V> {
    pub(crate) fn from_parts(
        shards: Vec<PolicyCore<K, V>>,
        selector: ShardSelector,
        capacity: usize,
    ) -> Self {
        Self {
            shards: shards.into_iter().map(RwLock::new).collect(),
            selector,
            capacity,
        }
    }

    /// Inserts or replaces an entry with no TTL.
    pub fn set(&self, key: K, value: V) -> Result<(), CacheError> {
        let hash = hash_key(&key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].write().set(key, value, None, hash)
    }

    /// Inserts or replaces an entry that expires `ttl_ms` milliseconds
    /// from now.
    pub fn set_with_ttl(&self, key: K, value: V, ttl_ms: u64) -> Result<(), CacheError> {
        let hash = hash_key(&key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].write().set(key, value, Some(ttl_ms), hash)
    }

    /// Retrieves a value under the shard's exclusive lock.
    ///
    /// Exclusive because a hit mutates the policy's recency or frequency
    /// state; shared access is available through [`contains`](Self::contains).
    pub fn get(&self, key: &K) -> Option<V> {
        let hash = hash_key(key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].write().get(key, hash).cloned()
    }

    /// Removes an entry; returns `true` iff the key was present.
    pub fn remove(&self, key: &K) -> bool {
        let hash = hash_key(key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].write().remove(key, hash)
    }

    /// Returns `true` if `key` maps to a live entry. Takes the shard's
    /// shared lock and updates no policy metadata.
    pub fn contains(&self, key: &K) -> bool {
        let hash = hash_key(key);
        let shard = self.selector.shard_for_hash(hash);
        self.shards[shard].read().contains(key, hash)
    }

    /// Returns the number of resident entries.
    ///
    /// Each shard is read under its own shared lock; the sum is not a
    /// linearizable snapshot across shards.
    pub fn count(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Returns the configured total capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of shards.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.selector.shard_count()
    }

    /// Drops every entry in every shard.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CacheBuilder, EvictionPolicy};

    #[allow(dead_code)]
    const _: () = {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        fn check() {
            assert_send::<ConcurrentCache<String, u64>>();
            assert_sync::<ConcurrentCache<String, u64>>();
        }
    };

    #[test]
    fn sharded_operations_route_consistently() {
        let mut cache = CacheBuilder::new(64)
            .shards(4)
            .policy(EvictionPolicy::Lru)
            .build::<u64, u64>()
            .unwrap();
        assert_eq!(cache.shard_count(), 4);

        for key in 0..32 {
            cache.set(key, key * 10).unwrap();
        }
        for key in 0..32 {
            assert_eq!(cache.get(&key), Some(key * 10));
        }
        assert_eq!(cache.count(), 32);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn count_sums_across_shards() {
        let mut cache = CacheBuilder::new(100)
            .shards(8)
            .policy(EvictionPolicy::Fifo)
            .build::<u64, u64>()
            .unwrap();

        for key in 0..50 {
            cache.set(key, key).unwrap();
        }
        assert_eq!(cache.count(), 50);

        for key in 0..10 {
            assert!(cache.remove(&key));
        }
        assert_eq!(cache.count(), 40);
    }

    #[test]
    fn capacity_reports_configured_total() {
        let cache = CacheBuilder::new(100)
            .shards(3)
            .build::<u64, u64>()
            .unwrap();
        assert_eq!(cache.capacity(), 100);
    }

    #[test]
    fn ttl_works_through_the_front_end() {
        let mut cache = CacheBuilder::new(10).build::<u64, u64>().unwrap();
        cache.set_with_ttl(1, 1, 20).unwrap();
        cache.set_with_ttl(2, 2, 5_000).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(40));
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(2));
    }

    #[test]
    fn concurrent_cache_smoke() {
        let cache = CacheBuilder::new(100)
            .shards(4)
            .build_concurrent::<u64, u64>()
            .unwrap();

        cache.set(1, 10).unwrap();
        cache.set_with_ttl(2, 20, 5_000).unwrap();
        assert_eq!(cache.get(&1), Some(10));
        assert!(cache.contains(&2));
        assert_eq!(cache.count(), 2);
        assert!(cache.remove(&1));
        assert!(!cache.remove(&1));
        cache.clear();
        assert_eq!(cache.count(), 0);
    }
}
