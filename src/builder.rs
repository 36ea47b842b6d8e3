//! Unified cache builder for all eviction policies.
//!
//! Validates construction parameters, splits capacity across shards, and
//! wires each shard's policy engine. The builder is the only way to
//! construct the front-end types; invalid parameters surface as
//! [`CacheError::InvalidConfiguration`] instead of panicking.
//!
//! ## Example
//!
//! ```rust
//! use shardcache::builder::{CacheBuilder, EvictionPolicy};
//!
//! let mut cache = CacheBuilder::new(100)
//!     .policy(EvictionPolicy::Sieve)
//!     .shards(4)
//!     .build::<u64, String>()
//!     .unwrap();
//!
//! cache.set(1, "hello".to_string()).unwrap();
//! assert_eq!(cache.get(&1), Some("hello".to_string()));
//! ```

use std::hash::Hash;

use crate::cache::{Cache, ConcurrentCache};
use crate::clock::Clock;
use crate::ds::shard::ShardSelector;
use crate::error::CacheError;
use crate::policy::{FifoCore, LruCore, PolicyCore, S3FifoCore, SieveCore, TinyLfuCore};

/// Available cache eviction policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// First In, First Out eviction.
    Fifo,
    /// Least Recently Used eviction.
    Lru,
    /// SIEVE: FIFO-cost hits with LRU-class hit rates.
    Sieve,
    /// S3-FIFO: three queues with ghost-guided re-admission.
    S3Fifo,
    /// W-TinyLFU: windowed admission gated by a Count-Min Sketch.
    TinyLfu,
}

/// Builder for [`Cache`] and [`ConcurrentCache`] instances.
///
/// Defaults: `pool_size = cache_size`, one shard, LRU policy.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    cache_size: u32,
    pool_size: Option<u32>,
    shard_count: u32,
    policy: EvictionPolicy,
}

impl CacheBuilder {
    /// Creates a builder for a cache holding `cache_size` entries.
    pub fn new(cache_size: u32) -> Self {
        Self {
            cache_size,
            pool_size: None,
            shard_count: 1,
            policy: EvictionPolicy::Lru,
        }
    }

    /// Selects the eviction policy (default LRU).
    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the number of independent shards (default 1, must be >= 1).
    pub fn shards(mut self, shard_count: u32) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Sets how many nodes to preallocate across all shards
    /// (default `cache_size`, must be <= `cache_size`).
    pub fn pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    /// Builds a single-threaded sharded cache.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidConfiguration`] when `cache_size == 0`,
    /// `shard_count == 0`, or `pool_size > cache_size`.
    pub fn build<K: Eq + Hash, V: Clone>(self) -> Result<Cache<K, V>, CacheError> {
        let (capacity, shards) = self.make_shards()?;
        let selector = ShardSelector::new(shards.len());
        Ok(Cache::from_parts(shards, selector, capacity))
    }

    /// Builds a cache whose shards are individually protected by
    /// `parking_lot::RwLock`s, safe to share across threads.
    ///
    /// # Errors
    ///
    /// Same validation as [`build`](Self::build).
    pub fn build_concurrent<K: Eq + Hash, V: Clone>(
        self,
    ) -> Result<ConcurrentCache<K, V>, CacheError> {
        let (capacity, shards) = self.make_shards()?;
        let selector = ShardSelector::new(shards.len());
        Ok(ConcurrentCache::from_parts(shards, selector, capacity))
    }

    fn validate(&self) -> Result<u32, CacheError> {
        if self.cache_size == 0 {
            return Err(CacheError::invalid_config("cache_size must be > 0"));
        }
        if self.shard_count == 0 {
            return Err(CacheError::invalid_config("shard_count must be >= 1"));
        }
        let pool_size = self.pool_size.unwrap_or(self.cache_size);
        if pool_size > self.cache_size {
            return Err(CacheError::invalid_config(format!(
                "pool_size {} exceeds cache_size {}",
                pool_size, self.cache_size
            )));
        }
        Ok(pool_size)
    }

    fn make_shards<K: Eq, V>(&self) -> Result<(usize, Vec<PolicyCore<K, V>>), CacheError> {
        let pool_size = self.validate()?;

        // Each shard gets the ceiling split so the shards jointly cover
        // the configured capacity.
        let shard_count = self.shard_count as usize;
        let shard_capacity = (self.cache_size as usize).div_ceil(shard_count);
        let shard_pool = (pool_size as usize).div_ceil(shard_count);
        let clock = Clock::new();

        let shards = (0..shard_count)
            .map(|_| match self.policy {
                EvictionPolicy::Fifo => {
                    PolicyCore::Fifo(FifoCore::new(shard_capacity, shard_pool, clock))
                }
                EvictionPolicy::Lru => {
                    PolicyCore::Lru(LruCore::new(shard_capacity, shard_pool, clock))
                }
                EvictionPolicy::Sieve => {
                    PolicyCore::Sieve(SieveCore::new(shard_capacity, shard_pool, clock))
                }
                EvictionPolicy::S3Fifo => {
                    PolicyCore::S3Fifo(S3FifoCore::new(shard_capacity, shard_pool, clock))
                }
                EvictionPolicy::TinyLfu => {
                    PolicyCore::TinyLfu(TinyLfuCore::new(shard_capacity, shard_pool, clock))
                }
            })
            .collect();

        Ok((self.cache_size as usize, shards))
    }
}
