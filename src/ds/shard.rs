//! Shared sharding helpers for consistent shard selection.
//!
//! Provides the deterministic hash-to-shard mapping used by the cache front
//! ends. The front end hashes each key exactly once; the same 64-bit hash
//! selects the shard here and then drives the shard-local map lookup, so no
//! key is ever hashed twice.
//!
//! ## Architecture
//!
//! ```text
//!   key ──FxHasher──► h: u64
//!                      │
//!                      ▼
//!            ShardSelector { shards: 4 }
//!                 h % 4
//!                      │
//!                      ▼
//!   ┌─────────┬─────────┬─────────┬─────────┐
//!   │ shard 0 │ shard 1 │ shard 2 │ shard 3 │
//!   └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! Properties
//! ──────────
//! - Deterministic: the same hash always lands on the same shard
//! - Uniform: shards receive an even spread given a good hash
//! - No cross-shard state: selection is pure arithmetic

/// Deterministic shard selector over precomputed 64-bit hashes.
///
/// Maps a hash to a shard index in `[0, shards)`. The shard count is fixed
/// at construction and validated upstream to be at least 1.
///
/// # Example
///
/// ```
/// use shardcache::ds::ShardSelector;
///
/// let selector = ShardSelector::new(4);
/// let shard = selector.shard_for_hash(0xdead_beef);
/// assert!(shard < 4);
/// assert_eq!(selector.shard_for_hash(0xdead_beef), shard);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
}

impl ShardSelector {
    /// Creates a selector for `shards` shards.
    ///
    /// The shard count is clamped to at least 1.
    pub fn new(shards: usize) -> Self {
        Self {
            shards: shards.max(1),
        }
    }

    /// Returns the number of shards.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Maps a precomputed hash to a shard index in `[0, shards)`.
    #[inline]
    pub fn shard_for_hash(&self, hash: u64) -> usize {
        (hash % self.shards as u64) as usize
    }
}

impl Default for ShardSelector {
    /// Creates a single-shard selector.
    fn default() -> Self {
        Self::new(1)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: shard index is always in range.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_shard_in_range(shards in 1usize..128, hash in any::<u64>()) {
            let selector = ShardSelector::new(shards);
            prop_assert!(selector.shard_for_hash(hash) < shards);
        }

        /// Property: the same hash maps to the same shard across calls.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_deterministic(shards in 1usize..64, hashes in prop::collection::vec(any::<u64>(), 0..50)) {
            let selector = ShardSelector::new(shards);
            let first: Vec<_> = hashes.iter().map(|h| selector.shard_for_hash(*h)).collect();
            let second: Vec<_> = hashes.iter().map(|h| selector.shard_for_hash(*h)).collect();
            prop_assert_eq!(first, second);
        }

        /// Property: a single shard absorbs every hash.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_single_shard_returns_zero(hashes in prop::collection::vec(any::<u64>(), 0..50)) {
            let selector = ShardSelector::new(1);
            for hash in hashes {
                prop_assert_eq!(selector.shard_for_hash(hash), 0);
            }
        }

        /// Property: enough distinct hashes reach more than one shard.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_hashes_spread(shards in 2usize..16, seed in any::<u64>()) {
            let selector = ShardSelector::new(shards);
            let mut used = std::collections::HashSet::new();
            for i in 0..(shards as u64 * 8) {
                used.insert(selector.shard_for_hash(seed.wrapping_add(i)));
            }
            prop_assert!(used.len() > 1);
        }
    }
}
