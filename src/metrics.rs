//! Per-policy operation counters, gated behind the `metrics` feature.
//!
//! Every policy core embeds a [`CacheMetrics`] when the feature is enabled
//! and exposes it through `metrics()` / `reset_metrics()`. With the feature
//! disabled the counters and all recording sites compile away.

/// Operation counters for one policy core.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct CacheMetrics {
    /// Number of `get` calls that returned a live value.
    pub hits: u64,
    /// Number of `get` calls that found nothing (including expired entries).
    pub misses: u64,
    /// Number of insertions of a previously absent key.
    pub inserts: u64,
    /// Number of `set` calls that overwrote an existing key.
    pub updates: u64,
    /// Number of entries evicted to make room.
    pub evictions: u64,
    /// Number of entries reaped because their TTL had elapsed.
    pub expirations: u64,
}

impl std::fmt::Display for CacheMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self.hits + self.misses;
        let hit_rate = if total > 0 {
            (self.hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        write!(
            f,
            "CacheMetrics {{ hits: {}, misses: {}, hit_rate: {:.2}%, inserts: {}, updates: {}, \
             evictions: {}, expirations: {} }}",
            self.hits,
            self.misses,
            hit_rate,
            self.inserts,
            self.updates,
            self.evictions,
            self.expirations
        )
    }
}
