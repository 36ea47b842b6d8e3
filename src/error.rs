//! Error types for the shardcache library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: Returned from fallible construction (`CacheBuilder::build`)
//!   and from `set`/`set_with_ttl` when backing storage cannot grow.
//!
//! Lookup absence is never an error: `get`, `remove`, `contains`, and `count`
//! are infallible by design, and TTL expiry is reported as absence.
//!
//! ## Example Usage
//!
//! ```
//! use shardcache::builder::CacheBuilder;
//! use shardcache::error::CacheError;
//!
//! // Construction parameters are validated, not asserted.
//! let bad = CacheBuilder::new(0).build::<u64, u64>();
//! assert!(matches!(bad, Err(CacheError::InvalidConfiguration(_))));
//! ```

use std::fmt;

/// Error returned by fallible cache operations.
///
/// Carries the two failure classes the library can surface:
/// configuration rejected at construction time, and allocation failure
/// while growing the node pool or hash table during `set`.
///
/// A failed `set` leaves the cache structurally unchanged: no key is
/// installed and no node is leaked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Node pool or hash table growth could not obtain memory.
    AllocationFailed,
    /// Invalid construction parameters (zero capacity, zero shards, or
    /// `pool_size > cache_size`). Raised only at construction.
    InvalidConfiguration(String),
}

impl CacheError {
    /// Creates an `InvalidConfiguration` error with the given description.
    #[inline]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed => f.write_str("allocation failed"),
            Self::InvalidConfiguration(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}
