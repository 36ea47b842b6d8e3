pub use crate::builder::{CacheBuilder, EvictionPolicy};
pub use crate::cache::{Cache, ConcurrentCache};
pub use crate::ds::{FrequencySketch, IntrusiveList, Node, NodePool, NodeRef, ShardSelector};
pub use crate::error::CacheError;

#[cfg(feature = "metrics")]
pub use crate::metrics::CacheMetrics;
