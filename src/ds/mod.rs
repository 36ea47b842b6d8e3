pub mod frequency_sketch;
pub mod intrusive_list;
pub mod node_pool;
pub mod shard;

pub use frequency_sketch::FrequencySketch;
pub use intrusive_list::{IntrusiveList, ListIter};
pub use node_pool::{Node, NodePool, NodeRef};
pub use shard::ShardSelector;
