//! Key to node-handle map keyed by precomputed hashes.
//!
//! The shard front end hashes every key exactly once; this map accepts that
//! 64-bit hash on every operation so nothing in the hot path hashes twice.
//! Keys are not duplicated here: they live in the pooled nodes, and the
//! table stores only `NodeRef` handles, comparing keys through the pool.
//!
//! ## Architecture
//!
//! ```text
//!   NodeMap                         NodePool
//!   ┌───────────────────────┐       ┌─────────┬─────────────────────┐
//!   │ HashTable<NodeRef>    │       │ NodeRef │ Node { key, hash,.. }│
//!   │                       │       ├─────────┼─────────────────────┤
//!   │  h ──► bucket ──► id ─┼──────►│   id    │ authoritative entry │
//!   └───────────────────────┘       └─────────┴─────────────────────┘
//! ```
//!
//! The stored per-node hash doubles as the rehash key when the table grows,
//! so growth never re-runs the key hasher either.
//!
//! Invariant (enforced by the policy engines): every `NodeRef` present here
//! is linked into exactly one policy list, and vice versa.

use std::marker::PhantomData;

use hashbrown::HashTable;

use crate::ds::node_pool::{NodePool, NodeRef};
use crate::error::CacheError;

/// Map from keys (resident in the pool) to node handles.
///
/// All lookups take the key's precomputed 64-bit hash alongside the key.
#[derive(Debug)]
pub struct NodeMap<K, V, M> {
    table: HashTable<NodeRef>,
    _marker: PhantomData<fn() -> (K, V, M)>,
}

impl<K: Eq, V, M> NodeMap<K, V, M> {
    /// Creates a map pre-sized for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    /// Looks up the node registered under `key`.
    #[inline]
    pub fn find(&self, pool: &NodePool<K, V, M>, key: &K, hash: u64) -> Option<NodeRef> {
        self.table
            .find(hash, |&id| pool[id].key == *key)
            .copied()
    }

    /// Registers `id` under its key.
    ///
    /// The caller guarantees the key is not already present. Table growth
    /// is fallible; on failure nothing is inserted.
    pub fn insert(
        &mut self,
        pool: &NodePool<K, V, M>,
        id: NodeRef,
        hash: u64,
    ) -> Result<(), CacheError> {
        self.table
            .try_reserve(1, |&entry| pool[entry].hash)
            .map_err(|_| CacheError::AllocationFailed)?;
        self.table
            .insert_unique(hash, id, |&entry| pool[entry].hash);
        Ok(())
    }

    /// Removes the entry for `key`, returning the detached handle.
    ///
    /// The caller must follow up with list removal and pool release.
    pub fn remove(&mut self, pool: &NodePool<K, V, M>, key: &K, hash: u64) -> Option<NodeRef> {
        match self.table.find_entry(hash, |&id| pool[id].key == *key) {
            Ok(entry) => Some(entry.remove().0),
            Err(_) => None,
        }
    }

    /// Removes a specific handle, used by eviction paths that already hold
    /// the victim's `NodeRef`.
    pub fn remove_ref(&mut self, id: NodeRef, hash: u64) -> bool {
        match self.table.find_entry(hash, |&entry| entry == id) {
            Ok(entry) => {
                entry.remove();
                true
            }
            Err(_) => false,
        }
    }

    /// Returns the number of registered entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no entries are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drops every entry, keeping the table's allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }
}
