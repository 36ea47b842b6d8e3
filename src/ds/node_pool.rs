//! Preallocated node pool with stable `NodeRef` handles.
//!
//! Stores cache nodes in a `Vec<Option<Node>>` and recycles freed slots via
//! a free list. Preallocation bounds steady-state allocation churn; indices
//! stay stable for the lifetime of an entry, so the map and the policy lists
//! can both refer to a node without owning it.
//!
//! ## Architecture
//!
//! ```text
//!   slots: Vec<Option<Node<K, V, M>>>     free: Vec<u32>
//!
//!   index: 0       1       2       3
//!          [node]  [    ]  [node]  [    ]
//!                    ^               ^
//!                    |               |
//!                free = [1, 3]
//!
//!   Node { key, value, hash, expiry, prev, next, meta }
//! ```
//!
//! Ownership: the pool owns node storage. The map holds the authoritative
//! `NodeRef` per key; the intrusive lists hold positional references only.
//! A released node must already be unlinked from every list and removed
//! from the map; the policy engines enforce this.
//!
//! ## Operations
//! - `acquire(node)`: reuses a free slot if available, otherwise grows the
//!   slot vector (fallibly, via `try_reserve`)
//! - `release(id)`: clears the slot and pushes its index onto the free list
//! - `get(id)` / `get_mut(id)`: `None` for empty or out-of-range slots
//!
//! Indexing with `pool[id]` panics on a stale handle; policies only index
//! handles they have not released.
//!
//! `debug_validate_invariants()` is available in debug/test builds.

use std::ops::{Index, IndexMut};

use crate::error::CacheError;

/// Stable handle into a [`NodePool`].
///
/// `NodeRef` values remain valid until the referenced node is released;
/// after release, the numeric index may be reused by a later `acquire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(u32);

impl NodeRef {
    /// Returns the underlying slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A pooled cache entry.
///
/// Carries the payload (`key`, `value`), the precomputed 64-bit key hash,
/// the optional absolute expiry in clock milliseconds, the intrusive list
/// links, and policy-specific metadata `M` (SIEVE's visited bit, S3-FIFO's
/// queue tag and frequency, W-TinyLFU's region tag).
#[derive(Debug)]
pub struct Node<K, V, M> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
    pub(crate) expiry: Option<u64>,
    pub(crate) prev: Option<NodeRef>,
    pub(crate) next: Option<NodeRef>,
    pub(crate) meta: M,
}

impl<K, V, M> Node<K, V, M> {
    /// Creates an unlinked node ready for `NodePool::acquire`.
    pub fn new(key: K, value: V, hash: u64, expiry: Option<u64>, meta: M) -> Self {
        Self {
            key,
            value,
            hash,
            expiry,
            prev: None,
            next: None,
            meta,
        }
    }

    /// Returns `true` when the node carries an expiry at or before `now`.
    #[inline]
    pub fn expired_at(&self, now: u64) -> bool {
        matches!(self.expiry, Some(at) if at <= now)
    }
}

/// Pool that stores nodes in reusable slots and returns stable [`NodeRef`]s.
#[derive(Debug)]
pub struct NodePool<K, V, M> {
    slots: Vec<Option<Node<K, V, M>>>,
    free: Vec<u32>,
    len: usize,
}

impl<K, V, M> NodePool<K, V, M> {
    /// Creates a pool with `pool_size` slots preallocated.
    ///
    /// The pool can grow past `pool_size`; preallocation only bounds how
    /// much of the steady-state working set allocates lazily.
    pub fn with_capacity(pool_size: usize) -> Self {
        Self {
            slots: Vec::with_capacity(pool_size),
            free: Vec::with_capacity(pool_size),
            len: 0,
        }
    }

    /// Stores `node` and returns its handle.
    ///
    /// Reuses a free slot when one exists; otherwise grows the slot vector.
    /// Growth is fallible: on memory exhaustion the node is dropped and
    /// [`CacheError::AllocationFailed`] is returned, leaving the pool
    /// unchanged.
    pub fn acquire(&mut self, node: Node<K, V, M>) -> Result<NodeRef, CacheError> {
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(node);
            self.len += 1;
            return Ok(NodeRef(idx));
        }

        if self.slots.len() == self.slots.capacity() {
            self.slots
                .try_reserve(1)
                .map_err(|_| CacheError::AllocationFailed)?;
        }
        self.slots.push(Some(node));
        self.len += 1;
        Ok(NodeRef((self.slots.len() - 1) as u32))
    }

    /// Removes the node at `id` and returns it, recycling the slot.
    ///
    /// Returns `None` if the slot is already empty or out of range. The
    /// caller must have unlinked the node from every list and removed it
    /// from the map first.
    pub fn release(&mut self, id: NodeRef) -> Option<Node<K, V, M>> {
        let slot = self.slots.get_mut(id.index())?;
        let node = slot.take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node)
    }

    /// Returns a shared reference to the node at `id`, if live.
    #[inline]
    pub fn get(&self, id: NodeRef) -> Option<&Node<K, V, M>> {
        self.slots.get(id.index()).and_then(|slot| slot.as_ref())
    }

    /// Returns a mutable reference to the node at `id`, if live.
    #[inline]
    pub fn get_mut(&mut self, id: NodeRef) -> Option<&mut Node<K, V, M>> {
        self.slots
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
    }

    /// Returns `true` if `id` refers to a live node.
    #[inline]
    pub fn contains(&self, id: NodeRef) -> bool {
        self.slots
            .get(id.index())
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Returns the number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the pool has no live nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots that can be held without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Drops every node and resets the free list.
    ///
    /// Slot capacity is retained so a cleared pool keeps its preallocation.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let live = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(self.len, live);

        let mut seen_free = std::collections::HashSet::new();
        for &idx in &self.free {
            assert!((idx as usize) < self.slots.len());
            assert!(self.slots[idx as usize].is_none());
            assert!(seen_free.insert(idx));
        }

        assert_eq!(self.slots.len(), self.free.len() + self.len);
    }
}

impl<K, V, M> Index<NodeRef> for NodePool<K, V, M> {
    type Output = Node<K, V, M>;

    #[inline]
    fn index(&self, id: NodeRef) -> &Node<K, V, M> {
        match self.slots.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("stale NodeRef {:?}", id),
        }
    }
}

impl<K, V, M> IndexMut<NodeRef> for NodePool<K, V, M> {
    #[inline]
    fn index_mut(&mut self, id: NodeRef) -> &mut Node<K, V, M> {
        match self.slots.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("stale NodeRef {:?}", id),
        }
    }
}
