//! Intrusive doubly linked list over `NodePool` links.
//!
//! The list stores no nodes of its own: it threads the `prev`/`next` slots
//! embedded in pooled [`Node`](crate::ds::Node)s. Several lists can share
//! one pool, which is how the multi-queue policies (S3-FIFO, W-TinyLFU) run
//! their regions over a single node population.
//!
//! ## Architecture
//!
//! ```text
//!   pool (NodePool<K, V, M>)
//!   ┌─────────┬──────────────────────────────────────────────┐
//!   │ NodeRef │ Node { .., prev, next, .. }                  │
//!   ├─────────┼──────────────────────────────────────────────┤
//!   │ id_1    │ { prev: None,       next: Some(id_2) }       │
//!   │ id_2    │ { prev: Some(id_1), next: Some(id_3) }       │
//!   │ id_3    │ { prev: Some(id_2), next: None }             │
//!   └─────────┴──────────────────────────────────────────────┘
//!
//!   head ─► [id_1] ◄──► [id_2] ◄──► [id_3] ◄── tail
//! ```
//!
//! ## Operations
//! - `push_front` / `push_back` / `pop_front`: O(1)
//! - `unlink(id)`: O(1) detach; the node stays live in the pool
//! - `move_to_back(id)`: O(1), no-op when `id` is already the tail
//! - `clear`: O(n) walk that resets links without releasing nodes
//!
//! The length counter is authoritative: the policy engines compare it
//! against region capacities to drive eviction.
//!
//! Caller invariant: every id passed to `unlink`, `move_to_back`, or
//! `push_*` must be live in the shared pool, and linked in *this* list
//! (or unlinked, for `push_*`). A node is in at most one list at a time.
//!
//! `debug_validate_invariants()` is available in debug/test builds.

use crate::ds::node_pool::{NodePool, NodeRef};

/// Intrusive list head/tail/len over links stored in a shared `NodePool`.
#[derive(Debug, Default)]
pub struct IntrusiveList {
    head: Option<NodeRef>,
    tail: Option<NodeRef>,
    len: usize,
}

impl IntrusiveList {
    /// Creates an empty list.
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Returns the number of linked nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no nodes are linked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the head node, if any.
    #[inline]
    pub fn front(&self) -> Option<NodeRef> {
        self.head
    }

    /// Returns the tail node, if any.
    #[inline]
    pub fn back(&self) -> Option<NodeRef> {
        self.tail
    }

    /// Links an unlinked node at the head.
    pub fn push_front<K, V, M>(&mut self, pool: &mut NodePool<K, V, M>, id: NodeRef) {
        let old_head = self.head;
        {
            let node = &mut pool[id];
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => pool[h].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
    }

    /// Links an unlinked node at the tail.
    pub fn push_back<K, V, M>(&mut self, pool: &mut NodePool<K, V, M>, id: NodeRef) {
        let old_tail = self.tail;
        {
            let node = &mut pool[id];
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => pool[t].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    /// Detaches `id` from this list, leaving the node live in the pool.
    pub fn unlink<K, V, M>(&mut self, pool: &mut NodePool<K, V, M>, id: NodeRef) {
        let (prev, next) = {
            let node = &pool[id];
            (node.prev, node.next)
        };

        match prev {
            Some(p) => pool[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => pool[n].prev = prev,
            None => self.tail = prev,
        }

        let node = &mut pool[id];
        node.prev = None;
        node.next = None;
        self.len -= 1;
    }

    /// Moves a linked node to the tail; no-op when it already is the tail.
    pub fn move_to_back<K, V, M>(&mut self, pool: &mut NodePool<K, V, M>, id: NodeRef) {
        if self.tail == Some(id) {
            return;
        }
        self.unlink(pool, id);
        self.push_back(pool, id);
    }

    /// Detaches and returns the head node, if any.
    pub fn pop_front<K, V, M>(&mut self, pool: &mut NodePool<K, V, M>) -> Option<NodeRef> {
        let id = self.head?;
        self.unlink(pool, id);
        Some(id)
    }

    /// Unlinks every node without releasing any pool storage.
    pub fn clear<K, V, M>(&mut self, pool: &mut NodePool<K, V, M>) {
        let mut current = self.head;
        while let Some(id) = current {
            let node = &mut pool[id];
            current = node.next;
            node.prev = None;
            node.next = None;
        }
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates node handles from head to tail.
    pub fn iter<'a, K, V, M>(&self, pool: &'a NodePool<K, V, M>) -> ListIter<'a, K, V, M> {
        ListIter {
            pool,
            current: self.head,
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants<K, V, M>(&self, pool: &NodePool<K, V, M>) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            assert_eq!(self.len, 0);
            return;
        }

        let mut seen = std::collections::HashSet::new();
        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;

        while let Some(id) = current {
            assert!(seen.insert(id));
            let node = pool.get(id).expect("linked node missing from pool");
            assert_eq!(node.prev, prev);
            if node.next.is_none() {
                assert_eq!(self.tail, Some(id));
            }

            prev = Some(id);
            current = node.next;
            count += 1;
            assert!(count <= self.len);
        }

        assert_eq!(count, self.len);
    }
}

/// Iterator over node handles, front to back.
pub struct ListIter<'a, K, V, M> {
    pool: &'a NodePool<K, V, M>,
    current: Option<NodeRef>,
}

impl<K, V, M> Iterator for ListIter<'_, K, V, M> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.pool.get(id)?.next;
        Some(id)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::ds::node_pool::Node;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        PushBack(u64),
        PushFront(u64),
        PopFront,
        MoveToBack(usize),
        Unlink(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u64>().prop_map(Op::PushBack),
            any::<u64>().prop_map(Op::PushFront),
            Just(Op::PopFront),
            (0usize..64).prop_map(Op::MoveToBack),
            (0usize..64).prop_map(Op::Unlink),
        ]
    }

    proptest! {
        /// The list mirrors a VecDeque reference model under arbitrary ops.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_matches_reference_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut pool: NodePool<u64, u64, ()> = NodePool::with_capacity(32);
            let mut list = IntrusiveList::new();
            let mut model: Vec<(NodeRef, u64)> = Vec::new();

            for op in ops {
                match op {
                    Op::PushBack(k) => {
                        let id = pool.acquire(Node::new(k, k, k, None, ())).unwrap();
                        list.push_back(&mut pool, id);
                        model.push((id, k));
                    }
                    Op::PushFront(k) => {
                        let id = pool.acquire(Node::new(k, k, k, None, ())).unwrap();
                        list.push_front(&mut pool, id);
                        model.insert(0, (id, k));
                    }
                    Op::PopFront => {
                        let popped = list.pop_front(&mut pool);
                        if model.is_empty() {
                            prop_assert_eq!(popped, None);
                        } else {
                            let (id, _) = model.remove(0);
                            prop_assert_eq!(popped, Some(id));
                            pool.release(id);
                        }
                    }
                    Op::MoveToBack(i) => {
                        if !model.is_empty() {
                            let entry = model.remove(i % model.len());
                            list.move_to_back(&mut pool, entry.0);
                            model.push(entry);
                        }
                    }
                    Op::Unlink(i) => {
                        if !model.is_empty() {
                            let (id, _) = model.remove(i % model.len());
                            list.unlink(&mut pool, id);
                            pool.release(id);
                        }
                    }
                }

                prop_assert_eq!(list.len(), model.len());
            }

            let keys: Vec<u64> = list.iter(&pool).map(|id| pool[id].key).collect();
            let expected: Vec<u64> = model.iter().map(|(_, k)| *k).collect();
            prop_assert_eq!(keys, expected);
            list.debug_validate_invariants(&pool);
        }
    }
}
