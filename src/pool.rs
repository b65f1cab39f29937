//! A recycler for node allocations
//!
//! Operations that rebuild a path through the tree discard the nodes they replaced. When a
//! discarded node is provably unreachable (its `Arc` is unique) the pool keeps the allocation
//! and hands it out again for the next node an operation needs. A node that is still referenced
//! by any version is never taken: `reclaim` simply drops the caller's reference to it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;

use crate::error::Error;
use crate::node::{Link, Node, Priority};

const DEFAULT_CAPACITY: usize = 1024;

/// Builder for [`NodePool`]
///
/// # Examples
///
/// ```
/// use ptreap::NodePool;
///
/// let pool: NodePool<String> = NodePool::<String>::builder().capacity(4096).build().unwrap();
/// assert_eq!(pool.capacity(), 4096);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolBuilder {
    capacity: Option<usize>,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of idle slots the pool retains
    ///
    /// Slots offered beyond this are freed. Must be greater than 0; defaults to 1024.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Build the pool, validating its configuration
    pub fn build<T>(self) -> Result<NodePool<T>, Error> {
        let capacity = self.capacity.unwrap_or(DEFAULT_CAPACITY);
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        debug!("node pool created with capacity {capacity}");
        Ok(NodePool {
            free: Mutex::new(Vec::new()),
            capacity,
            counters: Counters::default(),
        })
    }
}

/// Counters describing how a pool has been used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Nodes handed out from an idle slot
    pub reused: u64,
    /// Nodes that needed a fresh allocation
    pub allocated: u64,
    /// Discarded nodes the pool took back
    pub reclaimed: u64,
    /// Discarded nodes the pool did not keep: still shared with some version, or turned away
    /// by a full pool
    pub rejected: u64,
}

#[derive(Default)]
struct Counters {
    reused: AtomicU64,
    allocated: AtomicU64,
    reclaimed: AtomicU64,
    rejected: AtomicU64,
}

/// A bounded free list of node slots, shared by the versions of a treap
pub struct NodePool<T> {
    free: Mutex<Vec<Arc<Node<T>>>>,
    capacity: usize,
    counters: Counters,
}

impl<T> NodePool<T> {
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Maximum number of idle slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of idle slots currently held
    pub fn len(&self) -> usize {
        self.free.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free every idle slot, along with the stale item it still holds
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.free.lock());
        debug!("node pool cleared, {} slots freed", drained.len());
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            reused: self.counters.reused.load(Ordering::Relaxed),
            allocated: self.counters.allocated.load(Ordering::Relaxed),
            reclaimed: self.counters.reclaimed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// Produce a node holding the given parts, reusing an idle slot when there is one
    pub(crate) fn acquire(
        &self,
        item: T,
        priority: Priority,
        left: Link<T>,
        right: Link<T>,
    ) -> Arc<Node<T>> {
        let slot = self.free.lock().pop();
        if let Some(mut slot) = slot {
            // slots enter the free list unique and never leave it shared
            if let Some(node) = Arc::get_mut(&mut slot) {
                node.item = item;
                node.priority = priority;
                node.left = left;
                node.right = right;
                self.counters.reused.fetch_add(1, Ordering::Relaxed);
                return slot;
            }
        }
        self.counters.allocated.fetch_add(1, Ordering::Relaxed);
        Arc::new(Node::new(item, priority, left, right))
    }

    /// Offer a discarded node back to the pool
    ///
    /// A node is kept only if no version can reach it any more, and the same goes for each of
    /// its descendants in turn: the walk stops at every subtree some other version still shares.
    /// Kept slots have their children unlinked; their items are overwritten when handed out.
    pub(crate) fn reclaim(&self, node: Arc<Node<T>>) {
        let mut pending = vec![node];
        let mut kept = 0;
        let mut shared = 0;
        let mut free = self.free.lock();
        while free.len() < self.capacity {
            let Some(mut node) = pending.pop() else {
                break;
            };
            match Arc::get_mut(&mut node) {
                Some(n) => {
                    pending.extend(n.left.take());
                    pending.extend(n.right.take());
                    free.push(node);
                    kept += 1;
                }
                None => shared += 1,
            }
        }
        let idle = free.len();
        drop(free);

        // whatever didn't fit is freed outside the lock
        let turned_away = pending.len() as u64;
        drop(pending);

        self.counters.reclaimed.fetch_add(kept, Ordering::Relaxed);
        self.counters
            .rejected
            .fetch_add(shared + turned_away, Ordering::Relaxed);
        trace!(
            "reclaimed {kept} nodes ({shared} still shared, {turned_away} over capacity), {idle} idle"
        );
    }
}

impl<T> std::fmt::Debug for NodePool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodePool")
            .field("capacity", &self.capacity)
            .field("idle", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
