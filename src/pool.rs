//! Bounded pool of reusable node shells.
//!
//! Bulk loads and rebuilds churn through many nodes. Returning cleared shells
//! here keeps their prefix and child buffers alive for the next allocation.
//! The pool never grows past its capacity: extra shells are dropped.

use parking_lot::Mutex;

use crate::cow::Generation;
use crate::node::Node;

/// Default number of idle shells a pool retains.
pub const DEFAULT_POOL_CAPACITY: usize = 32;

/// A bounded, thread-safe cache of cleared nodes.
///
/// A pool can be shared between trees through an `Arc`; every access takes
/// the internal lock for the duration of a single push or pop.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use cow_radix::{NodePool, RadixTree};
///
/// let pool = Arc::new(NodePool::new(64));
/// let mut a: RadixTree<u32> = RadixTree::with_pool(pool.clone());
/// let mut b: RadixTree<u32> = RadixTree::with_pool(pool.clone());
/// a.replace_or_insert(b"left", 1);
/// b.replace_or_insert(b"right", 2);
/// assert_eq!(pool.capacity(), 64);
/// ```
pub struct NodePool<V> {
    shells: Mutex<Vec<Node<V>>>,
    capacity: usize,
}

impl<V> NodePool<V> {
    /// Create a pool retaining at most `capacity` idle shells.
    pub fn new(capacity: usize) -> Self {
        Self {
            shells: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Maximum number of idle shells kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of idle shells currently held.
    pub fn len(&self) -> usize {
        self.shells.lock().len()
    }

    /// Returns true if no idle shells are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take a cleared shell, or allocate one if the pool is dry.
    pub(crate) fn acquire(&self, owner: Generation) -> Node<V> {
        let shell = self.shells.lock().pop();
        match shell {
            Some(mut node) => {
                node.owner = owner;
                node
            }
            None => Node::empty(owner),
        }
    }

    /// Hand a node back. Its contents are dropped before the lock is taken.
    pub(crate) fn release(&self, mut node: Node<V>) {
        node.clear();
        let mut shells = self.shells.lock();
        if shells.len() < self.capacity {
            shells.push(node);
        }
    }
}

impl<V> Default for NodePool<V> {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl<V> std::fmt::Debug for NodePool<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodePool")
            .field("idle", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
