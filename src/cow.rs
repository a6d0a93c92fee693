//! Ownership contexts for copy-on-write sharing.
//!
//! Every node records the generation of the context that last wrote it. A
//! tree may only mutate a node in place when the generations match; any other
//! node is shared with a snapshot and must be forked first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::node::Node;
use crate::pool::NodePool;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of an ownership context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Generation(u64);

impl Generation {
    /// Mint a generation no other context has seen.
    pub(crate) fn next() -> Self {
        Generation(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed))
    }
}

/// A generation paired with the pool its nodes are drawn from.
pub(crate) struct CowContext<V> {
    generation: Generation,
    pool: Arc<NodePool<V>>,
}

impl<V> CowContext<V> {
    pub(crate) fn new(pool: Arc<NodePool<V>>) -> Self {
        Self {
            generation: Generation::next(),
            pool,
        }
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) fn pool(&self) -> &Arc<NodePool<V>> {
        &self.pool
    }

    /// Whether `node` may be written in place under this context.
    #[inline]
    pub(crate) fn owns(&self, node: &Node<V>) -> bool {
        node.owner == self.generation
    }

    /// Fresh node owned by this context.
    pub(crate) fn new_node(&self, prefix: &[u8], value: Option<V>) -> Node<V> {
        let mut node = self.pool.acquire(self.generation);
        node.prefix.extend_from_slice(prefix);
        node.value = value;
        node
    }

    /// Empty shell owned by this context.
    pub(crate) fn shell(&self) -> Node<V> {
        self.pool.acquire(self.generation)
    }

    pub(crate) fn release(&self, node: Node<V>) {
        self.pool.release(node);
    }

    /// Return a detached node to the pool if nothing else references it.
    pub(crate) fn recycle(&self, node: Arc<Node<V>>) {
        if let Ok(node) = Arc::try_unwrap(node) {
            self.pool.release(node);
        }
    }
}

impl<V: Clone> CowContext<V> {
    /// Copy `node` into this context. Children are shared, not copied.
    pub(crate) fn fork(&self, node: &Node<V>) -> Node<V> {
        let mut out = self.shell();
        out.prefix.extend_from_slice(&node.prefix);
        out.value = node.value.clone();
        out.children.share_from(&node.children);
        out
    }
}

impl<V> std::fmt::Debug for CowContext<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CowContext")
            .field("generation", &self.generation)
            .field("pool", &self.pool)
            .finish()
    }
}
