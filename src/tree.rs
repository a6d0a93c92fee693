//! The public radix tree.

use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::trace;

use crate::config::Config;
use crate::cow::CowContext;
use crate::node::{Children, Node};
use crate::pool::NodePool;

/// A compressed trie over byte-string keys with O(1) copy-on-write snapshots.
///
/// Empty keys are ignored by every operation. Mutations never fail: they
/// either change the tree or are no-ops.
pub struct RadixTree<V> {
    pub(crate) cx: CowContext<V>,
    pub(crate) children: Children<V>,
    pub(crate) len: usize,
}

impl<V> RadixTree<V> {
    /// Create an empty tree with its own default-sized pool.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty tree with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self::with_pool(Arc::new(NodePool::new(config.pool_capacity)))
    }

    /// Create an empty tree that draws nodes from a shared pool.
    pub fn with_pool(pool: Arc<NodePool<V>>) -> Self {
        Self::from_parts(CowContext::new(pool), Children::new(), 0)
    }

    pub(crate) fn from_parts(cx: CowContext<V>, children: Children<V>, len: usize) -> Self {
        Self { cx, children, len }
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The pool this tree allocates from.
    pub fn pool(&self) -> &Arc<NodePool<V>> {
        self.cx.pool()
    }

    /// Get a reference to the value for a key.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let mut children = &self.children;
        let mut key = key;
        loop {
            let node = children.get(*key.first()?)?;
            let rest = key.strip_prefix(node.prefix.as_slice())?;
            if rest.is_empty() {
                return node.value.as_ref();
            }
            children = &node.children;
            key = rest;
        }
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Visit every key in ascending order, depth first.
    ///
    /// The visitor receives the prefix segments from the root down to the
    /// node holding the value; concatenated they form the key. Returning
    /// `ControlFlow::Break` stops the walk at once.
    pub fn walk<F>(&self, mut visitor: F) -> ControlFlow<()>
    where
        F: FnMut(&[&[u8]], &V) -> ControlFlow<()>,
    {
        let mut path: Vec<&[u8]> = Vec::with_capacity(32);
        let mut stack: Vec<(usize, &Node<V>)> =
            self.children.iter().rev().map(|child| (0, &**child)).collect();

        while let Some((depth, node)) = stack.pop() {
            path.truncate(depth);
            path.push(&node.prefix);
            if let Some(value) = &node.value {
                if visitor(&path, value).is_break() {
                    return ControlFlow::Break(());
                }
            }
            stack.extend(node.children.iter().rev().map(|child| (depth + 1, &**child)));
        }
        ControlFlow::Continue(())
    }

    /// Iterate over `(key, value)` pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: self.children.iter().rev().map(|child| (0, &**child)).collect(),
            key: Vec::new(),
            ends: Vec::new(),
        }
    }

    /// Iterate over keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.iter().map(|(key, _)| key)
    }
}

impl<V: Clone> RadixTree<V> {
    /// Insert or replace the value for `key`, returning the previous value.
    ///
    /// An empty key is ignored and returns `None`.
    pub fn replace_or_insert(&mut self, key: &[u8], value: V) -> Option<V> {
        let Some(&first) = key.first() else {
            return None;
        };
        let old = match self.children.find(first) {
            Ok(index) => self
                .children
                .mutable_child(&self.cx, index)
                .replace_or_insert(&self.cx, key, value),
            Err(index) => {
                let node = self.cx.new_node(key, Some(value));
                self.children.insert_at(index, Arc::new(node));
                None
            }
        };
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Remove `key`, returning its value if it was present.
    ///
    /// Deleting an absent or empty key is a no-op and forks nothing.
    pub fn delete(&mut self, key: &[u8]) -> Option<V> {
        if !self.contains(key) {
            return None;
        }
        let old = self.children.delete(&self.cx, key);
        if old.is_some() {
            self.len -= 1;
        }
        old
    }

    /// Take an O(1) snapshot.
    ///
    /// Both trees get fresh ownership contexts, so every node that exists
    /// now is shared and read-only to both. Each later write forks only the
    /// nodes on its own path. The returned tree gets its own pool with the
    /// same capacity; `self` keeps its pool.
    pub fn snapshot(&mut self) -> Self {
        let pool = Arc::new(NodePool::new(self.cx.pool().capacity()));
        let clone_cx = CowContext::new(pool);
        let own_cx = CowContext::new(self.cx.pool().clone());
        trace!(
            original = ?own_cx.generation(),
            clone = ?clone_cx.generation(),
            top_level = self.children.len(),
            "snapshot"
        );
        self.cx = own_cx;

        let mut children = Children::new();
        children.share_from(&self.children);
        Self::from_parts(clone_cx, children, self.len)
    }
}

impl<V: Clone + Default> RadixTree<V> {
    /// Insert `key` with a default value. An existing key is left untouched.
    ///
    /// Returns true if the key was newly added.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        if key.is_empty() || self.contains(key) {
            return false;
        }
        self.replace_or_insert(key, V::default());
        true
    }
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for RadixTree<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a RadixTree<V> {
    type Item = (Vec<u8>, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: Clone> FromIterator<(Vec<u8>, V)> for RadixTree<V> {
    fn from_iter<I: IntoIterator<Item = (Vec<u8>, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        for (key, value) in iter {
            tree.replace_or_insert(&key, value);
        }
        tree
    }
}

impl<V: Clone> Extend<(Vec<u8>, V)> for RadixTree<V> {
    fn extend<I: IntoIterator<Item = (Vec<u8>, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.replace_or_insert(&key, value);
        }
    }
}

/// Iterator over the entries of a [`RadixTree`], in key order.
pub struct Iter<'a, V> {
    stack: Vec<(usize, &'a Node<V>)>,
    key: Vec<u8>,
    /// Key length after each node on the current path.
    ends: Vec<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((depth, node)) = self.stack.pop() {
            self.ends.truncate(depth);
            self.key.truncate(self.ends.last().copied().unwrap_or(0));
            self.key.extend_from_slice(&node.prefix);
            self.ends.push(self.key.len());

            self.stack
                .extend(node.children.iter().rev().map(|child| (depth + 1, &**child)));

            if let Some(value) = &node.value {
                return Some((self.key.clone(), value));
            }
        }
        None
    }
}
