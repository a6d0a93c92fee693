//! Nodes and ordered child lists.
//!
//! A node holds a prefix segment, an optional value and its children. Child
//! lists are sorted by the first byte of each child's prefix, and no two
//! siblings share a first byte, so lookup is a binary search.
//!
//! The tree is kept in canonical form: after every structural change a node
//! without a value never has exactly one child. Splits happen on insert when
//! a key diverges inside a prefix; merges happen on delete when a branch is
//! left with a single child.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::cow::{CowContext, Generation};

/// Prefix bytes; short segments stay inline.
pub(crate) type Prefix = SmallVec<[u8; 16]>;

#[derive(Clone)]
pub(crate) struct Node<V> {
    pub(crate) prefix: Prefix,
    pub(crate) value: Option<V>,
    pub(crate) children: Children<V>,
    pub(crate) owner: Generation,
}

/// Children sorted by first prefix byte.
#[derive(Clone)]
pub(crate) struct Children<V>(Vec<Arc<Node<V>>>);

/// Length of the shared prefix of two byte slices.
#[inline]
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

impl<V> Node<V> {
    pub(crate) fn empty(owner: Generation) -> Self {
        Self {
            prefix: Prefix::new(),
            value: None,
            children: Children::new(),
            owner,
        }
    }

    /// Drop contents but keep buffer capacity.
    pub(crate) fn clear(&mut self) {
        self.prefix.clear();
        self.value = None;
        self.children.clear();
    }

    #[inline]
    pub(crate) fn first_byte(&self) -> u8 {
        self.prefix[0]
    }

    /// Truncate this node to `prefix[..at]`, demoting everything else into a
    /// single new child.
    fn split(&mut self, cx: &CowContext<V>, at: usize) {
        debug_assert!(at > 0 && at < self.prefix.len());
        let mut demoted = cx.shell();
        demoted.prefix.extend_from_slice(&self.prefix[at..]);
        demoted.value = self.value.take();
        std::mem::swap(&mut demoted.children, &mut self.children);
        self.prefix.truncate(at);
        self.children.0.push(Arc::new(demoted));
    }

    /// Append a detached child: its prefix extends ours and its value and
    /// children are promoted. The emptied shell goes back to the pool.
    fn absorb(&mut self, cx: &CowContext<V>, mut child: Node<V>) {
        self.prefix.extend_from_slice(&child.prefix);
        self.value = child.value.take();
        std::mem::swap(&mut self.children, &mut child.children);
        cx.release(child);
    }

    /// Bring a node built outside insert/delete into canonical form, assuming
    /// its children already are. Returns false for a valueless leaf, which
    /// the caller must drop instead of attaching.
    pub(crate) fn canonicalize(&mut self, cx: &CowContext<V>) -> bool {
        if self.value.is_some() {
            return true;
        }
        match self.children.len() {
            0 => false,
            1 => {
                if let Some(child) = self.children.0.pop() {
                    match Arc::try_unwrap(child) {
                        Ok(child) => self.absorb(cx, child),
                        // Only fresh nodes are canonicalized; a shared child
                        // cannot be taken apart, so leave it attached.
                        Err(shared) => self.children.0.push(shared),
                    }
                }
                true
            }
            _ => true,
        }
    }
}

impl<V: Clone> Node<V> {
    /// Insert or replace below this node. `key` must start with this node's
    /// first prefix byte.
    pub(crate) fn replace_or_insert(&mut self, cx: &CowContext<V>, key: &[u8], value: V) -> Option<V> {
        let common = common_prefix_len(&self.prefix, key);

        if common == self.prefix.len() {
            let rest = &key[common..];
            let Some(&first) = rest.first() else {
                return self.value.replace(value);
            };
            return match self.children.find(first) {
                Ok(index) => self
                    .children
                    .mutable_child(cx, index)
                    .replace_or_insert(cx, rest, value),
                Err(index) => {
                    self.children.insert_at(index, Arc::new(cx.new_node(rest, Some(value))));
                    None
                }
            };
        }

        self.split(cx, common);
        let rest = &key[common..];
        match rest.first() {
            None => self.value = Some(value),
            Some(&first) => {
                let index = match self.children.find(first) {
                    Ok(index) | Err(index) => index,
                };
                self.children.insert_at(index, Arc::new(cx.new_node(rest, Some(value))));
            }
        }
        None
    }

    /// Absorb the only child: its prefix is appended to ours and its value
    /// and children are promoted.
    pub(crate) fn merge(&mut self, cx: &CowContext<V>) {
        debug_assert_eq!(self.children.len(), 1);
        let Some(child) = self.children.0.pop() else {
            return;
        };
        match Arc::try_unwrap(child) {
            Ok(child) => self.absorb(cx, child),
            Err(shared) => {
                self.prefix.extend_from_slice(&shared.prefix);
                self.value = shared.value.clone();
                self.children.share_from(&shared.children);
            }
        }
    }
}

impl<V> Children<V> {
    pub(crate) fn new() -> Self {
        Children(Vec::new())
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Arc<Node<V>>> {
        self.0.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    /// Replace contents with shared references to `other`'s nodes.
    pub(crate) fn share_from(&mut self, other: &Children<V>) {
        self.0.clear();
        self.0.extend(other.0.iter().cloned());
    }

    /// Binary search by first byte: `Ok(index)` of the matching child, or
    /// `Err(index)` where a new child with that byte belongs.
    #[inline]
    pub(crate) fn find(&self, first: u8) -> Result<usize, usize> {
        self.0.binary_search_by_key(&first, |child| child.first_byte())
    }

    #[inline]
    pub(crate) fn get(&self, first: u8) -> Option<&Node<V>> {
        self.find(first).ok().map(|index| &*self.0[index])
    }

    pub(crate) fn insert_at(&mut self, index: usize, node: Arc<Node<V>>) {
        debug_assert!(index == 0 || self.0[index - 1].first_byte() < node.first_byte());
        debug_assert!(index == self.0.len() || node.first_byte() < self.0[index].first_byte());
        self.0.insert(index, node);
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Arc<Node<V>> {
        self.0.remove(index)
    }

    /// Append a node that must sort after every current child. Returns false
    /// (and leaves the list unchanged) if it does not.
    pub(crate) fn push_ordered(&mut self, node: Arc<Node<V>>) -> bool {
        if let Some(last) = self.0.last() {
            if last.first_byte() >= node.first_byte() {
                return false;
            }
        }
        self.0.push(node);
        true
    }
}

impl<V: Clone> Children<V> {
    /// The child at `index`, forked into `cx` first if another context owns it.
    pub(crate) fn mutable_child(&mut self, cx: &CowContext<V>, index: usize) -> &mut Node<V> {
        let slot = &mut self.0[index];
        if !cx.owns(slot) {
            *slot = Arc::new(cx.fork(slot));
        }
        Arc::make_mut(slot)
    }

    /// Remove `key` from the subtree rooted at this list. `key` must be
    /// present; callers check membership first so that nothing is forked for
    /// an absent key.
    pub(crate) fn delete(&mut self, cx: &CowContext<V>, key: &[u8]) -> Option<V> {
        let first = *key.first()?;
        let index = self.find(first).ok()?;

        let child = &self.0[index];
        if !key.starts_with(&child.prefix) {
            return None;
        }

        if key.len() == child.prefix.len() {
            if child.value.is_none() {
                return None;
            }
            let node = self.mutable_child(cx, index);
            let old = node.value.take();
            match node.children.len() {
                0 => {
                    let removed = self.remove_at(index);
                    cx.recycle(removed);
                }
                1 => node.merge(cx),
                _ => {}
            }
            return old;
        }

        if child.children.is_empty() {
            return None;
        }

        let node = self.mutable_child(cx, index);
        let rest = &key[node.prefix.len()..];
        let old = node.children.delete(cx, rest);
        if node.value.is_none() && node.children.len() == 1 {
            node.merge(cx);
        }
        old
    }
}
