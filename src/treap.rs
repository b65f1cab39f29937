//! A persistent treap
//!
//! A treap keeps its items in BST order under a [`Compare`] and its priorities in max-heap
//! order, so with random priorities the expected height is logarithmic. This one never
//! rebalances by rotation: every update is built from three primitives.
//!
//! - `split` cuts a tree around a pivot into (less, match, greater)
//! - `union` merges two trees, the higher priority root on top, splitting the other tree by it
//! - `join` glues two trees whose key ranges are already disjoint and ordered
//!
//! ## Versions
//!
//! `upsert`, `delete`, `union` and `split` take `&self` and return new [`Treap`] handles. The
//! receiver is left exactly as it was; new and old versions share every subtree the operation
//! didn't have to rebuild. A node is only ever written in place when the running operation built
//! it and `Arc::get_mut` confirms no other reference exists, which is never the case for a node
//! reachable from a version that has been returned.
//!
//! ## Priorities
//!
//! A key keeps the priority it was first inserted with. Upserting an existing key replaces the
//! item but ignores the new priority; to change it, delete the key and upsert it again.

use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use rand::Rng;

use crate::compare::{Compare, Natural};
use crate::error::Error;
use crate::node::{detach, Link, Node, Priority};
use crate::pool::NodePool;

/// One immutable version of a treap
///
/// Cloning a handle is O(1) and yields the same version.
pub struct Treap<T, C = Natural> {
    compare: Arc<C>,
    root: Link<T>,
    pool: Option<Arc<NodePool<T>>>,
}

impl<T: Ord> Treap<T> {
    /// Create an empty treap ordered by `T`'s `Ord` impl
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<T: Ord> Default for Treap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> Clone for Treap<T, C> {
    fn clone(&self) -> Self {
        Treap {
            compare: self.compare.clone(),
            root: self.root.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<T, C> Treap<T, C> {
    /// Create an empty treap ordered by `compare`
    ///
    /// Every version derived from this one uses the same comparator.
    pub fn with_comparator(compare: C) -> Self {
        Treap {
            compare: Arc::new(compare),
            root: None,
            pool: None,
        }
    }

    /// Create an empty treap whose versions draw nodes from, and return nodes to, `pool`
    pub fn with_pool(compare: C, pool: Arc<NodePool<T>>) -> Self {
        Treap {
            compare: Arc::new(compare),
            root: None,
            pool: Some(pool),
        }
    }

    /// The node pool shared by this version, if any
    pub fn pool(&self) -> Option<&Arc<NodePool<T>>> {
        self.pool.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Count the items. This walks the whole tree.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn height(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(&Node<T>, usize)> = Vec::new();
        stack.extend(self.root.as_deref().map(|n| (n, 1)));
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.left.as_deref().map(|n| (n, depth + 1)));
            stack.extend(node.right.as_deref().map(|n| (n, depth + 1)));
        }
        deepest
    }

    /// The smallest item
    pub fn min(&self) -> Option<&T> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some(&node.item)
    }

    /// The largest item
    pub fn max(&self) -> Option<&T> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some(&node.item)
    }

    /// Iterate over every item in ascending order
    pub fn iter(&self) -> Iter<'_, T> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left_spine(self.root.as_deref());
        iter
    }

    // Derive a version sharing this one's comparator and pool
    fn derive(&self, root: Link<T>) -> Self {
        Treap {
            compare: self.compare.clone(),
            root,
            pool: self.pool.clone(),
        }
    }

    // Helper function to build a node, from the pool when there is one
    fn alloc(&self, item: T, priority: Priority, left: Link<T>, right: Link<T>) -> Arc<Node<T>> {
        match &self.pool {
            Some(pool) => pool.acquire(item, priority, left, right),
            None => Arc::new(Node::new(item, priority, left, right)),
        }
    }

    // Helper function to discard a node an operation no longer needs
    fn release(&self, node: Arc<Node<T>>) {
        if let Some(pool) = &self.pool {
            pool.reclaim(node);
        }
    }
}

impl<T, C: Compare<T>> Treap<T, C> {
    // Helper function to find the node holding `target`
    fn find(&self, target: &T) -> Option<&Node<T>> {
        let mut link = self.root.as_deref();
        while let Some(node) = link {
            match self.compare.compare(target, &node.item) {
                Ordering::Less => link = node.left.as_deref(),
                Ordering::Greater => link = node.right.as_deref(),
                Ordering::Equal => return Some(node),
            }
        }
        None
    }

    /// Look up the item equal to `target`
    pub fn get(&self, target: &T) -> Option<&T> {
        self.find(target).map(|node| &node.item)
    }

    pub fn contains(&self, target: &T) -> bool {
        self.find(target).is_some()
    }

    /// The priority the item equal to `target` is stored with
    pub fn priority_of(&self, target: &T) -> Option<Priority> {
        self.find(target).map(|node| node.priority)
    }

    /// Call `visitor` on every item greater than or equal to `pivot`, in ascending order
    ///
    /// Traversal stops as soon as `visitor` returns `false`.
    pub fn visit_ascend<F>(&self, pivot: &T, mut visitor: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.visit_ascend_link(&self.root, pivot, &mut visitor);
    }

    // Returns false once the visitor has asked to stop
    fn visit_ascend_link<F>(&self, link: &Link<T>, pivot: &T, visitor: &mut F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let Some(node) = link else {
            return true;
        };
        if self.compare.compare(pivot, &node.item) != Ordering::Greater {
            if !self.visit_ascend_link(&node.left, pivot, visitor) {
                return false;
            }
            if !visitor(&node.item) {
                return false;
            }
        }
        self.visit_ascend_link(&node.right, pivot, visitor)
    }

    /// Iterate over the items greater than or equal to `pivot`, in ascending order
    ///
    /// Unlike [`Treap::visit_ascend`] this keeps its position on an explicit stack, so it is safe
    /// on arbitrarily deep trees.
    pub fn range_from(&self, pivot: &T) -> Iter<'_, T> {
        let mut iter = Iter { stack: Vec::new() };
        let mut link = self.root.as_deref();
        while let Some(node) = link {
            if self.compare.compare(pivot, &node.item) == Ordering::Greater {
                link = node.right.as_deref();
            } else {
                iter.stack.push(node);
                link = node.left.as_deref();
            }
        }
        iter
    }

    /// Verify the BST and heap invariants of this version
    pub fn check_invariants(&self) -> Result<(), Error> {
        self.check_link(&self.root, None, None, 0)
    }

    fn check_link(
        &self,
        link: &Link<T>,
        lower: Option<&T>,
        upper: Option<&T>,
        depth: usize,
    ) -> Result<(), Error> {
        let Some(node) = link else {
            return Ok(());
        };
        let above_lower =
            lower.map_or(true, |lo| self.compare.compare(lo, &node.item) == Ordering::Less);
        let below_upper =
            upper.map_or(true, |hi| self.compare.compare(&node.item, hi) == Ordering::Less);
        if !(above_lower && below_upper) {
            return Err(Error::KeyOrder { depth });
        }
        let children = [&node.left, &node.right];
        if children
            .into_iter()
            .flatten()
            .any(|child| child.priority > node.priority)
        {
            return Err(Error::HeapOrder { depth: depth + 1 });
        }
        self.check_link(&node.left, lower, Some(&node.item), depth + 1)?;
        self.check_link(&node.right, Some(&node.item), upper, depth + 1)
    }
}

impl<T: Clone, C: Compare<T>> Treap<T, C> {
    /// Insert `item`, or replace the item equal to it, returning the new version
    ///
    /// `priority` is only used if no equal item is present: an existing key keeps the priority
    /// it was first inserted with.
    pub fn upsert(&self, item: T, priority: Priority) -> Self {
        let priority = self.priority_of(&item).unwrap_or(priority);
        let single = self.alloc(item, priority, None, None);
        self.derive(self.union_links(self.root.clone(), Some(single)))
    }

    /// Upsert `item` with a priority drawn from `rng`
    pub fn upsert_with_rng<R: Rng>(&self, item: T, rng: &mut R) -> Self {
        self.upsert(item, rng.random())
    }

    /// Remove the item equal to `target`, returning the new version
    ///
    /// Removing an absent key yields a version with the same items.
    pub fn delete(&self, target: &T) -> Self {
        let (left, middle, right) = self.split_link(self.root.clone(), target);
        if let Some(middle) = middle {
            self.release(middle);
        }
        self.derive(self.join_links(left, right))
    }

    /// Merge `other` into this version
    ///
    /// Where both hold an equal item, `other`'s item is kept. Both versions must share the same
    /// order.
    pub fn union(&self, other: &Self) -> Self {
        self.derive(self.union_links(self.root.clone(), other.root.clone()))
    }

    /// Partition this version around `pivot`
    ///
    /// Returns the items less than `pivot`, the item equal to it if any, and the items greater.
    pub fn split(&self, pivot: &T) -> (Self, Option<T>, Self) {
        let (less, middle, greater) = self.split_link(self.root.clone(), pivot);
        let item = middle.map(|node| {
            let item = node.item.clone();
            self.release(node);
            item
        });
        (self.derive(less), item, self.derive(greater))
    }

    // Place `node`'s item at a position with the given priority and children, in place if
    // nothing else references the node
    fn reshape(
        &self,
        mut node: Arc<Node<T>>,
        priority: Priority,
        left: Link<T>,
        right: Link<T>,
    ) -> Arc<Node<T>> {
        if let Some(n) = Arc::get_mut(&mut node) {
            n.priority = priority;
            n.left = left;
            n.right = right;
            return node;
        }
        self.alloc(node.item.clone(), priority, left, right)
    }

    fn rebuild(&self, node: Arc<Node<T>>, left: Link<T>, right: Link<T>) -> Arc<Node<T>> {
        let priority = node.priority;
        self.reshape(node, priority, left, right)
    }

    // Split a subtree into (items < pivot, node equal to pivot, items > pivot)
    fn split_link(&self, link: Link<T>, pivot: &T) -> (Link<T>, Link<T>, Link<T>) {
        let Some(node) = link else {
            return (None, None, None);
        };
        let ord = self.compare.compare(pivot, &node.item);
        let (node, left, right) = detach(node);
        match ord {
            Ordering::Equal => (left, Some(node), right),
            Ordering::Less => {
                let (less, middle, greater) = self.split_link(left, pivot);
                (less, middle, Some(self.rebuild(node, greater, right)))
            }
            Ordering::Greater => {
                let (less, middle, greater) = self.split_link(right, pivot);
                (Some(self.rebuild(node, left, less)), middle, greater)
            }
        }
    }

    // Merge two subtrees. Items from `that` win collisions; on equal priorities `that`'s root
    // goes on top.
    fn union_links(&self, this: Link<T>, that: Link<T>) -> Link<T> {
        let (this, that) = match (this, that) {
            (None, that) => return that,
            (this, None) => return this,
            (Some(this), Some(that)) => (this, that),
        };
        if this.priority > that.priority {
            let (this, this_left, this_right) = detach(this);
            let (left, middle, right) = self.split_link(Some(that), &this.item);
            let left = self.union_links(this_left, left);
            let right = self.union_links(this_right, right);
            let root = match middle {
                // the colliding item moves in, the position keeps this's priority
                Some(middle) => {
                    let priority = this.priority;
                    self.release(this);
                    self.reshape(middle, priority, left, right)
                }
                None => self.rebuild(this, left, right),
            };
            Some(root)
        } else {
            let (that, that_left, that_right) = detach(that);
            let (left, middle, right) = self.split_link(Some(this), &that.item);
            if let Some(middle) = middle {
                self.release(middle);
            }
            let left = self.union_links(left, that_left);
            let right = self.union_links(right, that_right);
            Some(self.rebuild(that, left, right))
        }
    }

    // Concatenate two subtrees; every item of `this` must be less than every item of `that`
    fn join_links(&self, this: Link<T>, that: Link<T>) -> Link<T> {
        let (this, that) = match (this, that) {
            (None, that) => return that,
            (this, None) => return this,
            (Some(this), Some(that)) => (this, that),
        };
        if this.priority > that.priority {
            let (this, left, right) = detach(this);
            let right = self.join_links(right, Some(that));
            Some(self.rebuild(this, left, right))
        } else {
            let (that, left, right) = detach(that);
            let left = self.join_links(Some(this), left);
            Some(self.rebuild(that, left, right))
        }
    }
}

impl<T, C> Drop for Treap<T, C> {
    // Nodes only this version could reach go back to the pool; shared subtrees stay with the
    // versions still holding them.
    fn drop(&mut self) {
        if let (Some(pool), Some(root)) = (&self.pool, self.root.take()) {
            pool.reclaim(root);
        }
    }
}

impl<T: fmt::Debug, C> fmt::Debug for Treap<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T, C> IntoIterator for &'a Treap<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over the items of a version
pub struct Iter<'a, T> {
    // nodes whose item and right subtree are still to come, next one on top
    stack: Vec<&'a Node<T>>,
}

impl<'a, T> Iter<'a, T> {
    fn push_left_spine(&mut self, mut link: Option<&'a Node<T>>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = node.left.as_deref();
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        Some(&node.item)
    }
}

impl<T> FusedIterator for Iter<'_, T> {}
