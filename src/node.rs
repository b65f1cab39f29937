//! Tree nodes and the links between them
//!
//! Nodes are shared between versions through `Arc`. Once a node is reachable from a version that
//! has been handed to a caller it is never written again; the only nodes an operation may touch
//! in place are those it built itself and still holds the sole reference to.

use std::sync::Arc;

/// Heap priority of a node. Larger priorities sit closer to the root.
pub type Priority = u64;

/// A possibly empty subtree
pub(crate) type Link<T> = Option<Arc<Node<T>>>;

pub(crate) struct Node<T> {
    pub(crate) item: T,
    pub(crate) priority: Priority,
    pub(crate) left: Link<T>,
    pub(crate) right: Link<T>,
}

impl<T> Node<T> {
    pub(crate) fn new(item: T, priority: Priority, left: Link<T>, right: Link<T>) -> Self {
        Node {
            item,
            priority,
            left,
            right,
        }
    }
}

impl<T> Drop for Node<T> {
    // Unlink uniquely owned descendants iteratively so that dropping a degenerate, list-shaped
    // tree can't exhaust the stack.
    fn drop(&mut self) {
        let mut stack: Vec<Arc<Node<T>>> = Vec::new();
        stack.extend(self.left.take());
        stack.extend(self.right.take());
        while let Some(mut node) = stack.pop() {
            if let Some(n) = Arc::get_mut(&mut node) {
                stack.extend(n.left.take());
                stack.extend(n.right.take());
            }
        }
    }
}

/// Take a node apart into `(node, left, right)`.
///
/// When the caller holds the only reference the children are moved out, so that rebuilding the
/// node later does not bump (and then drop) their reference counts. A shared node keeps its
/// children and the caller gets clones of the links.
pub(crate) fn detach<T>(mut node: Arc<Node<T>>) -> (Arc<Node<T>>, Link<T>, Link<T>) {
    match Arc::get_mut(&mut node) {
        Some(n) => {
            let left = n.left.take();
            let right = n.right.take();
            (node, left, right)
        }
        None => {
            let left = node.left.clone();
            let right = node.right.clone();
            (node, left, right)
        }
    }
}
