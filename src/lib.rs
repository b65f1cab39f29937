//! A persistent treap: an ordered set whose updates return new, immutable versions.
//!
//! Items are ordered by a caller-supplied [`Compare`] (or by `Ord`, via [`Natural`]) and shaped by
//! per-item priorities, so with random priorities the tree stays logarithmically deep without
//! any rotation logic. Every [`Treap`] handle is a snapshot: `upsert`, `delete` and `union`
//! return a new handle and leave the old one untouched, with unmodified subtrees shared between
//! them. Readers of an old version never need to coordinate with writers producing new ones.
//!
//! Node storage can optionally be recycled through a [`NodePool`]. The pool only takes back nodes
//! that no version can reach any more, so snapshots are never overwritten.
//!
//! # Examples
//!
//! ```
//! use ptreap::Treap;
//!
//! let v1 = Treap::new().upsert(1, 5).upsert(2, 9).upsert(3, 1);
//! let v2 = v1.delete(&2);
//!
//! assert_eq!(v1.get(&2), Some(&2));
//! assert_eq!(v2.get(&2), None);
//!
//! let mut seen = Vec::new();
//! v2.visit_ascend(&1, |&i| {
//!     seen.push(i);
//!     true
//! });
//! assert_eq!(seen, vec![1, 3]);
//! ```

mod compare;
mod error;
mod node;
mod pool;
mod treap;

pub use crate::compare::{Compare, Natural};
pub use crate::error::Error;
pub use crate::node::Priority;
pub use crate::pool::{NodePool, PoolBuilder, PoolStats};
pub use crate::treap::{Iter, Treap};
