//! Self-balancing binary search tree where the heights of the two child subtrees of any node
//! differ by at most one.
//!
//! Nodes live in an arena and are linked to their parents, which gives in-place successor and
//! predecessor steps. `AvlMap` and `AvlSet` are the public faces of the tree.

mod map;
mod node;
mod set;
mod traverse;
mod tree;

pub use self::map::{
    AvlMap, AvlMapInorder, AvlMapIntoIter, AvlMapIter, AvlMapIterMut, AvlMapPostorder,
    AvlMapPreorder, Cursor, CursorMut, DEFAULT_CHUNK_SIZE,
};
pub use self::set::{AvlSet, AvlSetIntoIter, AvlSetIter};
pub use self::traverse::PrintMode;
