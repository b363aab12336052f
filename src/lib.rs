//! Ordered sets and maps backed by an arena-allocated avl tree.

pub mod arena;
pub mod avl_tree;
mod entry;
