use crate::arena::Handle;
use crate::entry::Entry;

/// A struct representing an internal node of an avl tree. Children are owned by the node through
/// the tree's arena and `parent` is a plain lookup back up the tree.
pub struct Node<T, U> {
    pub entry: Entry<T, U>,
    pub height: i32,
    pub parent: Option<Handle>,
    pub left: Option<Handle>,
    pub right: Option<Handle>,
}

impl<T, U> Node<T, U> {
    pub fn new(key: T, value: U, parent: Option<Handle>) -> Self {
        Node {
            entry: Entry { key, value },
            height: 0,
            parent,
            left: None,
            right: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}
