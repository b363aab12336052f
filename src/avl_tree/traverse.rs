//! Ordered walks over a `Tree<T, U>`. All of them use explicit stacks or parent links instead of
//! recursion, so deep trees cannot overflow the call stack.

use crate::arena::Handle;
use crate::avl_tree::node::Node;
use crate::avl_tree::tree::Tree;
use crate::entry::Entry;
use std::fmt::Display;
use std::io::{self, Write};
use std::vec;

/// Selects what `print` writes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrintMode {
    /// Keys in pre-order on a single line.
    Preorder,
    /// Keys in sorted order on a single line.
    Inorder,
    /// Keys in post-order on a single line.
    Postorder,
    /// An indented drawing of the tree shape, one node per line.
    Tree,
}

/// Sorted iterator that only remembers the next node at each end and steps with `succ`/`pred`.
pub struct Iter<'a, T, U> {
    tree: &'a Tree<T, U>,
    front: Option<Handle>,
    back: Option<Handle>,
    remaining: usize,
}

impl<'a, T, U> Iter<'a, T, U> {
    pub fn new(tree: &'a Tree<T, U>) -> Self {
        Iter {
            tree,
            front: tree.min(tree.root()),
            back: tree.max(tree.root()),
            remaining: tree.len(),
        }
    }
}

impl<'a, T, U> Iterator for Iter<'a, T, U> {
    type Item = &'a Entry<T, U>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.front.expect("Expected a node before the back of the iterator.");
        self.front = self.tree.succ(handle);
        self.remaining -= 1;
        Some(self.tree.entry(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, U> DoubleEndedIterator for Iter<'a, T, U> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.back.expect("Expected a node after the front of the iterator.");
        self.back = self.tree.pred(handle);
        self.remaining -= 1;
        Some(self.tree.entry(handle))
    }
}

impl<'a, T, U> ExactSizeIterator for Iter<'a, T, U> {}

/// Sorted iterator yielding mutable entries.
pub struct IterMut<'a, T, U> {
    nodes: vec::IntoIter<&'a mut Node<T, U>>,
}

impl<'a, T, U> IterMut<'a, T, U> {
    pub fn new(tree: &'a mut Tree<T, U>) -> Self {
        let handles = tree.sorted_handles();
        IterMut {
            nodes: tree.nodes_mut(&handles).into_iter(),
        }
    }
}

impl<'a, T, U> Iterator for IterMut<'a, T, U> {
    type Item = (&'a T, &'a mut U);

    fn next(&mut self) -> Option<Self::Item> {
        self.nodes.next().map(|node| {
            let Entry { key, value } = &mut node.entry;
            (&*key, value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<'a, T, U> DoubleEndedIterator for IterMut<'a, T, U> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.nodes.next_back().map(|node| {
            let Entry { key, value } = &mut node.entry;
            (&*key, value)
        })
    }
}

/// Sorted iterator that consumes the tree.
pub struct IntoIter<T, U> {
    tree: Tree<T, U>,
    handles: vec::IntoIter<Handle>,
}

impl<T, U> IntoIter<T, U> {
    pub fn new(tree: Tree<T, U>) -> Self {
        let handles = tree.sorted_handles().into_iter();
        IntoIter { tree, handles }
    }
}

impl<T, U> Iterator for IntoIter<T, U> {
    type Item = Entry<T, U>;

    fn next(&mut self) -> Option<Self::Item> {
        let IntoIter { tree, handles } = self;
        handles.next().map(|handle| tree.take(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.handles.size_hint()
    }
}

impl<T, U> DoubleEndedIterator for IntoIter<T, U> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let IntoIter { tree, handles } = self;
        handles.next_back().map(|handle| tree.take(handle))
    }
}

/// Pre-order iterator: each node before its left subtree, then its right subtree.
pub struct Preorder<'a, T, U> {
    tree: &'a Tree<T, U>,
    stack: Vec<Handle>,
}

impl<'a, T, U> Preorder<'a, T, U> {
    pub fn new(tree: &'a Tree<T, U>) -> Self {
        Preorder {
            tree,
            stack: tree.root().into_iter().collect(),
        }
    }
}

impl<'a, T, U> Iterator for Preorder<'a, T, U> {
    type Item = &'a Entry<T, U>;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.stack.pop()?;
        let node = self.tree.node(handle);
        self.stack.extend(node.right);
        self.stack.extend(node.left);
        Some(&node.entry)
    }
}

/// In-order iterator driven by a stack of pending ancestors.
pub struct Inorder<'a, T, U> {
    tree: &'a Tree<T, U>,
    current: Option<Handle>,
    stack: Vec<Handle>,
}

impl<'a, T, U> Inorder<'a, T, U> {
    pub fn new(tree: &'a Tree<T, U>) -> Self {
        Inorder {
            tree,
            current: tree.root(),
            stack: Vec::new(),
        }
    }
}

impl<'a, T, U> Iterator for Inorder<'a, T, U> {
    type Item = &'a Entry<T, U>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(handle) = self.current {
            self.stack.push(handle);
            self.current = self.tree.node(handle).left;
        }
        self.stack.pop().map(|handle| {
            let node = self.tree.node(handle);
            self.current = node.right;
            &node.entry
        })
    }
}

/// Post-order iterator: both subtrees of a node before the node itself.
pub struct Postorder<'a, T, U> {
    tree: &'a Tree<T, U>,
    // a node is yielded the second time it is popped, once its children have been expanded
    stack: Vec<(Handle, bool)>,
}

impl<'a, T, U> Postorder<'a, T, U> {
    pub fn new(tree: &'a Tree<T, U>) -> Self {
        Postorder {
            tree,
            stack: tree.root().map(|root| (root, false)).into_iter().collect(),
        }
    }
}

impl<'a, T, U> Iterator for Postorder<'a, T, U> {
    type Item = &'a Entry<T, U>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((handle, expanded)) = self.stack.pop() {
            let node = self.tree.node(handle);
            if expanded {
                return Some(&node.entry);
            }
            self.stack.push((handle, true));
            self.stack.extend(node.right.map(|right| (right, false)));
            self.stack.extend(node.left.map(|left| (left, false)));
        }
        None
    }
}

fn write_keys<'a, T, U, I, W>(entries: I, writer: &mut W) -> io::Result<()>
where
    T: 'a + Display,
    U: 'a,
    I: Iterator<Item = &'a Entry<T, U>>,
    W: Write,
{
    for (index, entry) in entries.enumerate() {
        if index > 0 {
            write!(writer, " ")?;
        }
        write!(writer, "{}", entry.key)?;
    }
    writeln!(writer)
}

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Left,
    Right,
}

// Right children are drawn above left children. A node with a single child still draws the
// missing one as `nll` so the two sides can be told apart.
fn write_shape<T, U, W>(tree: &Tree<T, U>, writer: &mut W) -> io::Result<()>
where
    T: Display,
    W: Write,
{
    let mut stack = vec![(tree.root(), Side::Left, String::new())];
    while let Some((handle, side, prefix)) = stack.pop() {
        let branch = match side {
            Side::Left => "`--(",
            Side::Right => "|--(",
        };
        write!(writer, "{}{}", prefix, branch)?;

        let node = match handle {
            Some(handle) => tree.node(handle),
            None => {
                writeln!(writer, "nll)")?;
                continue;
            },
        };
        writeln!(writer, "{})", node.entry.key)?;

        if !node.is_leaf() {
            let indent = match side {
                Side::Left => "      ",
                Side::Right => "|     ",
            };
            let child_prefix = format!("{}{}", prefix, indent);
            stack.push((node.left, Side::Left, child_prefix.clone()));
            stack.push((node.right, Side::Right, child_prefix));
        }
    }
    Ok(())
}

pub fn print<T, U, W>(tree: &Tree<T, U>, mode: PrintMode, writer: &mut W) -> io::Result<()>
where
    T: Display,
    W: Write,
{
    match mode {
        PrintMode::Preorder => write_keys(Preorder::new(tree), writer),
        PrintMode::Inorder => write_keys(Inorder::new(tree), writer),
        PrintMode::Postorder => write_keys(Postorder::new(tree), writer),
        PrintMode::Tree => write_shape(tree, writer),
    }
}
