use crate::arena::{Handle, TypedArena};
use crate::avl_tree::node::Node;
use compare::Compare;
use crate::entry::Entry;
use log::{debug, trace};
use std::cmp::{self, Ordering};

/// The node graph of an avl tree. Nodes are allocated in an arena and linked to each other through
/// handles, so parent links can be followed in constant time without aliasing the children.
pub struct Tree<T, U> {
    arena: TypedArena<Node<T, U>>,
    root: Option<Handle>,
}

impl<T, U> Tree<T, U> {
    pub fn new(chunk_size: usize) -> Self {
        Tree {
            arena: TypedArena::new(chunk_size),
            root: None,
        }
    }

    pub fn root(&self) -> Option<Handle> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn chunk_size(&self) -> usize {
        self.arena.chunk_size()
    }

    pub fn node(&self, handle: Handle) -> &Node<T, U> {
        &self.arena[handle]
    }

    pub fn entry(&self, handle: Handle) -> &Entry<T, U> {
        &self.arena[handle].entry
    }

    pub fn entry_mut(&mut self, handle: Handle) -> &mut Entry<T, U> {
        &mut self.arena[handle].entry
    }

    /// Returns the number of levels in the tree.
    pub fn height(&self) -> usize {
        self.root.map_or(0, |root| self.arena[root].height as usize + 1)
    }

    fn height_of(&self, tree: Option<Handle>) -> i32 {
        tree.map_or(-1, |handle| self.arena[handle].height)
    }

    fn recalculate_height(&mut self, handle: Handle) {
        let (left, right) = {
            let node = &self.arena[handle];
            (node.left, node.right)
        };
        self.arena[handle].height = cmp::max(self.height_of(left), self.height_of(right)) + 1;
    }

    fn balance_factor(&self, handle: Handle) -> i32 {
        let node = &self.arena[handle];
        self.height_of(node.right) - self.height_of(node.left)
    }

    // Points the link that referred to `old` at `new`, or the root if `old` had no parent.
    fn replace_child(&mut self, parent: Option<Handle>, old: Handle, new: Option<Handle>) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let node = &mut self.arena[parent];
                if node.left == Some(old) {
                    node.left = new;
                } else {
                    node.right = new;
                }
            },
        }
    }

    fn rotate_left(&mut self, handle: Handle) {
        let pivot = self.arena[handle]
            .right
            .expect("Expected right child node to be `Some`.");
        let inner = self.arena[pivot].left;
        let parent = self.arena[handle].parent;

        self.replace_child(parent, handle, Some(pivot));
        self.arena[pivot].parent = parent;
        self.arena[pivot].left = Some(handle);
        self.arena[handle].parent = Some(pivot);
        self.arena[handle].right = inner;
        if let Some(inner) = inner {
            self.arena[inner].parent = Some(handle);
        }

        self.recalculate_height(handle);
        self.recalculate_height(pivot);
        trace!("rotated {:?} left under {:?}", handle, pivot);
    }

    fn rotate_right(&mut self, handle: Handle) {
        let pivot = self.arena[handle]
            .left
            .expect("Expected left child node to be `Some`.");
        let inner = self.arena[pivot].right;
        let parent = self.arena[handle].parent;

        self.replace_child(parent, handle, Some(pivot));
        self.arena[pivot].parent = parent;
        self.arena[pivot].right = Some(handle);
        self.arena[handle].parent = Some(pivot);
        self.arena[handle].left = inner;
        if let Some(inner) = inner {
            self.arena[inner].parent = Some(handle);
        }

        self.recalculate_height(handle);
        self.recalculate_height(pivot);
        trace!("rotated {:?} right under {:?}", handle, pivot);
    }

    // A single insertion unbalances at most one ancestor and one rotation fixes it.
    fn rebalance_after_insert(&mut self, handle: Handle) {
        let mut curr = handle;
        while let Some(parent) = self.arena[curr].parent {
            curr = parent;
            self.recalculate_height(curr);

            match self.balance_factor(curr) {
                0 => break,
                -2 => {
                    let child = self.arena[curr]
                        .left
                        .expect("Expected left child node to be `Some`.");
                    if self.balance_factor(child) > 0 {
                        self.rotate_left(child);
                    }
                    self.rotate_right(curr);
                    break;
                },
                2 => {
                    let child = self.arena[curr]
                        .right
                        .expect("Expected right child node to be `Some`.");
                    if self.balance_factor(child) < 0 {
                        self.rotate_right(child);
                    }
                    self.rotate_left(curr);
                    break;
                },
                _ => {},
            }
        }
    }

    // Unlike insertion, the height of a subtree can still shrink after a rotation, so the walk
    // may rotate at every level up to the root.
    fn rebalance_after_remove(&mut self, start: Option<Handle>) {
        let mut curr = start;
        while let Some(handle) = curr {
            self.recalculate_height(handle);

            let subtree_root = match self.balance_factor(handle) {
                -1 | 1 => break,
                -2 => {
                    let child = self.arena[handle]
                        .left
                        .expect("Expected left child node to be `Some`.");
                    match self.balance_factor(child) {
                        0 => {
                            self.rotate_right(handle);
                            break;
                        },
                        1 => {
                            self.rotate_left(child);
                            self.rotate_right(handle);
                        },
                        _ => self.rotate_right(handle),
                    }
                    self.arena[handle].parent
                },
                2 => {
                    let child = self.arena[handle]
                        .right
                        .expect("Expected right child node to be `Some`.");
                    match self.balance_factor(child) {
                        0 => {
                            self.rotate_left(handle);
                            break;
                        },
                        -1 => {
                            self.rotate_right(child);
                            self.rotate_left(handle);
                        },
                        _ => self.rotate_left(handle),
                    }
                    self.arena[handle].parent
                },
                _ => Some(handle),
            };

            curr = subtree_root.and_then(|root| self.arena[root].parent);
        }
    }

    /// Inserts `key` if it is absent, creating its value with `make_value`. Returns the handle of
    /// the node holding `key` and whether a new node was created. An existing node is left
    /// untouched.
    pub fn insert_with<C, F>(&mut self, compare: &C, key: T, make_value: F) -> (Handle, bool)
    where
        C: Compare<T>,
        F: FnOnce() -> U,
    {
        let mut parent = None;
        let mut is_left = false;
        let mut curr = self.root;
        while let Some(handle) = curr {
            let node = &self.arena[handle];
            parent = Some(handle);
            match compare.compare(&key, &node.entry.key) {
                Ordering::Less => {
                    is_left = true;
                    curr = node.left;
                },
                Ordering::Greater => {
                    is_left = false;
                    curr = node.right;
                },
                Ordering::Equal => return (handle, false),
            }
        }

        let new_node = self.arena.allocate(Node::new(key, make_value(), parent));
        match parent {
            None => self.root = Some(new_node),
            Some(parent) => {
                if is_left {
                    self.arena[parent].left = Some(new_node);
                } else {
                    self.arena[parent].right = Some(new_node);
                }
                self.rebalance_after_insert(new_node);
            },
        }
        (new_node, true)
    }

    /// Unlinks the node behind `handle`, frees it, and restores the avl invariant. The handles of
    /// all other nodes stay valid.
    pub fn remove(&mut self, handle: Handle) -> Entry<T, U> {
        let (parent, left, right) = {
            let node = &self.arena[handle];
            (node.parent, node.left, node.right)
        };

        let rebalance_from = match (left, right) {
            (None, None) => {
                self.replace_child(parent, handle, None);
                parent
            },
            (Some(child), None) | (None, Some(child)) => {
                self.replace_child(parent, handle, Some(child));
                self.arena[child].parent = parent;
                parent
            },
            (Some(left), Some(right)) => {
                let succ = self
                    .min(Some(right))
                    .expect("Expected right subtree to be non-empty.");
                let start = if succ == right {
                    succ
                } else {
                    let succ_parent = self.arena[succ]
                        .parent
                        .expect("Expected successor to have a parent.");
                    let succ_right = self.arena[succ].right;
                    self.arena[succ_parent].left = succ_right;
                    if let Some(succ_right) = succ_right {
                        self.arena[succ_right].parent = Some(succ_parent);
                    }
                    self.arena[succ].right = Some(right);
                    self.arena[right].parent = Some(succ);
                    succ_parent
                };

                // The walk from `start` may stop below `succ`, so `succ` takes over the height of
                // the node it replaces.
                self.arena[succ].height = self.arena[handle].height;
                self.arena[succ].left = Some(left);
                self.arena[left].parent = Some(succ);
                self.arena[succ].parent = parent;
                self.replace_child(parent, handle, Some(succ));
                Some(start)
            },
        };

        let Node { entry, .. } = self.arena.free(handle);
        self.rebalance_after_remove(rebalance_from);
        entry
    }

    /// Drops every node of the tree.
    pub fn clear(&mut self) {
        debug!("clearing avl tree with {} nodes", self.len());
        self.arena.clear();
        self.root = None;
    }

    pub fn search<C, V>(&self, compare: &C, key: &V) -> Option<Handle>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        let mut curr = self.root;
        while let Some(handle) = curr {
            let node = &self.arena[handle];
            curr = match compare.compare(key, &node.entry.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(handle),
            };
        }
        None
    }

    pub fn floor<C, V>(&self, compare: &C, key: &V) -> Option<Handle>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        let mut curr = self.root;
        let mut best = None;
        while let Some(handle) = curr {
            let node = &self.arena[handle];
            curr = match compare.compare(key, &node.entry.key) {
                Ordering::Less => node.left,
                Ordering::Greater => {
                    best = Some(handle);
                    node.right
                },
                Ordering::Equal => return Some(handle),
            };
        }
        best
    }

    pub fn ceil<C, V>(&self, compare: &C, key: &V) -> Option<Handle>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        let mut curr = self.root;
        let mut best = None;
        while let Some(handle) = curr {
            let node = &self.arena[handle];
            curr = match compare.compare(key, &node.entry.key) {
                Ordering::Less => {
                    best = Some(handle);
                    node.left
                },
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(handle),
            };
        }
        best
    }

    pub fn min(&self, tree: Option<Handle>) -> Option<Handle> {
        let mut curr = tree?;
        while let Some(left) = self.arena[curr].left {
            curr = left;
        }
        Some(curr)
    }

    pub fn max(&self, tree: Option<Handle>) -> Option<Handle> {
        let mut curr = tree?;
        while let Some(right) = self.arena[curr].right {
            curr = right;
        }
        Some(curr)
    }

    pub fn succ(&self, handle: Handle) -> Option<Handle> {
        let node = &self.arena[handle];
        if node.right.is_some() {
            return self.min(node.right);
        }

        let mut curr = handle;
        while let Some(parent) = self.arena[curr].parent {
            if self.arena[parent].right != Some(curr) {
                return Some(parent);
            }
            curr = parent;
        }
        None
    }

    pub fn pred(&self, handle: Handle) -> Option<Handle> {
        let node = &self.arena[handle];
        if node.left.is_some() {
            return self.max(node.left);
        }

        let mut curr = handle;
        while let Some(parent) = self.arena[curr].parent {
            if self.arena[parent].left != Some(curr) {
                return Some(parent);
            }
            curr = parent;
        }
        None
    }

    /// Returns the handles of all nodes in sorted order.
    pub fn sorted_handles(&self) -> Vec<Handle> {
        let mut handles = Vec::with_capacity(self.len());
        let mut curr = self.min(self.root);
        while let Some(handle) = curr {
            handles.push(handle);
            curr = self.succ(handle);
        }
        handles
    }

    /// Returns mutable references to the nodes behind `handles`, in the same order.
    pub fn nodes_mut(&mut self, handles: &[Handle]) -> Vec<&mut Node<T, U>> {
        self.arena.get_all_mut(handles)
    }

    /// Frees the node behind `handle` without unlinking it. Only used when the whole tree is being
    /// torn down and no further lookups will happen.
    pub fn take(&mut self, handle: Handle) -> Entry<T, U> {
        let Node { entry, .. } = self.arena.free(handle);
        entry
    }

    // Deep copies `other` into this tree, which must be empty. Source and destination nodes are
    // paired on an explicit stack so the copy does not recurse.
    fn copy_from(&mut self, other: &Self)
    where
        T: Clone,
        U: Clone,
    {
        debug_assert!(self.root.is_none());
        let other_root = match other.root {
            Some(root) => root,
            None => return,
        };

        let root = self.allocate_copy(&other.arena[other_root], None);
        self.root = Some(root);

        let mut stack = vec![(root, other_root)];
        while let Some((node, other_node)) = stack.pop() {
            let (other_left, other_right) = {
                let other_node = &other.arena[other_node];
                (other_node.left, other_node.right)
            };
            if let Some(other_right) = other_right {
                let right = self.allocate_copy(&other.arena[other_right], Some(node));
                self.arena[node].right = Some(right);
                stack.push((right, other_right));
            }
            if let Some(other_left) = other_left {
                let left = self.allocate_copy(&other.arena[other_left], Some(node));
                self.arena[node].left = Some(left);
                stack.push((left, other_left));
            }
        }
        debug!("copied avl tree with {} nodes", self.len());
    }

    fn allocate_copy(&mut self, node: &Node<T, U>, parent: Option<Handle>) -> Handle
    where
        T: Clone,
        U: Clone,
    {
        self.arena.allocate(Node {
            entry: node.entry.clone(),
            height: node.height,
            parent,
            left: None,
            right: None,
        })
    }
}

impl<T, U> Clone for Tree<T, U>
where
    T: Clone,
    U: Clone,
{
    fn clone(&self) -> Self {
        let mut tree = Tree::new(self.chunk_size());
        tree.copy_from(self);
        tree
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.copy_from(source);
    }
}

#[cfg(test)]
pub mod tests {
    use super::Tree;
    use compare::{natural, Compare};
    use rand::{Rng, SeedableRng, XorShiftRng};
    use std::cmp::{self, Ordering};
    use std::collections::BTreeMap;

    // Walks the whole tree and checks ordering, cached heights, balance factors and parent links.
    // Returns the number of nodes reached from the root.
    pub fn check_invariants<T, U, C>(tree: &Tree<T, U>, compare: &C) -> usize
    where
        C: Compare<T>,
    {
        let root = match tree.root() {
            Some(root) => root,
            None => {
                assert_eq!(tree.len(), 0);
                return 0;
            },
        };
        assert_eq!(tree.node(root).parent, None);

        let mut count = 0;
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            count += 1;
            let node = tree.node(handle);
            let mut child_heights = [-1, -1];
            for (index, child) in [node.left, node.right].iter().enumerate() {
                if let Some(child) = *child {
                    let child_node = tree.node(child);
                    assert_eq!(child_node.parent, Some(handle));
                    let expected = if index == 0 { Ordering::Less } else { Ordering::Greater };
                    assert_eq!(compare.compare(&child_node.entry.key, &node.entry.key), expected);
                    child_heights[index] = child_node.height;
                    stack.push(child);
                }
            }
            assert_eq!(node.height, cmp::max(child_heights[0], child_heights[1]) + 1);
            assert!((child_heights[1] - child_heights[0]).abs() <= 1);
        }

        let sorted = tree.sorted_handles();
        for pair in sorted.windows(2) {
            assert_eq!(
                compare.compare(&tree.entry(pair[0]).key, &tree.entry(pair[1]).key),
                Ordering::Less,
            );
        }
        assert_eq!(sorted.len(), count);
        assert_eq!(tree.len(), count);
        count
    }

    fn insert(tree: &mut Tree<u32, u32>, key: u32) -> bool {
        tree.insert_with(&natural(), key, || key * 10).1
    }

    fn remove(tree: &mut Tree<u32, u32>, key: u32) -> Option<u32> {
        tree.search(&natural(), &key).map(|handle| tree.remove(handle).value)
    }

    fn keys(tree: &Tree<u32, u32>) -> Vec<u32> {
        tree.sorted_handles()
            .into_iter()
            .map(|handle| tree.entry(handle).key)
            .collect()
    }

    #[test]
    fn test_insert_ascending_stays_balanced() {
        let mut tree = Tree::new(16);
        for key in 1..8 {
            assert!(insert(&mut tree, key));
            check_invariants(&tree, &natural());
        }
        assert_eq!(tree.height(), 3);
        let root = tree.root().unwrap();
        assert_eq!(tree.entry(root).key, 4);
    }

    #[test]
    fn test_insert_double_rotations() {
        let mut tree = Tree::new(16);
        for &key in &[3, 1, 2] {
            insert(&mut tree, key);
        }
        check_invariants(&tree, &natural());
        assert_eq!(tree.entry(tree.root().unwrap()).key, 2);

        let mut tree = Tree::new(16);
        for &key in &[1, 3, 2] {
            insert(&mut tree, key);
        }
        check_invariants(&tree, &natural());
        assert_eq!(tree.entry(tree.root().unwrap()).key, 2);
    }

    #[test]
    fn test_insert_duplicate() {
        let mut tree = Tree::new(16);
        assert!(insert(&mut tree, 1));
        let (handle, inserted) = tree.insert_with(&natural(), 1, || 0);
        assert!(!inserted);
        assert_eq!(tree.entry(handle).value, 10);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_remove_leaf_and_single_child() {
        let mut tree = Tree::new(16);
        for &key in &[5, 3, 8, 1] {
            insert(&mut tree, key);
        }
        assert_eq!(remove(&mut tree, 8), Some(80));
        check_invariants(&tree, &natural());
        assert_eq!(remove(&mut tree, 3), Some(30));
        check_invariants(&tree, &natural());
        assert_eq!(keys(&tree), vec![1, 5]);
    }

    #[test]
    fn test_remove_two_children() {
        let mut tree = Tree::new(16);
        for &key in &[5, 3, 8, 1, 4, 7, 9] {
            insert(&mut tree, key);
        }
        assert_eq!(remove(&mut tree, 3), Some(30));
        check_invariants(&tree, &natural());
        assert_eq!(remove(&mut tree, 8), Some(80));
        check_invariants(&tree, &natural());
        assert_eq!(keys(&tree), vec![1, 4, 5, 7, 9]);
    }

    #[test]
    fn test_remove_deep_successor() {
        let mut tree = Tree::new(16);
        for &key in &[50, 20, 80, 10, 30, 70, 90, 60, 75, 65] {
            insert(&mut tree, key);
            check_invariants(&tree, &natural());
        }
        assert_eq!(remove(&mut tree, 50), Some(500));
        check_invariants(&tree, &natural());
        assert_eq!(tree.entry(tree.root().unwrap()).key, 60);
        assert_eq!(keys(&tree), vec![10, 20, 30, 60, 65, 70, 75, 80, 90]);
    }

    #[test]
    fn test_remove_keeps_other_handles() {
        let mut tree = Tree::new(16);
        for key in 0..32 {
            insert(&mut tree, key);
        }
        let handle = tree.search(&natural(), &17).unwrap();
        for key in (0..32).filter(|key| *key != 17) {
            remove(&mut tree, key);
            check_invariants(&tree, &natural());
            assert_eq!(tree.entry(handle).key, 17);
        }
        assert_eq!(tree.root(), Some(handle));
    }

    #[test]
    fn test_remove_cascading_rotations() {
        let mut tree = Tree::new(64);
        for key in 0..64 {
            insert(&mut tree, key);
        }
        for key in (0..64).filter(|key| key % 3 != 0) {
            remove(&mut tree, key);
            check_invariants(&tree, &natural());
        }
        assert_eq!(keys(&tree), (0..64).filter(|key| key % 3 == 0).collect::<Vec<u32>>());
    }

    #[test]
    fn test_succ_pred() {
        let mut tree = Tree::new(16);
        for key in 0..20 {
            insert(&mut tree, key * 2);
        }
        for key in 0..20 {
            let handle = tree.search(&natural(), &(key * 2)).unwrap();
            let succ = tree.succ(handle).map(|handle| tree.entry(handle).key);
            let pred = tree.pred(handle).map(|handle| tree.entry(handle).key);
            assert_eq!(succ, if key == 19 { None } else { Some(key * 2 + 2) });
            assert_eq!(pred, if key == 0 { None } else { Some(key * 2 - 2) });
        }
    }

    #[test]
    fn test_floor_ceil() {
        let mut tree = Tree::new(16);
        for &key in &[10, 20, 30] {
            insert(&mut tree, key);
        }
        let floor = |key: u32| tree.floor(&natural(), &key).map(|handle| tree.entry(handle).key);
        assert_eq!(floor(5), None);
        assert_eq!(floor(25), Some(20));
        assert_eq!(floor(30), Some(30));
        let ceil = |key: u32| tree.ceil(&natural(), &key).map(|handle| tree.entry(handle).key);
        assert_eq!(ceil(5), Some(10));
        assert_eq!(ceil(25), Some(30));
        assert_eq!(ceil(35), None);
    }

    #[test]
    fn test_clone_independent() {
        let mut tree = Tree::new(4);
        for key in 0..50 {
            insert(&mut tree, key);
        }
        let mut copy = tree.clone();
        check_invariants(&copy, &natural());
        assert_eq!(keys(&copy), keys(&tree));

        remove(&mut tree, 10);
        insert(&mut copy, 100);
        assert_eq!(keys(&tree).len(), 49);
        assert_eq!(keys(&copy).len(), 51);
        assert!(keys(&copy).contains(&10));

        copy.clone_from(&tree);
        check_invariants(&copy, &natural());
        assert_eq!(keys(&copy), keys(&tree));
    }

    #[test]
    fn test_random_operations_keep_invariants() {
        for seed in 1..17 {
            let mut rng: XorShiftRng = SeedableRng::from_seed([seed, 1, 1, 1]);
            let mut tree = Tree::new(3);
            let mut expected = BTreeMap::new();
            for step in 0..2_000 {
                let key = rng.gen_range(0, 200u32);
                if rng.gen_weighted_bool(3) {
                    assert_eq!(remove(&mut tree, key), expected.remove(&key));
                } else {
                    let value = rng.next_u32();
                    let (handle, inserted) = tree.insert_with(&natural(), key, || value);
                    assert_eq!(inserted, !expected.contains_key(&key));
                    let stored = *expected.entry(key).or_insert(value);
                    assert_eq!(tree.entry(handle).value, stored);
                }
                assert_eq!(check_invariants(&tree, &natural()), expected.len());

                if step % 250 == 0 {
                    let copy = tree.clone();
                    check_invariants(&copy, &natural());
                    assert_eq!(keys(&copy), keys(&tree));

                    let mut other = Tree::new(5);
                    for key in 500..520 {
                        insert(&mut other, key);
                    }
                    other.clone_from(&tree);
                    check_invariants(&other, &natural());
                    assert_eq!(keys(&other), keys(&tree));
                }
            }
            assert_eq!(keys(&tree), expected.keys().cloned().collect::<Vec<u32>>());
        }
    }

    #[test]
    fn test_clear() {
        let mut tree = Tree::new(4);
        for key in 0..10 {
            insert(&mut tree, key);
        }
        tree.clear();
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.root(), None);
        assert_eq!(tree.height(), 0);
        insert(&mut tree, 3);
        check_invariants(&tree, &natural());
    }
}
