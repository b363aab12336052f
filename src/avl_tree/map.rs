use crate::arena::Handle;
use crate::avl_tree::traverse::{self, PrintMode};
use crate::avl_tree::tree::Tree;
use compare::{natural, Compare, Natural};
use crate::entry::Entry;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt::{self, Debug, Display};
use std::io::{self, Write};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::ptr;

/// The number of nodes allocated at a time when no chunk size is given.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// An ordered map implemented using an avl tree.
///
/// An avl tree is a self-balancing binary search tree that maintains the invariant that the
/// heights of the two child subtrees of any node differ by at most one. Nodes are kept in an arena
/// and carry a link to their parent, so the map can step to the next or previous key in place and
/// iterate in sorted order without extra storage.
///
/// Keys are ordered by a comparator, which defaults to the natural order of the key type. Keys are
/// never overwritten: inserting a key that is already present leaves its entry untouched.
///
/// # Examples
/// ```
/// use avl_collections::avl_tree::AvlMap;
///
/// let mut map = AvlMap::new();
/// map.insert(0, 1);
/// map.insert(3, 4);
///
/// assert_eq!(map[&0], 1);
/// assert_eq!(map.get(&1), None);
/// assert_eq!(map.len(), 2);
///
/// assert_eq!(map.min(), Some(&0));
/// assert_eq!(map.succ(&0), Some(&3));
///
/// *map.get_or_insert_default(5) += 6;
/// assert_eq!(map[&5], 6);
///
/// map[&0] = 2;
/// assert_eq!(map.remove(&0), Some((0, 2)));
/// assert_eq!(map.remove(&1), None);
/// ```
pub struct AvlMap<T, U, C = Natural<T>> {
    tree: Tree<T, U>,
    compare: C,
}

impl<T, U> AvlMap<T, U>
where
    T: Ord,
{
    /// Constructs a new, empty `AvlMap<T, U>` ordered by the natural order of `T`.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let map: AvlMap<u32, u32> = AvlMap::new();
    /// ```
    pub fn new() -> Self {
        Self::with_comparator(natural())
    }

    /// Constructs a new, empty `AvlMap<T, U>` that allocates `chunk_size` nodes at a time.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let map: AvlMap<u32, u32> = AvlMap::with_chunk_size(16);
    /// ```
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self::with_comparator_and_chunk_size(natural(), chunk_size)
    }
}

impl<T, U, C> AvlMap<T, U, C> {
    /// Constructs a new, empty `AvlMap<T, U, C>` ordered by `compare`.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::with_comparator(|a: &u32, b: &u32| b.cmp(a));
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    /// assert_eq!(map.min(), Some(&2));
    /// ```
    ///
    /// Keys can be looked up through a borrowed form when the comparator is borrowing:
    ///
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    /// use compare::{natural, Compare};
    ///
    /// let mut map = AvlMap::with_comparator(natural::<str>().borrowing());
    /// map.insert(String::from("a"), 1);
    /// assert_eq!(map.get("a"), Some(&1));
    /// ```
    pub fn with_comparator(compare: C) -> Self {
        Self::with_comparator_and_chunk_size(compare, DEFAULT_CHUNK_SIZE)
    }

    /// Constructs a new, empty `AvlMap<T, U, C>` ordered by `compare` that allocates `chunk_size`
    /// nodes at a time.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn with_comparator_and_chunk_size(compare: C, chunk_size: usize) -> Self {
        AvlMap {
            tree: Tree::new(chunk_size),
            compare,
        }
    }

    /// Returns the comparator that orders the keys of the map.
    pub fn comparator(&self) -> &C {
        &self.compare
    }

    /// Inserts a key-value pair into the map. Returns `true` if the key was absent. If the key
    /// already exists, the map is left unchanged and `false` is returned.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// assert!(map.insert(1, 1));
    /// assert!(!map.insert(1, 2));
    /// assert_eq!(map.get(&1), Some(&1));
    /// ```
    pub fn insert(&mut self, key: T, value: U) -> bool
    where
        C: Compare<T>,
    {
        self.tree.insert_with(&self.compare, key, || value).1
    }

    /// Returns a mutable reference to the value associated with `key`, inserting the default
    /// value first if the key is absent. An existing value is never replaced.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map: AvlMap<&str, u32> = AvlMap::new();
    /// *map.get_or_insert_default("a") += 1;
    /// *map.get_or_insert_default("a") += 1;
    /// assert_eq!(map.get(&"a"), Some(&2));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn get_or_insert_default(&mut self, key: T) -> &mut U
    where
        C: Compare<T>,
        U: Default,
    {
        let (handle, _) = self.tree.insert_with(&self.compare, key, U::default);
        &mut self.tree.entry_mut(handle).value
    }

    /// Removes a key-value pair from the map. If the key exists in the map, it will return the
    /// associated key-value pair. Otherwise it will return `None`.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// assert_eq!(map.remove(&1), Some((1, 1)));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<V>(&mut self, key: &V) -> Option<(T, U)>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        let handle = self.tree.search(&self.compare, key)?;
        Some(self.tree.remove(handle).into_pair())
    }

    /// Checks if a key exists in the map.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// assert!(!map.contains_key(&0));
    /// assert!(map.contains_key(&1));
    /// ```
    pub fn contains_key<V>(&self, key: &V) -> bool
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.tree.search(&self.compare, key).is_some()
    }

    /// Returns an immutable reference to the value associated with a particular key. It will
    /// return `None` if the key does not exist in the map.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// assert_eq!(map.get(&0), None);
    /// assert_eq!(map.get(&1), Some(&1));
    /// ```
    pub fn get<V>(&self, key: &V) -> Option<&U>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.tree
            .search(&self.compare, key)
            .map(|handle| &self.tree.entry(handle).value)
    }

    /// Returns a mutable reference to the value associated with a particular key. Returns `None`
    /// if such a key does not exist.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// *map.get_mut(&1).unwrap() = 2;
    /// assert_eq!(map.get(&1), Some(&2));
    /// ```
    pub fn get_mut<V>(&mut self, key: &V) -> Option<&mut U>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        let handle = self.tree.search(&self.compare, key)?;
        Some(&mut self.tree.entry_mut(handle).value)
    }

    /// Returns the number of elements in the map.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the map is empty.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let map: AvlMap<u32, u32> = AvlMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of levels in the underlying tree. An empty map has height zero.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// for key in 1..8 {
    ///     map.insert(key, ());
    /// }
    /// assert_eq!(map.height(), 3);
    /// ```
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Clears the map, removing all values.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// map.insert(2, 2);
    /// map.clear();
    /// assert_eq!(map.is_empty(), true);
    /// ```
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns a key in the map that is less than or equal to a particular key. Returns `None` if
    /// such a key does not exist.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// assert_eq!(map.floor(&0), None);
    /// assert_eq!(map.floor(&2), Some(&1));
    /// ```
    pub fn floor<V>(&self, key: &V) -> Option<&T>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.tree
            .floor(&self.compare, key)
            .map(|handle| &self.tree.entry(handle).key)
    }

    /// Returns a key in the map that is greater than or equal to a particular key. Returns `None`
    /// if such a key does not exist.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// assert_eq!(map.ceil(&0), Some(&1));
    /// assert_eq!(map.ceil(&2), None);
    /// ```
    pub fn ceil<V>(&self, key: &V) -> Option<&T>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.tree
            .ceil(&self.compare, key)
            .map(|handle| &self.tree.entry(handle).key)
    }

    /// Returns the minimum key of the map. Returns `None` if the map is empty.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// map.insert(3, 3);
    /// assert_eq!(map.min(), Some(&1));
    /// ```
    pub fn min(&self) -> Option<&T> {
        self.tree
            .min(self.tree.root())
            .map(|handle| &self.tree.entry(handle).key)
    }

    /// Returns the maximum key of the map. Returns `None` if the map is empty.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// map.insert(3, 3);
    /// assert_eq!(map.max(), Some(&3));
    /// ```
    pub fn max(&self) -> Option<&T> {
        self.tree
            .max(self.tree.root())
            .map(|handle| &self.tree.entry(handle).key)
    }

    /// Returns the smallest key greater than `key`. Returns `None` if `key` is not in the map or
    /// is its maximum.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// map.insert(3, 3);
    /// assert_eq!(map.succ(&1), Some(&3));
    /// assert_eq!(map.succ(&2), None);
    /// assert_eq!(map.succ(&3), None);
    /// ```
    pub fn succ<V>(&self, key: &V) -> Option<&T>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.tree
            .search(&self.compare, key)
            .and_then(|handle| self.tree.succ(handle))
            .map(|handle| &self.tree.entry(handle).key)
    }

    /// Returns the largest key less than `key`. Returns `None` if `key` is not in the map or is
    /// its minimum.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// map.insert(3, 3);
    /// assert_eq!(map.pred(&3), Some(&1));
    /// assert_eq!(map.pred(&1), None);
    /// ```
    pub fn pred<V>(&self, key: &V) -> Option<&T>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.tree
            .search(&self.compare, key)
            .and_then(|handle| self.tree.pred(handle))
            .map(|handle| &self.tree.entry(handle).key)
    }

    /// Returns a cursor at the entry with a particular key, or at the end position if the key does
    /// not exist.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 2);
    /// map.insert(3, 4);
    ///
    /// let mut cursor = map.find(&1);
    /// assert_eq!(cursor.entry(), Some((&1, &2)));
    /// cursor.move_next();
    /// assert_eq!(cursor.key(), Some(&3));
    /// cursor.move_next();
    /// assert_eq!(cursor, map.cursor_end());
    /// assert!(map.find(&2).is_end());
    /// ```
    pub fn find<V>(&self, key: &V) -> Cursor<'_, T, U, C>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        Cursor {
            map: self,
            node: self.tree.search(&self.compare, key),
        }
    }

    /// Returns a mutable cursor at the entry with a particular key, or at the end position if the
    /// key does not exist.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 2);
    /// map.insert(3, 4);
    ///
    /// let mut cursor = map.find_mut(&1);
    /// assert_eq!(cursor.remove_current(), Some((1, 2)));
    /// assert_eq!(cursor.key(), Some(&3));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn find_mut<V>(&mut self, key: &V) -> CursorMut<'_, T, U, C>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        let node = self.tree.search(&self.compare, key);
        CursorMut { map: self, node }
    }

    /// Returns a cursor at the minimum entry of the map, or at the end position if the map is
    /// empty.
    pub fn cursor_front(&self) -> Cursor<'_, T, U, C> {
        Cursor {
            map: self,
            node: self.tree.min(self.tree.root()),
        }
    }

    /// Returns a cursor at the maximum entry of the map, or at the end position if the map is
    /// empty.
    pub fn cursor_back(&self) -> Cursor<'_, T, U, C> {
        Cursor {
            map: self,
            node: self.tree.max(self.tree.root()),
        }
    }

    /// Returns a cursor at the end position, one past the maximum entry.
    pub fn cursor_end(&self) -> Cursor<'_, T, U, C> {
        Cursor {
            map: self,
            node: None,
        }
    }

    /// Returns a mutable cursor at the minimum entry of the map, or at the end position if the map
    /// is empty.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// for key in 0..6 {
    ///     map.insert(key, key);
    /// }
    ///
    /// let mut cursor = map.cursor_front_mut();
    /// while let Some(&key) = cursor.key() {
    ///     if key % 2 == 0 {
    ///         cursor.remove_current();
    ///     } else {
    ///         cursor.move_next();
    ///     }
    /// }
    /// assert_eq!(map.iter().collect::<Vec<(&u32, &u32)>>(), vec![(&1, &1), (&3, &3), (&5, &5)]);
    /// ```
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, U, C> {
        let node = self.tree.min(self.tree.root());
        CursorMut { map: self, node }
    }

    /// Returns an iterator over the map. The iterator will yield key-value pairs in sorted order.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// map.insert(2, 2);
    ///
    /// let mut iterator = map.iter();
    /// assert_eq!(iterator.next(), Some((&1, &1)));
    /// assert_eq!(iterator.next(), Some((&2, &2)));
    /// assert_eq!(iterator.next(), None);
    /// ```
    pub fn iter(&self) -> AvlMapIter<'_, T, U> {
        AvlMapIter {
            inner: traverse::Iter::new(&self.tree),
        }
    }

    /// Returns a mutable iterator over the map. The iterator will yield key-value pairs in sorted
    /// order.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// map.insert(2, 2);
    ///
    /// for (key, value) in &mut map {
    ///     *value += 1;
    /// }
    ///
    /// let mut iterator = map.iter_mut();
    /// assert_eq!(iterator.next(), Some((&1, &mut 2)));
    /// assert_eq!(iterator.next(), Some((&2, &mut 3)));
    /// assert_eq!(iterator.next(), None);
    /// ```
    pub fn iter_mut(&mut self) -> AvlMapIterMut<'_, T, U> {
        AvlMapIterMut {
            inner: traverse::IterMut::new(&mut self.tree),
        }
    }

    /// Returns an iterator that visits every node before its left subtree and its left subtree
    /// before its right subtree.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// for &key in &[2, 1, 3] {
    ///     map.insert(key, ());
    /// }
    /// assert_eq!(map.preorder().map(|(key, _)| *key).collect::<Vec<u32>>(), vec![2, 1, 3]);
    /// ```
    pub fn preorder(&self) -> AvlMapPreorder<'_, T, U> {
        AvlMapPreorder {
            inner: traverse::Preorder::new(&self.tree),
        }
    }

    /// Returns an iterator that visits the entries in sorted order using an explicit stack.
    pub fn inorder(&self) -> AvlMapInorder<'_, T, U> {
        AvlMapInorder {
            inner: traverse::Inorder::new(&self.tree),
        }
    }

    /// Returns an iterator that visits both subtrees of a node before the node itself.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// for &key in &[2, 1, 3] {
    ///     map.insert(key, ());
    /// }
    /// assert_eq!(map.postorder().map(|(key, _)| *key).collect::<Vec<u32>>(), vec![1, 3, 2]);
    /// ```
    pub fn postorder(&self) -> AvlMapPostorder<'_, T, U> {
        AvlMapPostorder {
            inner: traverse::Postorder::new(&self.tree),
        }
    }

    /// Writes the keys of the map to `writer` in a human-readable form selected by `mode`. The
    /// output is meant for debugging and its layout may change.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::{AvlMap, PrintMode};
    ///
    /// let mut map = AvlMap::new();
    /// for &key in &[2, 1, 3] {
    ///     map.insert(key, ());
    /// }
    ///
    /// let mut buffer = Vec::new();
    /// map.print(PrintMode::Postorder, &mut buffer).unwrap();
    /// assert_eq!(String::from_utf8(buffer).unwrap(), "1 3 2\n");
    /// ```
    pub fn print<W>(&self, mode: PrintMode, writer: &mut W) -> io::Result<()>
    where
        T: Display,
        W: Write,
    {
        traverse::print(&self.tree, mode, writer)
    }
}

/// A read-only position in an `AvlMap<T, U, C>`.
///
/// A cursor points either at an entry of the map or at the end position, one past the maximum
/// entry. Two cursors are equal if they point at the same entry of the same map; all end cursors
/// of a map are equal. The cursor borrows the map, so the map cannot be modified while it lives.
pub struct Cursor<'a, T, U, C = Natural<T>> {
    map: &'a AvlMap<T, U, C>,
    node: Option<Handle>,
}

impl<'a, T, U, C> Cursor<'a, T, U, C> {
    /// Returns the key at the cursor, or `None` at the end position.
    pub fn key(&self) -> Option<&'a T> {
        let map = self.map;
        let tree = &map.tree;
        self.node.map(|handle| &tree.entry(handle).key)
    }

    /// Returns the value at the cursor, or `None` at the end position.
    pub fn value(&self) -> Option<&'a U> {
        let map = self.map;
        let tree = &map.tree;
        self.node.map(|handle| &tree.entry(handle).value)
    }

    /// Returns the key-value pair at the cursor, or `None` at the end position.
    pub fn entry(&self) -> Option<(&'a T, &'a U)> {
        let map = self.map;
        let tree = &map.tree;
        self.node.map(|handle| {
            let Entry { key, value } = tree.entry(handle);
            (key, value)
        })
    }

    /// Returns `true` if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Moves the cursor to the next entry in sorted order. Moving past the maximum entry reaches
    /// the end position, where the cursor stays.
    pub fn move_next(&mut self) {
        let map = self.map;
        let tree = &map.tree;
        self.node = self.node.and_then(|handle| tree.succ(handle));
    }

    /// Moves the cursor to the previous entry in sorted order. Moving back from the end position
    /// reaches the maximum entry; moving back from the minimum entry reaches the end position.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlMap;
    ///
    /// let mut map = AvlMap::new();
    /// map.insert(1, 1);
    /// map.insert(2, 2);
    ///
    /// let mut cursor = map.cursor_end();
    /// cursor.move_prev();
    /// assert_eq!(cursor.key(), Some(&2));
    /// cursor.move_prev();
    /// cursor.move_prev();
    /// assert!(cursor.is_end());
    /// ```
    pub fn move_prev(&mut self) {
        let map = self.map;
        let tree = &map.tree;
        self.node = match self.node {
            Some(handle) => tree.pred(handle),
            None => tree.max(tree.root()),
        };
    }
}

impl<'a, T, U, C> Clone for Cursor<'a, T, U, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T, U, C> Copy for Cursor<'a, T, U, C> {}

impl<'a, T, U, C> PartialEq for Cursor<'a, T, U, C> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.map, other.map) && self.node == other.node
    }
}

impl<'a, T, U, C> Eq for Cursor<'a, T, U, C> {}

impl<'a, T, U, C> Debug for Cursor<'a, T, U, C>
where
    T: Debug,
    U: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.entry()).finish()
    }
}

/// A position in an `AvlMap<T, U, C>` that can modify the map.
///
/// Removing the entry at the cursor moves the cursor to the next entry. No other entry is
/// affected, so the cursor is the only position invalidated by the removal.
pub struct CursorMut<'a, T, U, C = Natural<T>> {
    map: &'a mut AvlMap<T, U, C>,
    node: Option<Handle>,
}

impl<'a, T, U, C> CursorMut<'a, T, U, C> {
    /// Returns the key at the cursor, or `None` at the end position.
    pub fn key(&self) -> Option<&T> {
        let tree = &self.map.tree;
        self.node.map(|handle| &tree.entry(handle).key)
    }

    /// Returns the value at the cursor, or `None` at the end position.
    pub fn value(&self) -> Option<&U> {
        let tree = &self.map.tree;
        self.node.map(|handle| &tree.entry(handle).value)
    }

    /// Returns a mutable reference to the value at the cursor, or `None` at the end position.
    pub fn value_mut(&mut self) -> Option<&mut U> {
        let tree = &mut self.map.tree;
        match self.node {
            Some(handle) => Some(&mut tree.entry_mut(handle).value),
            None => None,
        }
    }

    /// Returns `true` if the cursor is at the end position.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Moves the cursor to the next entry in sorted order. Moving past the maximum entry reaches
    /// the end position, where the cursor stays.
    pub fn move_next(&mut self) {
        let tree = &self.map.tree;
        self.node = self.node.and_then(|handle| tree.succ(handle));
    }

    /// Moves the cursor to the previous entry in sorted order. Moving back from the end position
    /// reaches the maximum entry.
    pub fn move_prev(&mut self) {
        let tree = &self.map.tree;
        self.node = match self.node {
            Some(handle) => tree.pred(handle),
            None => tree.max(tree.root()),
        };
    }

    /// Removes the entry at the cursor and moves the cursor to the next entry. Returns `None` and
    /// does nothing at the end position.
    pub fn remove_current(&mut self) -> Option<(T, U)> {
        let handle = self.node?;
        let tree = &mut self.map.tree;
        self.node = tree.succ(handle);
        Some(tree.remove(handle).into_pair())
    }
}

impl<T, U, C> IntoIterator for AvlMap<T, U, C> {
    type IntoIter = AvlMapIntoIter<T, U>;
    type Item = (T, U);

    fn into_iter(self) -> Self::IntoIter {
        Self::IntoIter {
            inner: traverse::IntoIter::new(self.tree),
        }
    }
}

impl<'a, T, U, C> IntoIterator for &'a AvlMap<T, U, C>
where
    T: 'a,
    U: 'a,
{
    type IntoIter = AvlMapIter<'a, T, U>;
    type Item = (&'a T, &'a U);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, U, C> IntoIterator for &'a mut AvlMap<T, U, C>
where
    T: 'a,
    U: 'a,
{
    type IntoIter = AvlMapIterMut<'a, T, U>;
    type Item = (&'a T, &'a mut U);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// An owning iterator for `AvlMap<T, U, C>`.
///
/// This iterator traverses the elements of the map in-order and yields owned entries.
pub struct AvlMapIntoIter<T, U> {
    inner: traverse::IntoIter<T, U>,
}

impl<T, U> Iterator for AvlMapIntoIter<T, U> {
    type Item = (T, U);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Entry::into_pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, U> DoubleEndedIterator for AvlMapIntoIter<T, U> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(Entry::into_pair)
    }
}

/// An iterator for `AvlMap<T, U, C>`.
///
/// This iterator traverses the elements of the map in-order by following successor links and
/// yields immutable references.
pub struct AvlMapIter<'a, T, U>
where
    T: 'a,
    U: 'a,
{
    inner: traverse::Iter<'a, T, U>,
}

impl<'a, T, U> Iterator for AvlMapIter<'a, T, U>
where
    T: 'a,
    U: 'a,
{
    type Item = (&'a T, &'a U);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| (&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T, U> DoubleEndedIterator for AvlMapIter<'a, T, U>
where
    T: 'a,
    U: 'a,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|entry| (&entry.key, &entry.value))
    }
}

impl<'a, T, U> ExactSizeIterator for AvlMapIter<'a, T, U>
where
    T: 'a,
    U: 'a,
{
}

/// A mutable iterator for `AvlMap<T, U, C>`.
///
/// This iterator traverses the elements of the map in-order and yields mutable references.
pub struct AvlMapIterMut<'a, T, U>
where
    T: 'a,
    U: 'a,
{
    inner: traverse::IterMut<'a, T, U>,
}

impl<'a, T, U> Iterator for AvlMapIterMut<'a, T, U>
where
    T: 'a,
    U: 'a,
{
    type Item = (&'a T, &'a mut U);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T, U> DoubleEndedIterator for AvlMapIterMut<'a, T, U>
where
    T: 'a,
    U: 'a,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

macro_rules! traversal_iter {
    ($(#[$attr:meta])* $name:ident, $inner:ident) => {
        $(#[$attr])*
        pub struct $name<'a, T, U>
        where
            T: 'a,
            U: 'a,
        {
            inner: traverse::$inner<'a, T, U>,
        }

        impl<'a, T, U> Iterator for $name<'a, T, U>
        where
            T: 'a,
            U: 'a,
        {
            type Item = (&'a T, &'a U);

            fn next(&mut self) -> Option<Self::Item> {
                self.inner.next().map(|entry| (&entry.key, &entry.value))
            }
        }
    };
}

traversal_iter!(
    /// A pre-order iterator for `AvlMap<T, U, C>`.
    AvlMapPreorder,
    Preorder
);
traversal_iter!(
    /// An in-order iterator for `AvlMap<T, U, C>` that walks the tree with an explicit stack.
    AvlMapInorder,
    Inorder
);
traversal_iter!(
    /// A post-order iterator for `AvlMap<T, U, C>`.
    AvlMapPostorder,
    Postorder
);

impl<T, U> Default for AvlMap<T, U>
where
    T: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, U, C> Clone for AvlMap<T, U, C>
where
    T: Clone,
    U: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        AvlMap {
            tree: self.tree.clone(),
            compare: self.compare.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.tree.clone_from(&source.tree);
        self.compare = source.compare.clone();
    }
}

impl<T, U, C> Debug for AvlMap<T, U, C>
where
    T: Debug,
    U: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T, U, C> PartialEq for AvlMap<T, U, C>
where
    T: PartialEq,
    U: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T, U, C> Eq for AvlMap<T, U, C>
where
    T: Eq,
    U: Eq,
{
}

impl<T, U, C> Extend<(T, U)> for AvlMap<T, U, C>
where
    C: Compare<T>,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (T, U)>,
    {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<T, U, C> FromIterator<(T, U)> for AvlMap<T, U, C>
where
    C: Compare<T> + Default,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
    {
        let mut map = AvlMap::with_comparator(C::default());
        map.extend(iter);
        map
    }
}

impl<'a, T, U, C, V> Index<&'a V> for AvlMap<T, U, C>
where
    C: Compare<V, T>,
    V: ?Sized,
{
    type Output = U;

    fn index(&self, key: &V) -> &Self::Output {
        self.get(key).expect("Error: key does not exist.")
    }
}

impl<'a, T, U, C, V> IndexMut<&'a V> for AvlMap<T, U, C>
where
    C: Compare<V, T>,
    V: ?Sized,
{
    fn index_mut(&mut self, key: &V) -> &mut Self::Output {
        self.get_mut(key).expect("Error: key does not exist.")
    }
}

impl<T, U, C> Serialize for AvlMap<T, U, C>
where
    T: Serialize,
    U: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct AvlMapVisitor<T, U, C> {
    marker: PhantomData<fn() -> AvlMap<T, U, C>>,
}

impl<'de, T, U, C> Visitor<'de> for AvlMapVisitor<T, U, C>
where
    T: Deserialize<'de>,
    U: Deserialize<'de>,
    C: Compare<T> + Default,
{
    type Value = AvlMap<T, U, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    // The first occurrence of a repeated key wins, matching `insert`.
    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = AvlMap::with_comparator(C::default());
        while let Some((key, value)) = access.next_entry()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, T, U, C> Deserialize<'de> for AvlMap<T, U, C>
where
    T: Deserialize<'de>,
    U: Deserialize<'de>,
    C: Compare<T> + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(AvlMapVisitor {
            marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::AvlMap;
    use crate::avl_tree::tree::tests::check_invariants;
    use crate::avl_tree::PrintMode;
    use compare::{natural, Compare};
    use serde_test::{assert_tokens, Token};

    #[test]
    fn test_len_empty() {
        let map: AvlMap<u32, u32> = AvlMap::new();
        assert_eq!(map.len(), 0);
        assert_eq!(map.height(), 0);
    }

    #[test]
    fn test_is_empty() {
        let map: AvlMap<u32, u32> = AvlMap::new();
        assert!(map.is_empty());
    }

    #[test]
    fn test_min_max_empty() {
        let map: AvlMap<u32, u32> = AvlMap::new();
        assert_eq!(map.min(), None);
        assert_eq!(map.max(), None);
    }

    #[test]
    fn test_insert() {
        let mut map = AvlMap::new();
        assert!(map.insert(1, 1));
        assert!(map.contains_key(&1));
        assert_eq!(map.get(&1), Some(&1));
    }

    #[test]
    fn test_insert_does_not_replace() {
        let mut map = AvlMap::new();
        assert!(map.insert(1, 1));
        assert!(!map.insert(1, 3));
        assert_eq!(map.get(&1), Some(&1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_get_or_insert_default() {
        let mut map: AvlMap<u32, String> = AvlMap::new();
        map.get_or_insert_default(3).push_str("three");
        assert_eq!(map.get(&3).map(String::as_str), Some("three"));
        assert_eq!(map.get_or_insert_default(3).as_str(), "three");
        assert_eq!(map.get_or_insert_default(4).as_str(), "");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut map = AvlMap::new();
        map.insert(1, 1);
        assert_eq!(map.remove(&1), Some((1, 1)));
        assert!(!map.contains_key(&1));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut map = AvlMap::new();
        for key in 0..10 {
            map.insert(key, key);
        }
        let before = map.clone();
        assert_eq!(map.remove(&42), None);
        assert_eq!(map, before);
        assert_eq!(map.preorder().collect::<Vec<_>>(), before.preorder().collect::<Vec<_>>());
    }

    #[test]
    fn test_min_max() {
        let mut map = AvlMap::new();
        map.insert(1, 1);
        map.insert(3, 3);
        map.insert(5, 5);

        assert_eq!(map.min(), Some(&1));
        assert_eq!(map.max(), Some(&5));
    }

    #[test]
    fn test_get_mut() {
        let mut map = AvlMap::new();
        map.insert(1, 1);
        {
            let value = map.get_mut(&1);
            *value.unwrap() = 3;
        }
        assert_eq!(map.get(&1), Some(&3));
    }

    #[test]
    fn test_index() {
        let mut map = AvlMap::with_comparator(natural::<str>().borrowing());
        map.insert(String::from("a"), 1);
        map["a"] += 1;
        assert_eq!(map["a"], 2);
    }

    #[test]
    #[should_panic]
    fn test_index_missing() {
        let map: AvlMap<u32, u32> = AvlMap::new();
        let _ = map[&1];
    }

    #[test]
    fn test_floor_ceil() {
        let mut map = AvlMap::new();
        map.insert(1, 1);
        map.insert(3, 3);
        map.insert(5, 5);

        assert_eq!(map.floor(&0), None);
        assert_eq!(map.floor(&2), Some(&1));
        assert_eq!(map.floor(&4), Some(&3));
        assert_eq!(map.floor(&6), Some(&5));

        assert_eq!(map.ceil(&0), Some(&1));
        assert_eq!(map.ceil(&2), Some(&3));
        assert_eq!(map.ceil(&4), Some(&5));
        assert_eq!(map.ceil(&6), None);
    }

    #[test]
    fn test_succ_pred() {
        let mut map = AvlMap::new();
        for &key in &[5, 3, 8, 1, 4, 7, 9] {
            map.insert(key, ());
        }
        let keys = map.iter().map(|(key, _)| *key).collect::<Vec<u32>>();
        for (index, key) in keys.iter().enumerate() {
            assert_eq!(map.succ(key), keys.get(index + 1));
            assert_eq!(map.pred(key), if index == 0 { None } else { keys.get(index - 1) });
        }
        assert_eq!(map.succ(&2), None);
        assert_eq!(map.pred(&2), None);
    }

    #[test]
    fn test_remove_two_children_scenario() {
        let mut map = AvlMap::new();
        for &key in &[5, 3, 8, 1, 4, 7, 9] {
            map.insert(key, key);
        }
        map.remove(&3);
        map.remove(&8);
        check_invariants(&map.tree, &map.compare);
        assert_eq!(
            map.iter().map(|(key, _)| *key).collect::<Vec<u32>>(),
            vec![1, 4, 5, 7, 9],
        );
    }

    #[test]
    fn test_comparator() {
        let mut map = AvlMap::with_comparator(natural().rev());
        for key in 0..10 {
            map.insert(key, key * 2);
        }
        check_invariants(&map.tree, &map.compare);
        assert_eq!(map.min(), Some(&9));
        assert_eq!(map.succ(&5), Some(&4));
        assert_eq!(map.get(&3), Some(&6));
    }

    #[test]
    fn test_cursor() {
        let mut map = AvlMap::new();
        for key in 1..4 {
            map.insert(key, key * 10);
        }

        let mut cursor = map.cursor_front();
        let begin = map.cursor_front();
        assert_eq!(cursor, begin);
        assert_eq!(cursor.entry(), Some((&1, &10)));

        cursor.move_next();
        assert_ne!(cursor, begin);
        assert_eq!(cursor, map.find(&2));

        cursor.move_next();
        cursor.move_next();
        assert!(cursor.is_end());
        assert_eq!(cursor, map.cursor_end());
        assert_eq!(cursor, map.find(&4));

        cursor.move_next();
        assert!(cursor.is_end());
        cursor.move_prev();
        assert_eq!(cursor, map.cursor_back());
    }

    #[test]
    fn test_cursor_different_maps() {
        let mut a = AvlMap::new();
        let mut b = AvlMap::new();
        a.insert(1, 1);
        b.insert(1, 1);
        assert_ne!(a.cursor_front(), b.cursor_front());
        assert_ne!(a.cursor_end(), b.cursor_end());
    }

    #[test]
    fn test_cursor_mut() {
        let mut map = AvlMap::new();
        for key in 0..10 {
            map.insert(key, key);
        }

        {
            let mut cursor = map.find_mut(&4);
            *cursor.value_mut().unwrap() = 40;
            cursor.move_prev();
            assert_eq!(cursor.remove_current(), Some((3, 3)));
            assert_eq!(cursor.key(), Some(&4));
            assert_eq!(cursor.value(), Some(&40));
        }
        check_invariants(&map.tree, &map.compare);

        {
            let mut cursor = map.find_mut(&9);
            assert_eq!(cursor.remove_current(), Some((9, 9)));
            assert!(cursor.is_end());
            assert_eq!(cursor.remove_current(), None);
        }
        assert_eq!(map.len(), 8);
    }

    #[test]
    fn test_cursor_mut_drain() {
        let mut map = AvlMap::new();
        for key in 0..100 {
            map.insert(key, ());
        }
        {
            let mut cursor = map.cursor_front_mut();
            let mut expected = 0;
            while let Some((key, _)) = cursor.remove_current() {
                assert_eq!(key, expected);
                expected += 1;
                check_invariants(&cursor.map.tree, &cursor.map.compare);
            }
        }
        assert!(map.is_empty());
    }

    #[test]
    fn test_clone() {
        let mut a = AvlMap::new();
        for key in 0..20 {
            a.insert(key, key);
        }
        let mut b = a.clone();
        a.remove(&0);
        b.insert(20, 20);
        assert_eq!(a.len(), 19);
        assert_eq!(b.len(), 21);
        assert_eq!(b.get(&0), Some(&0));
        assert_eq!(a.get(&20), None);

        b.clone_from(&a);
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_iter() {
        let map: AvlMap<u32, u32> = vec![(3, 1), (1, 2), (3, 3)].into_iter().collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&3), Some(&1));
    }

    #[test]
    fn test_debug() {
        let mut map = AvlMap::new();
        map.insert(2, "b");
        map.insert(1, "a");
        assert_eq!(format!("{:?}", map), r#"{1: "a", 2: "b"}"#);
    }

    #[test]
    fn test_print() {
        let mut map = AvlMap::new();
        for key in 1..4 {
            map.insert(key, ());
        }
        let mut buffer = Vec::new();
        map.print(PrintMode::Inorder, &mut buffer).unwrap();
        map.print(PrintMode::Preorder, &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "1 2 3\n2 1 3\n");
    }

    #[test]
    fn test_into_iter() {
        let mut map = AvlMap::new();
        map.insert(1, 2);
        map.insert(5, 6);
        map.insert(3, 4);

        assert_eq!(
            map.into_iter().collect::<Vec<(u32, u32)>>(),
            vec![(1, 2), (3, 4), (5, 6)],
        );
    }

    #[test]
    fn test_iter() {
        let mut map = AvlMap::new();
        map.insert(1, 2);
        map.insert(5, 6);
        map.insert(3, 4);

        assert_eq!(
            map.iter().collect::<Vec<(&u32, &u32)>>(),
            vec![(&1, &2), (&3, &4), (&5, &6)],
        );
        assert_eq!(
            map.iter().rev().collect::<Vec<(&u32, &u32)>>(),
            vec![(&5, &6), (&3, &4), (&1, &2)],
        );
        assert_eq!(map.inorder().collect::<Vec<_>>(), map.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_iter_mut() {
        let mut map = AvlMap::new();
        map.insert(1, 2);
        map.insert(5, 6);
        map.insert(3, 4);

        for (_, value) in &mut map {
            *value += 1;
        }

        assert_eq!(
            map.iter().collect::<Vec<(&u32, &u32)>>(),
            vec![(&1, &3), (&3, &5), (&5, &7)],
        );
    }

    #[test]
    fn test_serde_tokens() {
        let mut map = AvlMap::new();
        map.insert(2u32, 'b');
        map.insert(1u32, 'a');

        assert_tokens(
            &map,
            &[
                Token::Map { len: Some(2) },
                Token::U32(1),
                Token::Char('a'),
                Token::U32(2),
                Token::Char('b'),
                Token::MapEnd,
            ],
        );
    }
}
