use crate::avl_tree::map::{AvlMap, AvlMapIntoIter, AvlMapIter};
use crate::avl_tree::traverse::PrintMode;
use compare::{Compare, Natural};
use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::fmt::{self, Debug, Display};
use std::io::{self, Write};
use std::iter::FromIterator;
use std::marker::PhantomData;

/// An ordered set implemented using an avl tree.
///
/// An avl tree is a self-balancing binary search tree that maintains the invariant that the
/// heights of two child subtrees of any node differ by at most one.
///
/// # Examples
/// ```
/// use avl_collections::avl_tree::AvlSet;
///
/// let mut set = AvlSet::new();
/// set.insert(0);
/// set.insert(3);
///
/// assert_eq!(set.len(), 2);
///
/// assert_eq!(set.min(), Some(&0));
/// assert_eq!(set.ceil(&2), Some(&3));
/// assert_eq!(set.succ(&0), Some(&3));
///
/// assert_eq!(set.remove(&0), Some(0));
/// assert_eq!(set.remove(&1), None);
/// ```
pub struct AvlSet<T, C = Natural<T>> {
    map: AvlMap<T, (), C>,
}

impl<T> AvlSet<T>
where
    T: Ord,
{
    /// Constructs a new, empty `AvlSet<T>` ordered by the natural order of `T`.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let set: AvlSet<u32> = AvlSet::new();
    /// ```
    pub fn new() -> Self {
        AvlSet {
            map: AvlMap::new(),
        }
    }

    /// Constructs a new, empty `AvlSet<T>` that allocates `chunk_size` nodes at a time.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        AvlSet {
            map: AvlMap::with_chunk_size(chunk_size),
        }
    }
}

impl<T, C> AvlSet<T, C> {
    /// Constructs a new, empty `AvlSet<T, C>` ordered by `compare`.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    /// use compare::{natural, Compare};
    ///
    /// let mut set = AvlSet::with_comparator(natural().rev());
    /// set.insert(1);
    /// set.insert(2);
    /// assert_eq!(set.iter().collect::<Vec<&u32>>(), vec![&2, &1]);
    /// ```
    pub fn with_comparator(compare: C) -> Self {
        AvlSet {
            map: AvlMap::with_comparator(compare),
        }
    }

    /// Constructs a new, empty `AvlSet<T, C>` ordered by `compare` that allocates `chunk_size`
    /// nodes at a time.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn with_comparator_and_chunk_size(compare: C, chunk_size: usize) -> Self {
        AvlSet {
            map: AvlMap::with_comparator_and_chunk_size(compare, chunk_size),
        }
    }

    /// Inserts a key into the set. Returns `true` if the key was absent. If an equal key already
    /// exists, the set is left unchanged and `false` is returned.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// assert!(set.insert(1));
    /// assert!(set.contains(&1));
    /// assert!(!set.insert(1));
    /// ```
    pub fn insert(&mut self, key: T) -> bool
    where
        C: Compare<T>,
    {
        self.map.insert(key, ())
    }

    /// Removes a key from the set. If the key exists in the set, it will return the associated
    /// key. Otherwise it will return `None`.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// assert_eq!(set.remove(&1), Some(1));
    /// assert_eq!(set.remove(&1), None);
    /// ```
    pub fn remove<V>(&mut self, key: &V) -> Option<T>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.map.remove(key).map(|pair| pair.0)
    }

    /// Checks if a key exists in the set.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// assert!(!set.contains(&0));
    /// assert!(set.contains(&1));
    /// ```
    pub fn contains<V>(&self, key: &V) -> bool
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Returns the number of elements in the set.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set is empty.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let set: AvlSet<u32> = AvlSet::new();
    /// assert!(set.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of levels in the underlying tree. An empty set has height zero.
    pub fn height(&self) -> usize {
        self.map.height()
    }

    /// Clears the set, removing all values.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// set.insert(2);
    /// set.clear();
    /// assert_eq!(set.is_empty(), true);
    /// ```
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns a key in the set that is less than or equal to a particular key. Returns `None` if
    /// such a key does not exist.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// assert_eq!(set.floor(&0), None);
    /// assert_eq!(set.floor(&2), Some(&1));
    /// ```
    pub fn floor<V>(&self, key: &V) -> Option<&T>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.map.floor(key)
    }

    /// Returns a key in the set that is greater than or equal to a particular key. Returns `None`
    /// if such a key does not exist.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// assert_eq!(set.ceil(&0), Some(&1));
    /// assert_eq!(set.ceil(&2), None);
    /// ```
    pub fn ceil<V>(&self, key: &V) -> Option<&T>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.map.ceil(key)
    }

    /// Returns the smallest key greater than `key`. Returns `None` if `key` is not in the set or
    /// is its maximum.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// set.insert(3);
    /// assert_eq!(set.succ(&1), Some(&3));
    /// assert_eq!(set.succ(&3), None);
    /// ```
    pub fn succ<V>(&self, key: &V) -> Option<&T>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.map.succ(key)
    }

    /// Returns the largest key less than `key`. Returns `None` if `key` is not in the set or is
    /// its minimum.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// set.insert(3);
    /// assert_eq!(set.pred(&3), Some(&1));
    /// assert_eq!(set.pred(&2), None);
    /// ```
    pub fn pred<V>(&self, key: &V) -> Option<&T>
    where
        C: Compare<V, T>,
        V: ?Sized,
    {
        self.map.pred(key)
    }

    /// Returns the minimum key of the set. Returns `None` if the set is empty.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// set.insert(3);
    /// assert_eq!(set.min(), Some(&1));
    /// ```
    pub fn min(&self) -> Option<&T> {
        self.map.min()
    }

    /// Returns the maximum key of the set. Returns `None` if the set is empty.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// set.insert(3);
    /// assert_eq!(set.max(), Some(&3));
    /// ```
    pub fn max(&self) -> Option<&T> {
        self.map.max()
    }

    /// Returns an iterator over the set. The iterator will yield keys using in-order traversal.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::AvlSet;
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// set.insert(3);
    ///
    /// let mut iterator = set.iter();
    /// assert_eq!(iterator.next(), Some(&1));
    /// assert_eq!(iterator.next(), Some(&3));
    /// assert_eq!(iterator.next(), None);
    /// ```
    pub fn iter(&self) -> AvlSetIter<'_, T> {
        AvlSetIter {
            map_iter: self.map.iter(),
        }
    }

    /// Returns an iterator that yields each key before the keys of its left subtree, and those
    /// before the keys of its right subtree.
    pub fn preorder(&self) -> impl Iterator<Item = &T> + '_ {
        self.map.preorder().map(|pair| pair.0)
    }

    /// Returns an iterator that yields the keys in sorted order using an explicit stack.
    pub fn inorder(&self) -> impl Iterator<Item = &T> + '_ {
        self.map.inorder().map(|pair| pair.0)
    }

    /// Returns an iterator that yields the keys of both subtrees of a node before its own key.
    pub fn postorder(&self) -> impl Iterator<Item = &T> + '_ {
        self.map.postorder().map(|pair| pair.0)
    }

    /// Writes the keys of the set to `writer` in a human-readable form selected by `mode`.
    ///
    /// # Examples
    /// ```
    /// use avl_collections::avl_tree::{AvlSet, PrintMode};
    ///
    /// let mut set = AvlSet::new();
    /// set.insert(1);
    /// set.insert(2);
    ///
    /// let mut buffer = Vec::new();
    /// set.print(PrintMode::Tree, &mut buffer).unwrap();
    /// assert_eq!(
    ///     String::from_utf8(buffer).unwrap(),
    ///     "`--(1)\n      |--(2)\n      `--(nll)\n",
    /// );
    /// ```
    pub fn print<W>(&self, mode: PrintMode, writer: &mut W) -> io::Result<()>
    where
        T: Display,
        W: Write,
    {
        self.map.print(mode, writer)
    }
}

impl<T, C> IntoIterator for AvlSet<T, C> {
    type Item = T;
    type IntoIter = AvlSetIntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        Self::IntoIter {
            map_iter: self.map.into_iter(),
        }
    }
}

impl<'a, T, C> IntoIterator for &'a AvlSet<T, C>
where
    T: 'a,
{
    type Item = &'a T;
    type IntoIter = AvlSetIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An owning iterator for `AvlSet<T, C>`.
///
/// This iterator traverses the elements of the set in-order and yields owned keys.
pub struct AvlSetIntoIter<T> {
    map_iter: AvlMapIntoIter<T, ()>,
}

impl<T> Iterator for AvlSetIntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.map_iter.next().map(|pair| pair.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.map_iter.size_hint()
    }
}

impl<T> DoubleEndedIterator for AvlSetIntoIter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.map_iter.next_back().map(|pair| pair.0)
    }
}

/// An iterator for `AvlSet<T, C>`.
///
/// This iterator traverses the elements of the set in-order and yields immutable references.
pub struct AvlSetIter<'a, T>
where
    T: 'a,
{
    map_iter: AvlMapIter<'a, T, ()>,
}

impl<'a, T> Iterator for AvlSetIter<'a, T>
where
    T: 'a,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.map_iter.next().map(|pair| pair.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.map_iter.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for AvlSetIter<'a, T>
where
    T: 'a,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.map_iter.next_back().map(|pair| pair.0)
    }
}

impl<'a, T> ExactSizeIterator for AvlSetIter<'a, T> where T: 'a {}

impl<T> Default for AvlSet<T>
where
    T: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> Clone for AvlSet<T, C>
where
    T: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        AvlSet {
            map: self.map.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.map.clone_from(&source.map);
    }
}

impl<T, C> Debug for AvlSet<T, C>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, C> PartialEq for AvlSet<T, C>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<T, C> Eq for AvlSet<T, C> where T: Eq {}

impl<T, C> Extend<T> for AvlSet<T, C>
where
    C: Compare<T>,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<T, C> FromIterator<T> for AvlSet<T, C>
where
    C: Compare<T> + Default,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut set = AvlSet::with_comparator(C::default());
        set.extend(iter);
        set
    }
}

impl<T, C> Serialize for AvlSet<T, C>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for key in self {
            seq.serialize_element(key)?;
        }
        seq.end()
    }
}

struct AvlSetVisitor<T, C> {
    marker: PhantomData<fn() -> AvlSet<T, C>>,
}

impl<'de, T, C> Visitor<'de> for AvlSetVisitor<T, C>
where
    T: Deserialize<'de>,
    C: Compare<T> + Default,
{
    type Value = AvlSet<T, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut set = AvlSet::with_comparator(C::default());
        while let Some(key) = access.next_element()? {
            set.insert(key);
        }
        Ok(set)
    }
}

impl<'de, T, C> Deserialize<'de> for AvlSet<T, C>
where
    T: Deserialize<'de>,
    C: Compare<T> + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(AvlSetVisitor {
            marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::AvlSet;
    use crate::avl_tree::PrintMode;
    use compare::{natural, Compare};
    use serde_test::{assert_tokens, Token};

    #[test]
    fn test_len_empty() {
        let set: AvlSet<u32> = AvlSet::new();
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_is_empty() {
        let set: AvlSet<u32> = AvlSet::new();
        assert!(set.is_empty());
    }

    #[test]
    fn test_min_max_empty() {
        let set: AvlSet<u32> = AvlSet::new();
        assert_eq!(set.min(), None);
        assert_eq!(set.max(), None);
    }

    #[test]
    fn test_insert() {
        let mut set = AvlSet::new();
        assert!(set.insert(1));
        assert!(set.contains(&1));
    }

    #[test]
    fn test_insert_duplicate() {
        let mut set = AvlSet::new();
        assert!(set.insert(1));
        assert!(!set.insert(1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut set = AvlSet::new();
        set.insert(1);
        assert_eq!(set.remove(&1), Some(1));
        assert!(!set.contains(&1));
    }

    #[test]
    fn test_remove_empty() {
        let mut set: AvlSet<u32> = AvlSet::new();
        assert_eq!(set.remove(&1), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_min_max() {
        let mut set = AvlSet::new();
        set.insert(1);
        set.insert(3);
        set.insert(5);

        assert_eq!(set.min(), Some(&1));
        assert_eq!(set.max(), Some(&5));
    }

    #[test]
    fn test_floor_ceil() {
        let mut set = AvlSet::new();
        set.insert(1);
        set.insert(3);
        set.insert(5);

        assert_eq!(set.floor(&0), None);
        assert_eq!(set.floor(&2), Some(&1));
        assert_eq!(set.floor(&4), Some(&3));
        assert_eq!(set.floor(&6), Some(&5));

        assert_eq!(set.ceil(&0), Some(&1));
        assert_eq!(set.ceil(&2), Some(&3));
        assert_eq!(set.ceil(&4), Some(&5));
        assert_eq!(set.ceil(&6), None);
    }

    #[test]
    fn test_insert_remove_scenario() {
        let mut set = AvlSet::new();
        for key in 1..8 {
            set.insert(key);
        }
        assert_eq!(set.height(), 3);
        assert_eq!(set.preorder().cloned().collect::<Vec<u32>>(), vec![4, 2, 1, 3, 6, 5, 7]);

        for key in &[4, 2] {
            assert_eq!(set.remove(key), Some(*key));
        }
        assert_eq!(set.iter().cloned().collect::<Vec<u32>>(), vec![1, 3, 5, 6, 7]);
        assert_eq!(set.pred(&5), Some(&3));
        assert_eq!(set.succ(&7), None);
    }

    #[test]
    fn test_str_lookup() {
        let mut set = AvlSet::with_comparator(natural::<str>().borrowing());
        set.insert(String::from("b"));
        set.insert(String::from("a"));
        assert!(set.contains("a"));
        assert_eq!(set.ceil("aa").map(String::as_str), Some("b"));
        assert_eq!(set.remove("b"), Some(String::from("b")));
    }

    #[test]
    fn test_comparator() {
        let mut set = AvlSet::with_comparator(natural().rev());
        set.extend(vec![3, 1, 2]);
        assert_eq!(set.iter().cloned().collect::<Vec<u32>>(), vec![3, 2, 1]);
        assert_eq!(set.floor(&0), Some(&1));
        assert_eq!(set.succ(&3), Some(&2));
    }

    #[test]
    fn test_clone_independent() {
        let mut a: AvlSet<u32> = (0..10).collect();
        let b = a.clone();
        a.insert(10);
        a.remove(&0);
        assert_eq!(b.len(), 10);
        assert!(b.contains(&0));
        assert!(!b.contains(&10));
        assert_ne!(a, b);

        let mut c = AvlSet::new();
        c.insert(42);
        c.clone_from(&a);
        assert_eq!(a, c);
        assert_eq!(a.preorder().collect::<Vec<_>>(), c.preorder().collect::<Vec<_>>());
    }

    #[test]
    fn test_print() {
        let mut set = AvlSet::new();
        for key in 1..4 {
            set.insert(key);
        }
        let mut buffer = Vec::new();
        set.print(PrintMode::Postorder, &mut buffer).unwrap();
        set.print(PrintMode::Tree, &mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "1 3 2\n`--(2)\n      |--(3)\n      `--(1)\n",
        );
    }

    #[test]
    fn test_debug() {
        let set: AvlSet<u32> = vec![2, 1].into_iter().collect();
        assert_eq!(format!("{:?}", set), "{1, 2}");
    }

    #[test]
    fn test_into_iter() {
        let mut set = AvlSet::new();
        set.insert(1);
        set.insert(5);
        set.insert(3);

        assert_eq!(set.into_iter().collect::<Vec<u32>>(), vec![1, 3, 5]);
    }

    #[test]
    fn test_iter() {
        let mut set = AvlSet::new();
        set.insert(1);
        set.insert(5);
        set.insert(3);

        assert_eq!(set.iter().collect::<Vec<&u32>>(), vec![&1, &3, &5]);
        assert_eq!(set.iter().rev().collect::<Vec<&u32>>(), vec![&5, &3, &1]);
        assert_eq!(set.iter().len(), 3);
    }

    #[test]
    fn test_serde_tokens() {
        let set: AvlSet<u32> = vec![3, 1, 2].into_iter().collect();
        assert_tokens(
            &set,
            &[
                Token::Seq { len: Some(3) },
                Token::U32(1),
                Token::U32(2),
                Token::U32(3),
                Token::SeqEnd,
            ],
        );
    }
}
