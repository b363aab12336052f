//! Chunked slab allocator that hands out stable handles.

use std::mem;
use std::ops::{Index, IndexMut};
use std::vec::Vec;

/// A stable reference to an object allocated in a `TypedArena<T>`.
///
/// A handle stays valid until the object it refers to is freed. Freed slots are recycled, so a
/// stale handle may later refer to a different object.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Handle {
    chunk_index: usize,
    block_index: usize,
}

enum Block<T> {
    Occupied(T),
    Vacant(Option<Handle>),
}

/// An allocator for a single type of object.
///
/// Objects are stored in fixed-size chunks that are never reallocated once created, and vacant
/// blocks are threaded into a free list so that freed slots are reused before a new chunk is
/// pushed. The arena is backed by plain `Vec`s and uses no unsafe code. Dropping or clearing the
/// arena releases every object without walking any links between them.
///
/// # Examples
///
/// ```
/// use avl_collections::arena::TypedArena;
///
/// let mut arena = TypedArena::new(1024);
///
/// let x = arena.allocate(1);
/// assert_eq!(arena[x], 1);
///
/// arena[x] += 1;
/// assert_eq!(arena[x], 2);
///
/// assert_eq!(arena.free(x), 2);
/// assert!(arena.is_empty());
/// ```
pub struct TypedArena<T> {
    head: Option<Handle>,
    chunks: Vec<Vec<Block<T>>>,
    chunk_size: usize,
    len: usize,
    capacity: usize,
}

impl<T> TypedArena<T> {
    fn is_valid_handle(&self, handle: Handle) -> bool {
        handle.chunk_index < self.chunks.len()
            && handle.block_index < self.chunks[handle.chunk_index].len()
    }

    /// Constructs a new, empty `TypedArena<T>` with a specific number of objects per chunk.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::TypedArena;
    ///
    /// // holds at most 1024 u32's per chunk
    /// let arena: TypedArena<u32> = TypedArena::new(1024);
    /// ```
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "Error: chunk size must be non-zero.");
        TypedArena {
            head: None,
            chunks: Vec::new(),
            chunk_size,
            len: 0,
            capacity: 0,
        }
    }

    /// Allocates an object in the arena and returns its handle.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new(1024);
    /// let x = arena.allocate(0);
    /// assert_eq!(arena.get(x), Some(&0));
    /// ```
    pub fn allocate(&mut self, value: T) -> Handle {
        if self.len == self.capacity {
            self.chunks.push(Vec::with_capacity(self.chunk_size));
            self.capacity += self.chunk_size;
        }
        self.len += 1;

        match self.head.take() {
            None => {
                let chunk_count = self.chunks.len();
                let last_chunk = &mut self.chunks[chunk_count - 1];
                last_chunk.push(Block::Occupied(value));
                Handle {
                    chunk_index: chunk_count - 1,
                    block_index: last_chunk.len() - 1,
                }
            },
            Some(handle) => {
                let vacant_block = mem::replace(
                    &mut self.chunks[handle.chunk_index][handle.block_index],
                    Block::Occupied(value),
                );

                match vacant_block {
                    Block::Vacant(next) => {
                        self.head = next;
                        handle
                    },
                    Block::Occupied(_) => panic!("Error: free list points to an occupied block."),
                }
            },
        }
    }

    /// Deallocates an object in the arena and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the handle corresponds to an invalid or vacant block.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new(1024);
    /// let x = arena.allocate(0);
    /// assert_eq!(arena.free(x), 0);
    /// ```
    pub fn free(&mut self, handle: Handle) -> T {
        if !self.is_valid_handle(handle) {
            panic!("Error: attempting to free invalid block.");
        }
        let block = &mut self.chunks[handle.chunk_index][handle.block_index];
        if let Block::Vacant(_) = block {
            panic!("Error: attempting to free vacant block.");
        }
        match mem::replace(block, Block::Vacant(self.head.take())) {
            Block::Occupied(value) => {
                self.len -= 1;
                self.head = Some(handle);
                value
            },
            Block::Vacant(_) => unreachable!(),
        }
    }

    /// Returns an immutable reference to an object in the arena. Returns `None` if the handle
    /// does not correspond to a live object.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        if !self.is_valid_handle(handle) {
            return None;
        }
        match self.chunks[handle.chunk_index][handle.block_index] {
            Block::Occupied(ref value) => Some(value),
            Block::Vacant(_) => None,
        }
    }

    /// Returns a mutable reference to an object in the arena. Returns `None` if the handle does
    /// not correspond to a live object.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !self.is_valid_handle(handle) {
            return None;
        }
        match self.chunks[handle.chunk_index][handle.block_index] {
            Block::Occupied(ref mut value) => Some(value),
            Block::Vacant(_) => None,
        }
    }

    /// Returns mutable references to the objects behind `handles`, in the same order. Extra
    /// space is proportional to the number of handles, not to the size of the arena.
    ///
    /// # Panics
    ///
    /// Panics if a handle is invalid, vacant, or appears more than once.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new(2);
    /// let x = arena.allocate(0);
    /// let y = arena.allocate(1);
    /// let z = arena.allocate(2);
    /// for value in arena.get_all_mut(&[z, x, y]) {
    ///     *value += 10;
    /// }
    /// assert_eq!((arena[x], arena[y], arena[z]), (10, 11, 12));
    /// ```
    pub fn get_all_mut(&mut self, handles: &[Handle]) -> Vec<&mut T> {
        let mut order: Vec<(Handle, usize)> = handles.iter().cloned().zip(0..).collect();
        order.sort_unstable_by_key(|&(handle, _)| (handle.chunk_index, handle.block_index));
        let mut order = order.into_iter().peekable();

        let mut slots: Vec<Option<&mut T>> = handles.iter().map(|_| None).collect();
        for (chunk_index, chunk) in self.chunks.iter_mut().enumerate() {
            if order.peek().is_none() {
                break;
            }

            // `rest` holds the blocks after the last one handed out, starting at `offset`
            let mut rest: &mut [Block<T>] = chunk.as_mut_slice();
            let mut offset = 0;
            while let Some(&(handle, position)) = order.peek() {
                if handle.chunk_index != chunk_index {
                    break;
                }
                order.next();
                if handle.block_index < offset || handle.block_index - offset >= rest.len() {
                    panic!("Error: handle is invalid, vacant, or repeated.");
                }
                let (_, tail) = mem::take(&mut rest).split_at_mut(handle.block_index - offset);
                let (block, tail) = match tail.split_first_mut() {
                    Some(split) => split,
                    None => unreachable!(),
                };
                rest = tail;
                offset = handle.block_index + 1;
                match block {
                    Block::Occupied(value) => slots[position] = Some(value),
                    Block::Vacant(_) => panic!("Error: handle is invalid, vacant, or repeated."),
                }
            }
        }
        if order.next().is_some() {
            panic!("Error: handle is invalid, vacant, or repeated.");
        }

        slots.into_iter().map(|slot| slot.expect("Error: handle was not resolved.")).collect()
    }

    /// Returns the number of live objects in the arena.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the arena holds no live objects.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of objects stored per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Drops every object in the arena and releases all chunks.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new(2);
    /// let x = arena.allocate(0);
    /// arena.allocate(1);
    /// arena.allocate(2);
    /// arena.clear();
    /// assert!(arena.is_empty());
    /// assert_eq!(arena.get(x), None);
    /// ```
    pub fn clear(&mut self) {
        self.head = None;
        self.chunks.clear();
        self.len = 0;
        self.capacity = 0;
    }
}

impl<T> Index<Handle> for TypedArena<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &Self::Output {
        self.get(handle).expect("Error: handle out of bounds.")
    }
}

impl<T> IndexMut<Handle> for TypedArena<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut Self::Output {
        self.get_mut(handle).expect("Error: handle out of bounds.")
    }
}
