use alloc::boxed::Box;
use alloc::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

extern crate alloc;

/// A node in the doubly linked list.
///
/// Contains a value and pointers to the previous and next entries.
/// This structure is not meant to be used directly by users of the `List`.
pub struct Entry<T> {
    /// The value stored in this entry. Uses MaybeUninit to allow for sigil nodes.
    val: mem::MaybeUninit<T>,
    /// Pointer to the previous entry in the list.
    prev: *mut Entry<T>,
    /// Pointer to the next entry in the list.
    next: *mut Entry<T>,
}

impl<T> Entry<T> {
    fn new(val: T) -> Self {
        Entry {
            val: mem::MaybeUninit::new(val),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Creates a new sigil (sentinel) entry without initializing the value.
    ///
    /// Sigil entries are used as head and tail markers in the list.
    fn new_sigil() -> Self {
        Entry {
            val: mem::MaybeUninit::uninit(),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// # Safety
    ///
    /// The value must be initialized, i.e. this is not a sigil node.
    pub unsafe fn get_value(&self) -> &T {
        // SAFETY: guaranteed by the caller
        unsafe { self.val.assume_init_ref() }
    }

    /// # Safety
    ///
    /// The value must be initialized, i.e. this is not a sigil node.
    pub unsafe fn get_value_mut(&mut self) -> &mut T {
        // SAFETY: guaranteed by the caller
        unsafe { self.val.assume_init_mut() }
    }

    /// Consumes a detached node and returns its value.
    ///
    /// # Safety
    ///
    /// The value must be initialized, i.e. this is not a sigil node.
    pub unsafe fn into_value(self: Box<Self>) -> T {
        // SAFETY: guaranteed by the caller
        unsafe { self.val.assume_init_read() }
    }
}

/// An unbounded doubly linked list with O(1) in-place reordering.
///
/// The front of the list (next to the head sentinel) is the most recently
/// attached node, the back (next to the tail sentinel) the oldest. The list
/// does not enforce a capacity; bounding is the owner's job.
///
/// Nodes are handed out as raw pointers so an index can point straight at
/// them. A pointer stays valid until the node is removed or the list dropped.
pub struct List<T> {
    /// Current number of items in the list.
    len: usize,
    /// Pointer to the head sentinel node.
    head: *mut Entry<T>,
    /// Pointer to the tail sentinel node.
    tail: *mut Entry<T>,
}

impl<T> List<T> {
    pub fn new() -> List<T> {
        let head = Box::into_raw(Box::new(Entry::new_sigil()));
        let tail = Box::into_raw(Box::new(Entry::new_sigil()));

        let list = List { len: 0, head, tail };

        // SAFETY: head and tail are newly allocated and valid pointers
        unsafe {
            (*list.head).next = list.tail;
            (*list.tail).prev = list.head;
        }

        list
    }

    /// Returns the current number of items in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pointer to the front (most recently attached) node.
    pub fn first(&self) -> Option<NonNull<Entry<T>>> {
        // SAFETY: head is valid for the lifetime of the list
        let next = unsafe { (*self.head).next };
        if next == self.tail {
            None
        } else {
            NonNull::new(next)
        }
    }

    /// Pointer to the back (least recently attached) node.
    pub fn last(&self) -> Option<NonNull<Entry<T>>> {
        // SAFETY: tail is valid for the lifetime of the list
        let prev = unsafe { (*self.tail).prev };
        if prev == self.head {
            None
        } else {
            NonNull::new(prev)
        }
    }

    /// Removes the last (least recently attached) item from the list.
    pub fn remove_last(&mut self) -> Option<Box<Entry<T>>> {
        let last = self.last()?;
        // SAFETY: `last` is a live, non-sigil node of this list
        unsafe { self.remove(last.as_ptr()) }
    }

    /// Detaches a node from the list and returns it as a Box.
    ///
    /// # Safety
    ///
    /// `node` must be a valid pointer to a node in this list (not null, not
    /// freed, and actually part of this list).
    pub unsafe fn remove(&mut self, node: *mut Entry<T>) -> Option<Box<Entry<T>>> {
        if self.is_empty() || node.is_null() || node == self.head || node == self.tail {
            return None;
        }

        // SAFETY: Caller guarantees node is valid and part of this list
        unsafe {
            self.detach(node);
        }
        self.len -= 1;
        // SAFETY: node was allocated through Box::into_raw in `add` and is now detached
        Some(unsafe { Box::from_raw(node) })
    }

    /// # Safety
    ///
    /// `node` must be a valid pointer to a node in this list.
    unsafe fn detach(&mut self, node: *mut Entry<T>) {
        // SAFETY: The caller guarantees that node is a valid entry in the list,
        // which means its prev and next pointers are also valid entries.
        unsafe {
            (*(*node).prev).next = (*node).next;
            (*(*node).next).prev = (*node).prev;
        }
    }

    /// Attaches a node after the head sentinel node.
    ///
    /// # Safety
    ///
    /// `node` must be valid and not currently linked into the list.
    unsafe fn attach(&mut self, node: *mut Entry<T>) {
        // SAFETY: head is a valid pointer initialized in `new`,
        // and the caller guarantees that node is a valid entry not already in the list
        unsafe {
            (*node).next = (*self.head).next;
            (*node).prev = self.head;
            (*self.head).next = node;
            (*(*node).next).prev = node;
        }
    }

    /// Moves a node to the front of the list (after the head sentinel).
    ///
    /// # Safety
    ///
    /// `node` must point to a valid entry in the list.
    pub unsafe fn move_to_front(&mut self, node: *mut Entry<T>) {
        if node.is_null() || node == self.head || node == self.tail {
            return;
        }

        // SAFETY: head is valid; node is a live entry per the caller
        unsafe {
            if (*self.head).next == node {
                return;
            }
            self.detach(node);
            self.attach(node);
        }
    }

    /// Adds a value to the front of the list and returns its node.
    pub fn add(&mut self, v: T) -> NonNull<Entry<T>> {
        let node = NonNull::from(Box::leak(Box::new(Entry::new(v))));
        // SAFETY: node is a newly allocated entry that is not part of any list yet
        unsafe { self.attach(node.as_ptr()) };
        self.len += 1;
        node
    }

    /// Iterates node pointers from the front (newest) to the back (oldest).
    ///
    /// The iterator is double ended; `.rev()` walks back to front.
    pub fn nodes(&self) -> Nodes<'_, T> {
        // SAFETY: sentinels are valid for the lifetime of the list
        let (front, back) = unsafe { ((*self.head).next, (*self.tail).prev) };
        Nodes {
            front,
            back,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    /// Clears the list, dropping every value.
    pub fn clear(&mut self) {
        while let Some(node) = self.remove_last() {
            // SAFETY: nodes handed out by `remove_last` are never sigils
            drop(unsafe { node.into_value() });
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        List::new()
    }
}

impl<T> Drop for List<T> {
    fn drop(&mut self) {
        self.clear();

        // SAFETY: head and tail were allocated in `new` and are freed exactly once here.
        unsafe {
            if !self.head.is_null() {
                let _ = Box::from_raw(self.head);
                self.head = ptr::null_mut();
            }
            if !self.tail.is_null() {
                let _ = Box::from_raw(self.tail);
                self.tail = ptr::null_mut();
            }
        }
    }
}

impl<T> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List").field("length", &self.len).finish()
    }
}

/// Double-ended iterator over the node pointers of a [`List`].
pub struct Nodes<'a, T> {
    front: *mut Entry<T>,
    back: *mut Entry<T>,
    remaining: usize,
    _marker: PhantomData<&'a List<T>>,
}

impl<T> Iterator for Nodes<'_, T> {
    type Item = NonNull<Entry<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = NonNull::new(self.front)?;
        // SAFETY: `remaining > 0` means `front` is a live, non-sigil node
        self.front = unsafe { (*self.front).next };
        self.remaining -= 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Nodes<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = NonNull::new(self.back)?;
        // SAFETY: `remaining > 0` means `back` is a live, non-sigil node
        self.back = unsafe { (*self.back).prev };
        self.remaining -= 1;
        Some(node)
    }
}

impl<T> ExactSizeIterator for Nodes<'_, T> {}

impl<T> fmt::Debug for Nodes<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nodes")
            .field("remaining", &self.remaining)
            .finish()
    }
}
