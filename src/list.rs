use std::{alloc::Layout, fmt, iter::FusedIterator, marker::PhantomData, ptr, ptr::NonNull};

use crate::alloc::{Global, RawAlloc};
use crate::error::ContigError;
use crate::util::ScopeGuard;

struct Node<T> {
    next: *mut Node<T>,
    value: T,
}

/// Minimal singly-linked list over the same allocator capability as
/// [`DynamicArray`](crate::array::DynamicArray).
///
/// One node per element, allocated and released individually, so pushes
/// never relocate existing elements. Kept deliberately small: front/back
/// access, FIFO removal, iteration. No cursors, no splicing.
pub struct List<T, A: RawAlloc = Global> {
    head: *mut Node<T>,
    tail: *mut Node<T>,
    len: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

impl<T> List<T, Global> {
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T, A: RawAlloc> List<T, A> {
    pub fn new_in(alloc: A) -> Self {
        Self {
            head: ptr::null_mut(),
            tail: ptr::null_mut(),
            len: 0,
            alloc,
            _owns: PhantomData,
        }
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front(&self) -> Result<&T, ContigError> {
        if self.head.is_null() {
            return Err(ContigError::out_of_bounds(0, 0));
        }
        // This is safe since `head` points at a live node.
        Ok(unsafe { &(*self.head).value })
    }

    pub fn front_mut(&mut self) -> Result<&mut T, ContigError> {
        if self.head.is_null() {
            return Err(ContigError::out_of_bounds(0, 0));
        }
        // This is safe since `head` points at a live node and we hold
        // exclusive access.
        Ok(unsafe { &mut (*self.head).value })
    }

    pub fn back(&self) -> Result<&T, ContigError> {
        if self.tail.is_null() {
            return Err(ContigError::out_of_bounds(0, 0));
        }
        // This is safe since `tail` points at a live node.
        Ok(unsafe { &(*self.tail).value })
    }

    /// Appends an element.
    pub fn push_back(&mut self, value: T) {
        self.try_push_back(value).expect("Failed to grow List")
    }

    pub fn try_push_back(&mut self, value: T) -> Result<(), ContigError> {
        self.try_push_back_with(|| value)
    }

    /// Appends the element produced by `build`.
    ///
    /// The node is allocated first. If `build` panics the node is given
    /// back to the allocator and the list is unchanged.
    pub fn try_push_back_with(&mut self, build: impl FnOnce() -> T) -> Result<(), ContigError> {
        let node = self.allocate_node()?;
        {
            let alloc = &self.alloc;
            let mut guard = ScopeGuard::new(|| {
                // This is safe since the node holds no constructed value yet.
                unsafe {
                    alloc.deallocate(
                        NonNull::new_unchecked(node as *mut u8),
                        Layout::new::<Node<T>>(),
                    )
                };
            });
            // This is safe since the node slot is allocated and
            // unconstructed. `build` runs before the write.
            unsafe {
                ptr::write(
                    node,
                    Node {
                        next: ptr::null_mut(),
                        value: build(),
                    },
                )
            };
            guard.dismiss();
        }

        // This is safe since the node is fully constructed.
        unsafe {
            if self.tail.is_null() {
                self.head = node;
            } else {
                (*self.tail).next = node;
            }
        }
        self.tail = node;
        self.len += 1;
        Ok(())
    }

    /// Prepends an element.
    pub fn push_front(&mut self, value: T) {
        self.try_push_front(value).expect("Failed to grow List")
    }

    pub fn try_push_front(&mut self, value: T) -> Result<(), ContigError> {
        let node = self.allocate_node()?;
        // This is safe since the node slot is allocated and unconstructed,
        // and the value move can't fail.
        unsafe {
            ptr::write(
                node,
                Node {
                    next: self.head,
                    value,
                },
            )
        };
        self.head = node;
        if self.tail.is_null() {
            self.tail = node;
        }
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the first element, None if empty.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.head.is_null() {
            return None;
        }
        // This is safe since `head` points at a live node. The value is
        // read out exactly once before the node is released.
        unsafe {
            let node = self.head;
            self.head = (*node).next;
            if self.head.is_null() {
                self.tail = ptr::null_mut();
            }
            self.len -= 1;

            let value = ptr::read(&(*node).value);
            self.release_node(node);
            Some(value)
        }
    }

    /// Destroys every element and releases every node.
    pub fn clear(&mut self) {
        let mut node = self.head;
        self.head = ptr::null_mut();
        self.tail = ptr::null_mut();
        self.len = 0;

        while !node.is_null() {
            // This is safe since the walked chain is unlinked above, each
            // node holds a live value and is visited exactly once.
            unsafe {
                let next = (*node).next;
                ptr::drop_in_place(&mut (*node).value);
                self.release_node(node);
                node = next;
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            node: self.head,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    fn allocate_node(&self) -> Result<*mut Node<T>, ContigError> {
        let layout = Layout::new::<Node<T>>();
        let raw = self
            .alloc
            .allocate(layout)
            .map_err(|_| ContigError::alloc_failed(layout.size()))?;
        Ok(raw.as_ptr() as *mut Node<T>)
    }

    /// # Safety
    /// `node` must come from `allocate_node` on this list, its value must
    /// already be destroyed or moved out, and it must not be used
    /// afterwards.
    unsafe fn release_node(&self, node: *mut Node<T>) {
        self.alloc
            .deallocate(NonNull::new_unchecked(node as *mut u8), Layout::new::<Node<T>>());
    }
}

impl<T, A: RawAlloc> Drop for List<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for List<T, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, A: RawAlloc> fmt::Debug for List<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, A: RawAlloc> Extend<T> for List<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push_back(item);
        }
    }
}

impl<T> FromIterator<T> for List<T, Global> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<'a, T, A: RawAlloc> IntoIterator for &'a List<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

// This is safe since the list exclusively owns its nodes and allocator,
// sharing rules reduce to theirs.
unsafe impl<T: Send, A: RawAlloc + Send> Send for List<T, A> {}
unsafe impl<T: Sync, A: RawAlloc + Sync> Sync for List<T, A> {}

/// Borrowing iterator over a [`List`], front to back.
pub struct Iter<'a, T> {
    node: *const Node<T>,
    remaining: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.node.is_null() {
            return None;
        }
        // This is safe since the node is live for the borrowed lifetime.
        unsafe {
            let value = &(*self.node).value;
            self.node = (*self.node).next;
            self.remaining -= 1;
            Some(value)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}
