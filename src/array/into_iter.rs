use std::{alloc::Layout, fmt, iter::FusedIterator, marker::PhantomData, ptr, ptr::NonNull, slice};

use crate::alloc::RawAlloc;

/// Owning iterator over a [`DynamicArray`](super::DynamicArray).
///
/// Takes over the block wholesale. Elements are read out of their slots as
/// the iteration advances, whatever is left unread when the iterator drops
/// is destroyed in place before the block is released.
pub struct IntoIter<T, A: RawAlloc> {
    head: *mut T,
    tail: *mut T,
    first: *mut T,
    capacity: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

impl<T, A: RawAlloc> IntoIter<T, A> {
    pub(crate) fn new(parts: (*mut T, *mut T, *mut T, A)) -> Self {
        let (first, last, cap, alloc) = parts;
        let capacity = if first.is_null() {
            0
        } else {
            // This is safe since `first` and `cap` lie within the same block.
            unsafe { cap.offset_from(first) as usize }
        };
        Self {
            head: first,
            tail: last,
            first,
            capacity,
            alloc,
            _owns: PhantomData,
        }
    }

    /// Remaining elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        if self.head.is_null() {
            return &[];
        }
        // This is safe since `[head, tail)` holds the unread elements.
        unsafe { slice::from_raw_parts(self.head, self.len()) }
    }
}

impl<T, A: RawAlloc> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        // This is safe since an unread element exists at `head` and the
        // cursor moves past it before anything else can read it.
        unsafe {
            let item = ptr::read(self.head);
            self.head = self.head.add(1);
            Some(item)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl<T, A: RawAlloc> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.head == self.tail {
            return None;
        }
        // This is safe since an unread element exists just before `tail`.
        unsafe {
            self.tail = self.tail.sub(1);
            Some(ptr::read(self.tail))
        }
    }
}

impl<T, A: RawAlloc> ExactSizeIterator for IntoIter<T, A> {
    fn len(&self) -> usize {
        if self.head.is_null() {
            return 0;
        }
        // This is safe since `head` and `tail` lie within the same block.
        unsafe { self.tail.offset_from(self.head) as usize }
    }
}

impl<T, A: RawAlloc> FusedIterator for IntoIter<T, A> {}

impl<T: fmt::Debug, A: RawAlloc> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T, A: RawAlloc> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        if self.first.is_null() {
            return;
        }
        // This is safe since `[head, tail)` holds the unread elements and
        // the block spans `capacity` slots of this allocator.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.head, self.len()));
            let layout = Layout::array::<T>(self.capacity).expect("Layout was valid at allocation");
            self.alloc
                .deallocate(NonNull::new_unchecked(self.first as *mut u8), layout);
        }
    }
}

// This is safe since the iterator exclusively owns its elements and
// allocator, sharing rules reduce to theirs.
unsafe impl<T: Send, A: RawAlloc + Send> Send for IntoIter<T, A> {}
unsafe impl<T: Sync, A: RawAlloc + Sync> Sync for IntoIter<T, A> {}

#[cfg(test)]
mod tests {
    use crate::array::DynamicArray;
    use std::cell::Cell;

    #[test]
    fn yields_in_order() {
        let array = DynamicArray::from([1, 2, 3]);
        let collected: Vec<_> = array.into_iter().collect();
        assert_eq!(collected, vec![1, 2, 3]);
    }

    #[test]
    fn null_array_yields_nothing() {
        let array = DynamicArray::<u32>::new();
        assert_eq!(array.into_iter().next(), None);
    }

    #[test]
    fn both_ends() {
        let array = DynamicArray::from([1, 2, 3, 4]);
        let mut iter = array.into_iter();
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.next_back(), Some(4));
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.as_slice(), &[2, 3]);
        assert_eq!(iter.next(), Some(2));
        assert_eq!(iter.next_back(), Some(3));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn drops_unread_elements() {
        struct Tally<'a>(&'a Cell<usize>);
        impl Drop for Tally<'_> {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Cell::new(0);
        {
            let mut array = DynamicArray::new();
            for _ in 0..5 {
                array.push_back(Tally(&drops));
            }
            let mut iter = array.into_iter();
            drop(iter.next());
            assert_eq!(drops.get(), 1);
        }
        assert_eq!(drops.get(), 5);
    }
}
