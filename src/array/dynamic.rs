use std::{
    cell::Cell,
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    mem, ops, ptr, slice,
};

use super::buf::RawBuf;
use super::into_iter::IntoIter;
use crate::alloc::{Global, RawAlloc};
use crate::error::ContigError;
use crate::util::ScopeGuard;

/// Bytewise size past which growth switches from doubling to 1.5x,
/// bounding waste for large arrays.
const DOUBLING_BYTE_LIMIT: usize = 4096;

/// Growable contiguous sequence with allocator parameterized storage.
///
/// The array owns a single heap block and tracks it with three cursors,
/// see [`RawBuf`]. Append is amortized O(1): capacity 0 grows to 1, small
/// blocks double, blocks past 4KB grow by 1.5x. Capacity never shrinks on
/// its own, only [`shrink_to_fit`](Self::shrink_to_fit) gives memory back.
///
/// A fresh array, and one moved out of with [`std::mem::take`], holds no
/// allocation at all (the null state, `capacity() == 0`). The first
/// capacity demanding operation allocates.
///
/// Fallible operations come in two flavors: `try_*` variants surface
/// [`ContigError`], the plain variants treat allocation failure as fatal.
/// Either way a failed operation leaves the array exactly as it was.
///
/// Zero-sized element types are not supported and panic on the first
/// allocation.
pub struct DynamicArray<T, A: RawAlloc = Global> {
    buf: RawBuf<T, A>,
}

impl<T> DynamicArray<T, Global> {
    /// Empty array in the null state, allocates nothing.
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<T, A: RawAlloc> DynamicArray<T, A> {
    pub fn new_in(alloc: A) -> Self {
        Self {
            buf: RawBuf::new_in(alloc),
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::try_with_capacity_in(capacity, alloc).expect("Failed to allocate DynamicArray")
    }

    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, ContigError> {
        let mut array = Self::new_in(alloc);
        if capacity != 0 {
            array.buf.grow_to(capacity)?;
        }
        Ok(array)
    }

    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Total allocated slots, live or not yet constructed.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if no allocation exists. Distinguishable from an
    /// allocated-but-empty array only by `capacity()`.
    pub fn is_null(&self) -> bool {
        self.buf.is_null()
    }

    /// True if the next push has to grow.
    pub fn is_full(&self) -> bool {
        self.buf.is_full()
    }

    /// Largest length the allocator can back for this element type.
    pub fn max_len(&self) -> usize {
        self.buf.allocator().max_size() / mem::size_of::<T>().max(1)
    }

    pub fn as_slice(&self) -> &[T] {
        if self.buf.is_null() {
            return &[];
        }
        // This is safe since `[first, first + len)` holds live elements.
        unsafe { slice::from_raw_parts(self.buf.first_ptr(), self.buf.len()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.buf.is_null() {
            return &mut [];
        }
        // This is safe since `[first, first + len)` holds live elements
        // and we hold exclusive access.
        unsafe { slice::from_raw_parts_mut(self.buf.first_ptr(), self.buf.len()) }
    }

    /// Null in the null state.
    pub fn as_ptr(&self) -> *const T {
        self.buf.first_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.first_ptr()
    }

    /// Checked element access.
    pub fn at(&self, index: usize) -> Result<&T, ContigError> {
        let len = self.len();
        self.as_slice()
            .get(index)
            .ok_or(ContigError::out_of_bounds(index, len))
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, ContigError> {
        let len = self.len();
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(ContigError::out_of_bounds(index, len))
    }

    pub fn front(&self) -> Result<&T, ContigError> {
        self.at(0)
    }

    pub fn front_mut(&mut self) -> Result<&mut T, ContigError> {
        self.at_mut(0)
    }

    pub fn back(&self) -> Result<&T, ContigError> {
        match self.len() {
            0 => Err(ContigError::out_of_bounds(0, 0)),
            len => self.at(len - 1),
        }
    }

    pub fn back_mut(&mut self) -> Result<&mut T, ContigError> {
        match self.len() {
            0 => Err(ContigError::out_of_bounds(0, 0)),
            len => self.at_mut(len - 1),
        }
    }

    /// Appends an element, growing if full.
    pub fn push_back(&mut self, item: T) {
        self.try_push_back(item).expect("Failed to grow DynamicArray")
    }

    pub fn try_push_back(&mut self, item: T) -> Result<(), ContigError> {
        self.try_reserve(1)?;
        // This is safe since the reserve left a free slot past `last`.
        unsafe {
            ptr::write(self.buf.tail(), item);
            self.buf.advance(1);
        }
        Ok(())
    }

    /// Removes and returns the last element, None if empty.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // This is safe since a live element exists and is read out exactly
        // once, after the cursor no longer covers it.
        unsafe {
            self.buf.retract(1);
            Some(ptr::read(self.buf.tail()))
        }
    }

    /// Inserts at `index`, shifting the tail one slot up. `index == len()`
    /// appends.
    pub fn insert_at(&mut self, index: usize, item: T) -> Result<(), ContigError> {
        let len = self.len();
        if index > len {
            return Err(ContigError::out_of_bounds(index, len));
        }
        self.try_reserve(1)?;
        // This is safe since the reserve left a free slot, the shift stays
        // inside the block, and the gap is filled before `last` advances.
        unsafe {
            let at = self.buf.slot(index);
            ptr::copy(at, at.add(1), len - index);
            ptr::write(at, item);
            self.buf.advance(1);
        }
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting the tail one
    /// slot down.
    pub fn erase_at(&mut self, index: usize) -> Result<T, ContigError> {
        let len = self.len();
        if index >= len {
            return Err(ContigError::out_of_bounds(index, len));
        }
        // This is safe since the element is read out exactly once and the
        // shift closes the gap before the cursor retracts.
        unsafe {
            let at = self.buf.slot(index);
            let item = ptr::read(at);
            ptr::copy(at.add(1), at, len - index - 1);
            self.buf.retract(1);
            Ok(item)
        }
    }

    /// Destroys all live elements, retains the allocation.
    pub fn clear(&mut self) {
        self.buf.clear_live();
    }

    /// Ensures room for `additional` more elements, growing by the usual
    /// policy. No-op if capacity already suffices.
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional)
            .expect("Failed to grow DynamicArray")
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), ContigError> {
        let target = self
            .len()
            .checked_add(additional)
            .ok_or(ContigError::capacity_overflow(usize::MAX))?;
        if target <= self.capacity() {
            return Ok(());
        }
        if target > self.max_len() {
            return Err(ContigError::capacity_overflow(target));
        }
        let new_cap = target.max(self.next_capacity()).min(self.max_len());
        self.buf.grow_to(new_cap)
    }

    /// Ensures capacity of at least `target` slots, sized exactly. No-op
    /// if capacity already suffices, never shrinks.
    pub fn reserve_exact(&mut self, target: usize) {
        self.try_reserve_exact(target)
            .expect("Failed to grow DynamicArray")
    }

    pub fn try_reserve_exact(&mut self, target: usize) -> Result<(), ContigError> {
        if target <= self.capacity() {
            return Ok(());
        }
        if target > self.max_len() {
            return Err(ContigError::capacity_overflow(target));
        }
        self.buf.grow_to(target)
    }

    /// Reallocates to a block exactly `len()` long. No-op if already
    /// exact, a shrink of an empty array returns to the null state.
    pub fn shrink_to_fit(&mut self) {
        let len = self.len();
        self.buf
            .shrink_to(len)
            .expect("Failed to shrink DynamicArray")
    }

    /// Exchanges contents in O(1), no element is touched.
    pub fn swap_with(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Next capacity by the growth policy.
    fn next_capacity(&self) -> usize {
        let cap = self.capacity();
        if cap == 0 {
            1
        } else if cap.saturating_mul(mem::size_of::<T>()) <= DOUBLING_BYTE_LIMIT {
            cap * 2
        } else {
            cap.saturating_add(cap / 2)
        }
    }
}

impl<T: Clone, A: RawAlloc> DynamicArray<T, A> {
    /// Appends clones of all elements of `src`.
    ///
    /// If a clone panics, the clones made so far are destroyed and the
    /// length is unchanged.
    pub fn extend_from_slice(&mut self, src: &[T]) {
        self.try_extend_from_slice(src)
            .expect("Failed to grow DynamicArray")
    }

    pub fn try_extend_from_slice(&mut self, src: &[T]) -> Result<(), ContigError> {
        self.try_reserve(src.len())?;

        let tail = self.buf.tail();
        let constructed = Cell::new(0usize);
        {
            // Rolls back the clones made so far if one of them panics. The
            // cursor hasn't advanced yet, so the buffer won't double-drop.
            let mut guard = ScopeGuard::new(|| {
                // This is safe since exactly `constructed` clones were
                // written past the live range.
                unsafe {
                    ptr::drop_in_place(ptr::slice_from_raw_parts_mut(tail, constructed.get()))
                };
            });
            for (i, item) in src.iter().enumerate() {
                // This is safe since the reserve left `src.len()` free slots.
                unsafe { ptr::write(tail.add(i), item.clone()) };
                constructed.set(i + 1);
            }
            guard.dismiss();
        }
        // This is safe since all `src.len()` slots now hold clones.
        unsafe { self.buf.advance(src.len()) };
        Ok(())
    }

    /// Replaces all contents with clones of `src`.
    ///
    /// Reuses the current block when the new contents fit its capacity,
    /// otherwise the replacement is built in a fresh block before the old
    /// one is released, so a panicking clone leaves the array unchanged.
    pub fn assign_from_slice(&mut self, src: &[T]) {
        self.try_assign_from_slice(src)
            .expect("Failed to grow DynamicArray")
    }

    pub fn try_assign_from_slice(&mut self, src: &[T]) -> Result<(), ContigError> {
        self.try_assign_with(src.len(), |i| src[i].clone())
    }

    /// Replaces all contents with `count` clones of `value`.
    pub fn assign_fill(&mut self, count: usize, value: T) {
        self.try_assign_fill(count, value)
            .expect("Failed to grow DynamicArray")
    }

    pub fn try_assign_fill(&mut self, count: usize, value: T) -> Result<(), ContigError> {
        self.try_assign_with(count, |_| value.clone())
    }
}

impl<T, A: RawAlloc> DynamicArray<T, A> {
    /// Shared implementation of the assign family, `fill(i)` builds the
    /// element for slot `i`.
    fn try_assign_with(
        &mut self,
        count: usize,
        mut fill: impl FnMut(usize) -> T,
    ) -> Result<(), ContigError> {
        if count <= self.capacity() {
            // Destroy and reconstruct in place. The cursor tracks progress,
            // so a panicking `fill` leaves a valid shorter array.
            self.clear();
            for i in 0..count {
                // This is safe since `count <= capacity` and slots are
                // constructed in order.
                unsafe {
                    ptr::write(self.buf.slot(i), fill(i));
                    self.buf.advance(1);
                }
            }
            return Ok(());
        }

        // Build the replacement in a fresh block first. The old block is
        // not touched until the new one is fully constructed, so both an
        // allocation failure and a panicking `fill` leave the array
        // exactly as it was.
        let block = self.buf.allocate_block(count)?;
        let constructed = Cell::new(0usize);
        {
            let buf = &self.buf;
            let mut guard = ScopeGuard::new(|| {
                // This is safe since exactly `constructed` elements were
                // written into the fresh block.
                unsafe {
                    ptr::drop_in_place(ptr::slice_from_raw_parts_mut(block, constructed.get()));
                    buf.release_block(block, count);
                }
            });
            for i in 0..count {
                // This is safe since the fresh block has `count` slots.
                unsafe { ptr::write(block.add(i), fill(i)) };
                constructed.set(i + 1);
            }
            guard.dismiss();
        }
        // This is safe since the block came from our allocator and all of
        // its `count` slots hold constructed elements.
        unsafe { self.buf.adopt_block(block, count, count) };
        Ok(())
    }
}

impl<T> Default for DynamicArray<T, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, A: RawAlloc + Clone> Clone for DynamicArray<T, A> {
    /// Independent copy with `capacity() == len()`.
    fn clone(&self) -> Self {
        let mut array = Self::with_capacity_in(self.len(), self.buf.allocator().clone());
        array.extend_from_slice(self.as_slice());
        array
    }
}

impl<T: fmt::Debug, A: RawAlloc> fmt::Debug for DynamicArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T, A: RawAlloc> ops::Deref for DynamicArray<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: RawAlloc> ops::DerefMut for DynamicArray<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: RawAlloc> ops::Index<usize> for DynamicArray<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T, A: RawAlloc> ops::IndexMut<usize> for DynamicArray<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<T: PartialEq, A: RawAlloc> PartialEq for DynamicArray<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: RawAlloc> Eq for DynamicArray<T, A> {}

impl<T: PartialOrd, A: RawAlloc> PartialOrd for DynamicArray<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, A: RawAlloc> Ord for DynamicArray<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, A: RawAlloc> Hash for DynamicArray<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<T, A: RawAlloc> Extend<T> for DynamicArray<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (low, _) = iter.size_hint();
        self.reserve(low);
        for item in iter {
            self.push_back(item);
        }
    }
}

impl<T> FromIterator<T> for DynamicArray<T, Global> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T, const N: usize> From<[T; N]> for DynamicArray<T, Global> {
    fn from(items: [T; N]) -> Self {
        let mut array = Self::with_capacity(N);
        for item in items {
            array.push_back(item);
        }
        array
    }
}

impl<T: Clone> From<&[T]> for DynamicArray<T, Global> {
    fn from(src: &[T]) -> Self {
        let mut array = Self::with_capacity(src.len());
        array.extend_from_slice(src);
        array
    }
}

impl<T, A: RawAlloc> IntoIterator for DynamicArray<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter::new(self.buf.into_raw_parts())
    }
}

impl<'a, T, A: RawAlloc> IntoIterator for &'a DynamicArray<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.as_slice().iter()
    }
}

impl<'a, T, A: RawAlloc> IntoIterator for &'a mut DynamicArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> slice::IterMut<'a, T> {
        self.as_mut_slice().iter_mut()
    }
}

// This is safe since the array exclusively owns its elements and
// allocator, sharing rules reduce to theirs.
unsafe impl<T: Send, A: RawAlloc + Send> Send for DynamicArray<T, A> {}
unsafe impl<T: Sync, A: RawAlloc + Sync> Sync for DynamicArray<T, A> {}
