use std::{alloc::Layout, marker::PhantomData, mem::ManuallyDrop, ptr, ptr::NonNull};

use log::trace;

use crate::alloc::RawAlloc;
use crate::error::ContigError;

/// Owned contiguous block described by three cursors.
///
/// `first` points at the start of the allocation, `last` one past the
/// last live element, `cap` one past the last allocated slot. Live
/// elements occupy `[first, last)`, slots in `[last, cap)` are allocated
/// but not constructed. All three cursors are null in the null state,
/// where no allocation exists.
///
/// All raw pointer arithmetic of the array lives here. Beyond debug
/// assertions nothing is bound checked, callers uphold the invariants.
///
/// Since `last` is only advanced after a slot holds a constructed
/// element, the buffer doubles as the rollback object for interrupted
/// bulk operations: whatever `[first, last)` covers is destroyed on drop,
/// whatever lies past it is released without being touched.
pub(crate) struct RawBuf<T, A: RawAlloc> {
    first: *mut T,
    last: *mut T,
    cap: *mut T,
    alloc: A,
    _owns: PhantomData<T>,
}

impl<T, A: RawAlloc> RawBuf<T, A> {
    pub fn new_in(alloc: A) -> Self {
        Self {
            first: ptr::null_mut(),
            last: ptr::null_mut(),
            cap: ptr::null_mut(),
            alloc,
            _owns: PhantomData,
        }
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn is_null(&self) -> bool {
        self.first.is_null()
    }

    pub fn len(&self) -> usize {
        if self.is_null() {
            return 0;
        }
        // This is safe since `first` and `last` lie within the same block.
        unsafe { self.last.offset_from(self.first) as usize }
    }

    pub fn capacity(&self) -> usize {
        if self.is_null() {
            return 0;
        }
        // This is safe since `first` and `cap` lie within the same block.
        unsafe { self.cap.offset_from(self.first) as usize }
    }

    pub fn is_full(&self) -> bool {
        self.last == self.cap
    }

    pub fn first_ptr(&self) -> *mut T {
        self.first
    }

    /// Pointer one past the last live element.
    pub fn tail(&self) -> *mut T {
        self.last
    }

    /// Pointer to slot `idx`.
    ///
    /// # Safety
    /// A block must exist and `idx` must not exceed its capacity.
    pub unsafe fn slot(&self, idx: usize) -> *mut T {
        debug_assert!(!self.is_null() && idx <= self.capacity());
        self.first.add(idx)
    }

    /// # Safety
    /// Slots `[last, last + n)` must hold constructed elements.
    pub unsafe fn advance(&mut self, n: usize) {
        self.last = self.last.add(n);
        debug_assert!(self.last <= self.cap);
    }

    /// # Safety
    /// At least `n` live elements must exist, and the retracted ones must
    /// already be moved out or destroyed by the caller.
    pub unsafe fn retract(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        self.last = self.last.sub(n);
    }

    /// Destroys all live elements, keeps the allocation.
    pub fn clear_live(&mut self) {
        if self.is_null() {
            return;
        }
        let len = self.len();
        // Retract before dropping so a panicking element Drop can't lead
        // to a double drop. At worst the remaining elements leak.
        self.last = self.first;
        // This is safe since `[first, first + len)` held live elements.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.first, len)) };
    }

    /// Allocates an untracked block of `n` slots with this buffer's
    /// allocator. The buffer cursors are not touched.
    pub fn allocate_block(&self, n: usize) -> Result<*mut T, ContigError> {
        assert!(
            std::mem::size_of::<T>() != 0,
            "zero-sized element types are not supported"
        );
        debug_assert!(n != 0);

        let layout = Layout::array::<T>(n).map_err(|_| ContigError::capacity_overflow(n))?;
        if layout.size() > self.alloc.max_size() {
            return Err(ContigError::capacity_overflow(n));
        }

        let block = self
            .alloc
            .allocate(layout)
            .map_err(|_| ContigError::alloc_failed(layout.size()))?;
        Ok(block.as_ptr() as *mut T)
    }

    /// Releases a block of `n` slots without touching its contents.
    ///
    /// # Safety
    /// `block` must come from `allocate_block(n)` on this buffer's
    /// allocator and must not be used afterwards.
    pub unsafe fn release_block(&self, block: *mut T, n: usize) {
        let layout = Layout::array::<T>(n).expect("Layout was valid at allocation");
        self.alloc
            .deallocate(NonNull::new_unchecked(block as *mut u8), layout);
    }

    /// Adopts `block` as the new storage, destroying the current live
    /// elements and releasing the current block first.
    ///
    /// # Safety
    /// `block` must come from `allocate_block(cap)` on this buffer's
    /// allocator and its first `len` slots must hold constructed elements.
    pub unsafe fn adopt_block(&mut self, block: *mut T, len: usize, cap: usize) {
        debug_assert!(len <= cap && cap != 0);

        self.clear_live();
        if !self.is_null() {
            self.release_block(self.first, self.capacity());
        }

        self.first = block;
        self.last = block.add(len);
        self.cap = block.add(cap);
    }

    /// Grows the block to `new_cap` slots. No-op if the capacity already
    /// suffices, growth never shrinks.
    pub fn grow_to(&mut self, new_cap: usize) -> Result<(), ContigError> {
        if new_cap <= self.capacity() {
            return Ok(());
        }
        self.relocate_to(new_cap)
    }

    /// Shrinks the block to exactly `new_cap` slots. No-op if the capacity
    /// is already that small. A shrink to zero returns to the null state.
    pub fn shrink_to(&mut self, new_cap: usize) -> Result<(), ContigError> {
        debug_assert!(new_cap >= self.len());

        if new_cap >= self.capacity() {
            return Ok(());
        }
        if new_cap == 0 {
            trace!(
                "releasing {} block of {} slots",
                std::any::type_name::<T>(),
                self.capacity()
            );
            // This is safe since there are no live elements left to destroy.
            unsafe { self.release_block(self.first, self.capacity()) };
            self.first = ptr::null_mut();
            self.last = ptr::null_mut();
            self.cap = ptr::null_mut();
            return Ok(());
        }
        self.relocate_to(new_cap)
    }

    /// Reallocation protocol: allocate the new block, relocate the live
    /// elements, release the old block, adopt the new one.
    ///
    /// Elements are relocated with a bytewise copy. That is sound for
    /// every Rust type, moves are bitwise and the originals are never
    /// touched again.
    ///
    /// Allocation happens before anything is disturbed, so on failure the
    /// buffer is left exactly as it was.
    fn relocate_to(&mut self, new_cap: usize) -> Result<(), ContigError> {
        let len = self.len();
        debug_assert!(new_cap >= len && new_cap != 0);

        let block = self.allocate_block(new_cap)?;
        trace!(
            "relocating {} block, {} -> {} slots",
            std::any::type_name::<T>(),
            self.capacity(),
            new_cap
        );

        unsafe {
            if !self.is_null() {
                // This is safe since the blocks don't overlap and the new
                // one has room for all live elements.
                ptr::copy_nonoverlapping(self.first, block, len);
                self.release_block(self.first, self.capacity());
            }
            self.first = block;
            self.last = block.add(len);
            self.cap = block.add(new_cap);
        }
        Ok(())
    }

    /// Disassembles the buffer without destroying anything. Ownership of
    /// the block and the allocator moves to the caller.
    pub fn into_raw_parts(self) -> (*mut T, *mut T, *mut T, A) {
        let this = ManuallyDrop::new(self);
        // This is safe since `this` is never dropped, so the allocator is
        // read out exactly once.
        let alloc = unsafe { ptr::read(&this.alloc) };
        (this.first, this.last, this.cap, alloc)
    }
}

impl<T, A: RawAlloc> Drop for RawBuf<T, A> {
    fn drop(&mut self) {
        if self.is_null() {
            return;
        }
        let cap = self.capacity();
        self.clear_live();
        // This is safe since the block came from this allocator and all
        // live elements were destroyed above.
        unsafe { self.release_block(self.first, cap) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Global;

    #[test]
    fn starts_null() {
        let buf = RawBuf::<u32, Global>::new_in(Global);
        assert!(buf.is_null());
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 0);
        assert!(buf.is_full());
    }

    #[test]
    fn grow_preserves_live_elements() {
        let mut buf = RawBuf::<u32, Global>::new_in(Global);
        buf.grow_to(4).unwrap();
        assert_eq!(buf.capacity(), 4);

        unsafe {
            for i in 0..4u32 {
                ptr::write(buf.slot(i as usize), i * 10);
                buf.advance(1);
            }
        }
        buf.grow_to(16).unwrap();
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.len(), 4);

        for i in 0..4usize {
            assert_eq!(unsafe { *buf.slot(i) }, i as u32 * 10);
        }
    }

    #[test]
    fn grow_never_shrinks() {
        let mut buf = RawBuf::<u32, Global>::new_in(Global);
        buf.grow_to(8).unwrap();
        buf.grow_to(2).unwrap();
        assert_eq!(buf.capacity(), 8);
    }

    #[test]
    fn shrink_to_zero_returns_to_null_state() {
        let mut buf = RawBuf::<u32, Global>::new_in(Global);
        buf.grow_to(8).unwrap();
        buf.shrink_to(0).unwrap();
        assert!(buf.is_null());
        assert_eq!(buf.capacity(), 0);
    }
}
