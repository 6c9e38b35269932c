use std::{
    alloc::{self, Layout},
    fmt::Display,
    ptr::NonNull,
};

/// Failure of [`RawAlloc::allocate`].
///
/// Carries no payload, the allocator either produced a block or it didn't.
/// Containers translate it into their own error type with the requested
/// size attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError;

impl Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory allocation failed.")
    }
}

impl std::error::Error for AllocError {}

/// Raw memory capability the containers are parameterized over.
///
/// Responsibilities are allocation and deallocation only. Element
/// construction and destruction are `ptr::write`/`ptr::drop_in_place` on
/// the container side, an allocator never observes element values.
///
/// Contract:
/// - `allocate` may fail and must hand out a block valid for `layout`.
/// - `deallocate` must not fail.
/// - Calls are non-reentrant, an implementation must not call back into
///   the container that invoked it.
pub trait RawAlloc {
    /// Allocates a block for `layout`.
    ///
    /// `layout` is never zero sized.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block.
    ///
    /// # Safety
    /// `ptr` must have been produced by `allocate` on the same allocator
    /// with the same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Upper bound in bytes on a single allocation.
    fn max_size(&self) -> usize {
        isize::MAX as usize
    }
}

impl<A: RawAlloc + ?Sized> RawAlloc for &A {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }

    fn max_size(&self) -> usize {
        (**self).max_size()
    }
}

/// Stateless allocator delegating to the global allocator.
///
/// Zero sized, so holding it by value inside a container costs nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

impl RawAlloc for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0);
        // This is safe since the layout is not zero sized.
        NonNull::new(unsafe { alloc::alloc(layout) }).ok_or(AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // Constraints on ptr and layout are delegated to the caller.
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_slices(n: usize, start: u8) -> Vec<(NonNull<u8>, Layout)> {
        let mut slices = Vec::new();
        let mut sum = start;

        // Allocate and write data to slices
        for i in 1..=n {
            let layout = Layout::from_size_align(i, 1).unwrap();
            let ptr = Global.allocate(layout).unwrap();
            for offset in 0..i {
                // This is safe since the block is i bytes long.
                unsafe { ptr.as_ptr().add(offset).write(sum) };
                sum = sum.wrapping_add(1);
            }
            slices.push((ptr, layout));
        }

        slices
    }

    fn validate_slices(slices: &[(NonNull<u8>, Layout)], start: u8) {
        let mut sum = start;
        for (ptr, layout) in slices {
            for offset in 0..layout.size() {
                // This is safe since the block is still allocated.
                assert_eq!(unsafe { ptr.as_ptr().add(offset).read() }, sum);
                sum = sum.wrapping_add(1);
            }
        }
    }

    #[test]
    fn allocate_write_deallocate() {
        let slices = add_slices(100, 7);
        validate_slices(&slices, 7);
        for (ptr, layout) in slices {
            unsafe { Global.deallocate(ptr, layout) };
        }
    }

    #[test]
    fn by_reference() {
        let alloc = &Global;
        let layout = Layout::array::<u64>(8).unwrap();
        let ptr = alloc.allocate(layout).unwrap();
        unsafe { alloc.deallocate(ptr, layout) };
        assert_eq!(alloc.max_size(), isize::MAX as usize);
    }
}
