//! # Goal
//! The main goal of this library is to provide growable containers whose
//! memory source is a type parameter instead of a hardwired global, on
//! stable Rust.
//!
//! Primary attribute of the library is predictability: every operation
//! states what it allocates, what it costs, and what state it leaves
//! behind when it fails. A failed operation never loses elements and
//! never leaks.
//!
//! Secondary attribute is a transparent data model. The array is three
//! cursors into one block, nothing else, so reasoning about it from the
//! outside stays simple.
//!
//! # Features
//! - Contiguous storage, through [`array::DynamicArray`].
//!      - Responsible for: amortized O(1) append, O(1) indexing, explicit
//!        capacity control.
//! - Linked storage, through [`list::List`].
//!      - Responsible for: stable element addresses, O(1) FIFO ends.
//! - Memory sourcing, through the [`alloc::RawAlloc`] trait.
//!      - Responsible for: where blocks come from, how large they may be.
//! - Cleanup sequencing, through [`util::ScopeGuard`].
//!      - Responsible for: rollback of half-finished multi-step
//!        operations.
//!
//! # Architecture
//! There are a few pieces that interact with one another:
//! - RawAlloc - the capability containers draw memory through. Hands out
//!   and takes back raw blocks, never sees element values.
//! - RawBuf - the pointer triple (start, one-past-live, one-past-block)
//!   owning an array's allocation. All cursor arithmetic lives here.
//! - DynamicArray - the public contiguous container over RawBuf.
//! - List - a minimal singly-linked container over the same capability.
//! - ContigError - what every fallible operation reports: out of bounds,
//!   allocation failure, or a capacity that can't be represented.
//!
//! Fallible operations come as `try_*` methods returning `Result`; their
//! plain counterparts treat allocation failure as fatal. Both leave the
//! container untouched on failure.
//!
//! Containers start in and can return to the null state, holding no
//! allocation at all. `std::mem::take` of a container is therefore free.
//!
//! Zero-sized element types are not supported by the array and panic on
//! the first allocation.

pub mod alloc;
pub mod array;
pub mod error;
pub mod list;
// Generic things
pub mod util;

pub use crate::alloc::{AllocError, Global, RawAlloc};
pub use crate::array::{DynamicArray, IntoIter};
pub use crate::error::ContigError;
pub use crate::list::List;
pub use crate::util::ScopeGuard;
