//! # Allocator Contract
//!
//! The interface every strategy implements, plus a plain statistics snapshot.

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

use super::align::POINTER_ALIGN;
use super::error::AllocResult;

/// Which strategy an allocator implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AllocatorKind {
    /// Bump pointer, bulk reset only.
    Arena,
    /// Bump pointer with rewindable markers.
    Stack,
    /// Fixed-size chunks with an intrusive free list.
    Pool,
}

impl fmt::Display for AllocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Arena => "arena",
            Self::Stack => "stack",
            Self::Pool => "pool",
        };
        f.write_str(name)
    }
}

/// Point-in-time usage numbers for one allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Strategy of the allocator.
    pub kind: AllocatorKind,
    /// Size of the backing block in bytes.
    pub capacity: usize,
    /// Bytes currently handed out, including alignment padding.
    pub allocated_bytes: usize,
    /// Live allocations. See `count_is_exact`.
    pub allocation_count: usize,
    /// Highest `allocated_bytes` ever observed.
    pub peak_bytes: usize,
    /// False when `allocation_count` is known to be an over-estimate.
    pub count_is_exact: bool,
}

/// A strategy for carving a single owned block into allocations.
///
/// Addresses returned by [`allocate`](Allocator::allocate) point into the
/// allocator's block and are never null. Reading or writing through them is
/// the caller's business and becomes invalid as soon as the memory is
/// released (individually, by a reset, or by a stack rewind).
///
/// # Thread Safety
///
/// Implementations do no internal locking. Give each thread its own
/// allocator, or wrap one in a mutex.
pub trait Allocator {
    /// Allocates `size` bytes aligned to `align`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero size or a non-power-of-two alignment,
    /// `OutOfMemory` when the request does not fit. State is unchanged on
    /// failure.
    fn allocate(&mut self, size: usize, align: usize) -> AllocResult<NonNull<u8>>;

    /// Releases one allocation. What that means depends on the strategy.
    ///
    /// # Errors
    ///
    /// Pools return `InvalidArgument` for a pointer that is not a chunk of
    /// theirs and `DoubleFree` for a chunk already on the free list. Bump
    /// allocators never fail here.
    fn deallocate(&mut self, ptr: NonNull<u8>) -> AllocResult<()>;

    /// Releases everything at once, invalidating every outstanding address.
    fn reset(&mut self);

    /// Bytes currently handed out.
    fn allocated_bytes(&self) -> usize;

    /// Number of live allocations.
    fn allocation_count(&self) -> usize;

    /// Size of the backing block in bytes.
    fn capacity(&self) -> usize;

    /// Strategy of this allocator.
    fn kind(&self) -> AllocatorKind;

    /// Usage snapshot.
    fn stats(&self) -> AllocatorStats;

    /// Bytes not yet handed out.
    fn remaining(&self) -> usize {
        self.capacity() - self.allocated_bytes()
    }

    /// Allocates `size` bytes at pointer alignment.
    ///
    /// # Errors
    ///
    /// Same as [`allocate`](Self::allocate).
    fn allocate_default(&mut self, size: usize) -> AllocResult<NonNull<u8>> {
        self.allocate(size, POINTER_ALIGN)
    }

    /// Allocates room for `layout`.
    ///
    /// # Errors
    ///
    /// Same as [`allocate`](Self::allocate); a zero-sized layout is
    /// `InvalidArgument`.
    fn allocate_layout(&mut self, layout: Layout) -> AllocResult<NonNull<u8>> {
        self.allocate(layout.size(), layout.align())
    }
}
