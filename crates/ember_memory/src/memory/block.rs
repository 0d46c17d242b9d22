//! # Backing Block
//!
//! The single contiguous region every allocator owns for its whole lifetime.
//! It is acquired from the global allocator once, at construction, and
//! released once, on drop.

// SAFETY: This module wraps one raw `std::alloc` allocation.
// All unsafe blocks are documented below.
#![allow(unsafe_code)]

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use super::error::{AllocError, AllocResult};

/// An exclusively owned, zero-initialized block of raw memory.
///
/// The block never grows and never moves. Addresses handed out from it stay
/// inside `[base_addr(), base_addr() + size())`.
#[derive(Debug)]
pub struct Block {
    /// Start of the allocation.
    base: NonNull<u8>,
    /// Layout used to allocate (and later free) the block.
    layout: Layout,
}

impl Block {
    /// Acquires a block of `size` bytes whose base is aligned to `align`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero size or a non-power-of-two alignment,
    /// `BlockAcquisition` if the global allocator refuses the request.
    pub fn acquire(size: usize, align: usize) -> AllocResult<Self> {
        if size == 0 {
            return Err(AllocError::invalid("block size must be non-zero"));
        }
        if !align.is_power_of_two() {
            return Err(AllocError::invalid("block alignment must be a power of two"));
        }
        let layout = Layout::from_size_align(size, align)
            .map_err(|_| AllocError::BlockAcquisition { size, align })?;

        // SAFETY: layout has a non-zero size (checked above).
        let raw = unsafe { alloc_zeroed(layout) };
        let base = NonNull::new(raw).ok_or(AllocError::BlockAcquisition { size, align })?;

        tracing::debug!("Acquired backing block: {} bytes aligned to {} at {:p}", size, align, raw);

        Ok(Self { base, layout })
    }

    /// Base pointer of the block.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Base address of the block as an integer.
    #[inline]
    #[must_use]
    pub fn base_addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Size of the block in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.layout.size()
    }

    /// Alignment of the block base.
    #[inline]
    #[must_use]
    pub const fn align(&self) -> usize {
        self.layout.align()
    }

    /// Returns true if `[addr, addr + len)` lies entirely inside the block.
    #[inline]
    #[must_use]
    pub fn contains(&self, addr: usize, len: usize) -> bool {
        let start = self.base_addr();
        match (addr.checked_sub(start), addr.checked_add(len)) {
            (Some(offset), Some(_)) => offset <= self.size() && len <= self.size() - offset,
            _ => false,
        }
    }

    /// Pointer to the byte at `offset` from the base.
    ///
    /// Callers guarantee `offset < size()`.
    #[inline]
    #[must_use]
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset < self.size());
        // SAFETY: offset is inside the allocation, so the result stays in
        // bounds and inherits the base's provenance. It cannot be null
        // because the base is non-null and the add does not wrap.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: base was returned by alloc_zeroed with exactly this layout
        // and is freed only here.
        unsafe {
            dealloc(self.base.as_ptr(), self.layout);
        }
    }
}

// SAFETY: Block owns its memory outright; moving it to another thread moves
// that ownership. It is deliberately not Sync.
unsafe impl Send for Block {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_acquire() {
        let block = Block::acquire(1024, 64).unwrap();
        assert_eq!(block.size(), 1024);
        assert_eq!(block.align(), 64);
        assert_eq!(block.base_addr() % 64, 0);
    }

    #[test]
    fn test_block_rejects_bad_arguments() {
        assert!(matches!(Block::acquire(0, 8), Err(AllocError::InvalidArgument { .. })));
        assert!(matches!(Block::acquire(64, 3), Err(AllocError::InvalidArgument { .. })));
    }

    #[test]
    fn test_block_contains() {
        let block = Block::acquire(128, 8).unwrap();
        let base = block.base_addr();

        assert!(block.contains(base, 128));
        assert!(block.contains(base + 64, 64));
        assert!(block.contains(base + 128, 0));
        assert!(!block.contains(base + 64, 65));
        assert!(!block.contains(base - 1, 1));
        assert!(!block.contains(usize::MAX, 2));
    }

    #[test]
    fn test_block_is_zeroed() {
        let block = Block::acquire(64, 8).unwrap();
        for offset in 0..64 {
            // SAFETY: offset is within the freshly zeroed block.
            let byte = unsafe { block.ptr_at(offset).as_ptr().read() };
            assert_eq!(byte, 0);
        }
    }
}
