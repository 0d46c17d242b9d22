//! Bump cursor shared by the arena and stack allocators.

use std::ptr::NonNull;

use super::align::{check_request, padding_for};
use super::block::Block;
use super::error::{AllocError, AllocResult};

/// A forward-only offset into an owned block.
///
/// Invariant: `0 <= offset <= block.size()`.
#[derive(Debug)]
pub(crate) struct Cursor {
    block: Block,
    offset: usize,
    count: usize,
    peak: usize,
}

impl Cursor {
    pub(crate) fn new(block: Block) -> Self {
        Self {
            block,
            offset: 0,
            count: 0,
            peak: 0,
        }
    }

    /// Hands out the next `size` bytes at or after the cursor that satisfy `align`.
    ///
    /// Nothing changes unless the whole padded request fits.
    pub(crate) fn bump(&mut self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        check_request(size, align)?;

        let remaining = self.remaining();
        let padding = padding_for(self.block.base_addr() + self.offset, align);
        let needed = padding.saturating_add(size);
        if needed > remaining {
            return Err(AllocError::OutOfMemory {
                requested: needed,
                remaining,
            });
        }

        let ptr = self.block.ptr_at(self.offset + padding);
        self.offset += needed;
        self.count += 1;
        self.peak = self.peak.max(self.offset);
        Ok(ptr)
    }

    /// Moves the cursor back to `offset`. Callers check `offset <= self.offset()`.
    pub(crate) fn rewind(&mut self, offset: usize) {
        debug_assert!(offset <= self.offset);
        self.offset = offset;
    }

    pub(crate) fn clear(&mut self) {
        self.offset = 0;
        self.count = 0;
    }

    pub(crate) fn reset_count(&mut self) {
        self.count = 0;
    }

    #[inline]
    pub(crate) const fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub(crate) const fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub(crate) const fn peak(&self) -> usize {
        self.peak
    }

    #[inline]
    pub(crate) const fn capacity(&self) -> usize {
        self.block.size()
    }

    #[inline]
    pub(crate) const fn remaining(&self) -> usize {
        self.block.size() - self.offset
    }

    #[inline]
    pub(crate) const fn block(&self) -> &Block {
        &self.block
    }
}
