//! # Stack Allocator
//!
//! A bump allocator that can be rewound to a saved position ("marker").
//!
//! ```text
//! [base]----[init A]----[init B]----[offset]----------------[end]
//!            ^ marker m1            ^ marker m2
//! ```
//!
//! Rewinding to `m2` reclaims everything allocated after `m2`; rewinding to
//! `m1` afterwards reclaims the rest. The allocator only moves one cursor, so
//! scopes must be released in LIFO order. Freeing an outer marker while an
//! inner scope still uses its memory is a caller bug it cannot detect.
//!
//! ## Allocation count
//!
//! The stack does not record per-allocation boundaries, so after rewinding to
//! a non-zero marker it cannot know how many allocations survived.
//! `allocation_count()` keeps its old value in that case (an over-estimate)
//! and [`StackAllocator::allocation_count_is_exact`] reports `false` until
//! the count is truthful again: after `reset()` or a rewind to offset 0.

use std::num::NonZeroU64;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use super::allocator::{Allocator, AllocatorKind, AllocatorStats};
use super::block::Block;
use super::config::{FailurePolicy, StackConfig};
use super::cursor::Cursor;
use super::error::{AllocError, AllocResult};

/// Source of stack identities. Block addresses get reused after a drop, ids never do.
static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(1);

fn next_stack_id() -> NonZeroU64 {
    NonZeroU64::new(NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed)).unwrap_or(NonZeroU64::MIN)
}

/// Opaque saved position of a [`StackAllocator`].
///
/// Only valid for the stack that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackMarker {
    offset: usize,
    /// Identity of the producing stack.
    owner: NonZeroU64,
}

impl StackMarker {
    /// Offset from the start of the block this marker records.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

/// A bump allocator with LIFO rewind support.
///
/// # Thread Safety
///
/// NOT thread-safe. Use one stack per thread.
///
/// # Example
///
/// ```rust
/// use ember_memory::{Allocator, StackAllocator};
///
/// let mut stack = StackAllocator::new(4096).unwrap();
/// let marker = stack.marker();
///
/// stack.allocate(256, 16).unwrap();
/// stack.allocate(64, 8).unwrap();
///
/// stack.free_to_marker(marker).unwrap();
/// assert_eq!(stack.allocated_bytes(), marker.offset());
/// ```
#[derive(Debug)]
pub struct StackAllocator {
    id: NonZeroU64,
    cursor: Cursor,
    policy: FailurePolicy,
    count_is_exact: bool,
}

impl StackAllocator {
    /// Creates a new stack with the specified capacity in bytes.
    ///
    /// Uses [`FailurePolicy::default`]: strict in debug builds, where a bad
    /// marker passed to [`free_to_marker`](Self::free_to_marker) panics.
    /// Build with [`StackConfig`] and [`FailurePolicy::Relaxed`] to get
    /// `InvalidMarker` back as an `Err` instead.
    ///
    /// # Errors
    ///
    /// Fails if `capacity` is zero or the backing block cannot be acquired.
    pub fn new(capacity: usize) -> AllocResult<Self> {
        Self::with_config(&StackConfig::with_capacity(capacity))
    }

    /// Creates a stack from a config section.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero capacity or a non-power-of-two
    /// `block_align`, `BlockAcquisition` if the block cannot be acquired.
    pub fn with_config(config: &StackConfig) -> AllocResult<Self> {
        let block = Block::acquire(config.capacity, config.block_align)?;
        tracing::debug!("Stack created: {} bytes, policy {:?}", config.capacity, config.policy);
        Ok(Self {
            id: next_stack_id(),
            cursor: Cursor::new(block),
            policy: config.policy,
            count_is_exact: true,
        })
    }

    /// Records the current position.
    #[inline]
    #[must_use]
    pub fn marker(&self) -> StackMarker {
        StackMarker {
            offset: self.cursor.offset(),
            owner: self.id,
        }
    }

    /// Releases everything allocated after `marker` was taken.
    ///
    /// # Errors
    ///
    /// `InvalidMarker` if the marker lies beyond the current position or was
    /// taken from a different stack. State is unchanged on failure.
    pub fn free_to_marker(&mut self, marker: StackMarker) -> AllocResult<()> {
        let result = self.rewind(marker);
        self.policy.enforce(result)
    }

    /// Opens a scope that rewinds to the current position when dropped.
    ///
    /// The scope borrows the stack mutably, so nested scopes are released
    /// in LIFO order.
    #[must_use = "the scope rewinds when dropped"]
    pub fn scope(&mut self) -> StackScope<'_> {
        let marker = self.marker();
        StackScope { stack: self, marker }
    }

    /// False after a rewind to a non-zero marker. See the module docs.
    #[inline]
    #[must_use]
    pub const fn allocation_count_is_exact(&self) -> bool {
        self.count_is_exact
    }

    /// Returns the highest number of bytes ever in use at once.
    #[inline]
    #[must_use]
    pub const fn peak_bytes(&self) -> usize {
        self.cursor.peak()
    }

    /// Returns true if `ptr` points into this stack's block.
    #[inline]
    #[must_use]
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        self.cursor.block().contains(ptr.as_ptr() as usize, 1)
    }

    fn rewind(&mut self, marker: StackMarker) -> AllocResult<()> {
        let offset = self.cursor.offset();
        if marker.owner != self.id || marker.offset > offset {
            return Err(AllocError::InvalidMarker {
                marker: marker.offset,
                offset,
            });
        }

        tracing::debug!("Stack rewind: {} -> {}", offset, marker.offset);
        self.cursor.rewind(marker.offset);
        if marker.offset == 0 {
            self.cursor.reset_count();
            self.count_is_exact = true;
        } else if marker.offset < offset {
            self.count_is_exact = false;
        }
        Ok(())
    }
}

impl Allocator for StackAllocator {
    #[inline]
    fn allocate(&mut self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        let result = self.cursor.bump(size, align);
        self.policy.enforce(result)
    }

    /// No-op. Use [`StackAllocator::free_to_marker`] or `reset`.
    #[inline]
    fn deallocate(&mut self, _ptr: NonNull<u8>) -> AllocResult<()> {
        Ok(())
    }

    fn reset(&mut self) {
        tracing::debug!("Stack reset: releasing {} bytes", self.cursor.offset());
        self.cursor.clear();
        self.count_is_exact = true;
    }

    #[inline]
    fn allocated_bytes(&self) -> usize {
        self.cursor.offset()
    }

    #[inline]
    fn allocation_count(&self) -> usize {
        self.cursor.count()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.cursor.capacity()
    }

    fn kind(&self) -> AllocatorKind {
        AllocatorKind::Stack
    }

    fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            kind: AllocatorKind::Stack,
            capacity: self.cursor.capacity(),
            allocated_bytes: self.cursor.offset(),
            allocation_count: self.cursor.count(),
            peak_bytes: self.cursor.peak(),
            count_is_exact: self.count_is_exact,
        }
    }
}

/// RAII scope over a [`StackAllocator`].
///
/// Derefs to the stack; rewinds it to the position the scope was opened at
/// when dropped. If the stack was already rewound past that point (e.g. by
/// `reset`), dropping the scope does nothing.
pub struct StackScope<'a> {
    stack: &'a mut StackAllocator,
    marker: StackMarker,
}

impl StackScope<'_> {
    /// Position this scope will rewind to.
    #[inline]
    #[must_use]
    pub const fn marker(&self) -> StackMarker {
        self.marker
    }
}

impl Deref for StackScope<'_> {
    type Target = StackAllocator;

    fn deref(&self) -> &StackAllocator {
        self.stack
    }
}

impl DerefMut for StackScope<'_> {
    fn deref_mut(&mut self) -> &mut StackAllocator {
        self.stack
    }
}

impl Drop for StackScope<'_> {
    fn drop(&mut self) {
        let _ = self.stack.rewind(self.marker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relaxed(capacity: usize) -> StackAllocator {
        StackAllocator::with_config(
            &StackConfig::with_capacity(capacity).policy(FailurePolicy::Relaxed),
        )
        .unwrap()
    }

    #[test]
    fn test_marker_rewind() {
        let mut stack = relaxed(1024);
        stack.allocate(16, 8).unwrap();
        let marker = stack.marker();
        assert_eq!(marker.offset(), 16);

        stack.allocate(100, 8).unwrap();
        stack.allocate(50, 4).unwrap();
        stack.free_to_marker(marker).unwrap();

        assert_eq!(stack.allocated_bytes(), 16);
        assert!(!stack.allocation_count_is_exact());
        assert_eq!(stack.allocation_count(), 3);
    }

    #[test]
    fn test_future_marker_rejected() {
        let mut stack = relaxed(1024);
        stack.allocate(64, 8).unwrap();
        let future = stack.marker();

        let start = StackMarker { offset: 0, owner: future.owner };
        stack.free_to_marker(start).unwrap();

        let err = stack.free_to_marker(future).unwrap_err();
        assert_eq!(err, AllocError::InvalidMarker { marker: 64, offset: 0 });
        assert_eq!(stack.allocated_bytes(), 0);
    }

    #[test]
    fn test_foreign_marker_rejected() {
        let mut a = relaxed(128);
        let b = relaxed(128);
        a.allocate(32, 8).unwrap();

        let foreign = b.marker();
        assert!(matches!(a.free_to_marker(foreign), Err(AllocError::InvalidMarker { .. })));
        assert_eq!(a.allocated_bytes(), 32);
    }

    #[test]
    fn test_marker_from_dropped_stack_rejected() {
        let stale = {
            let mut old = relaxed(256);
            old.allocate(64, 8).unwrap();
            old.marker()
        };
        assert_eq!(stale.offset(), 64);

        // Same size, so the allocator may well hand back the old block.
        let mut stack = relaxed(256);
        stack.allocate(128, 8).unwrap();

        let err = stack.free_to_marker(stale).unwrap_err();
        assert_eq!(err, AllocError::InvalidMarker { marker: 64, offset: 128 });
        assert_eq!(stack.allocated_bytes(), 128);
    }

    #[test]
    fn test_rewind_to_zero_restores_exact_count() {
        let mut stack = relaxed(256);
        let start = stack.marker();
        stack.allocate(8, 8).unwrap();
        let mid = stack.marker();
        stack.allocate(8, 8).unwrap();

        stack.free_to_marker(mid).unwrap();
        assert!(!stack.allocation_count_is_exact());

        stack.free_to_marker(start).unwrap();
        assert!(stack.allocation_count_is_exact());
        assert_eq!(stack.allocation_count(), 0);
    }

    #[test]
    fn test_rewind_to_current_keeps_exact_count() {
        let mut stack = relaxed(256);
        stack.allocate(8, 8).unwrap();
        let here = stack.marker();
        stack.free_to_marker(here).unwrap();
        assert!(stack.allocation_count_is_exact());
        assert_eq!(stack.allocation_count(), 1);
    }

    #[test]
    fn test_scope_rewinds_on_drop() {
        let mut stack = relaxed(512);
        stack.allocate(32, 8).unwrap();
        {
            let mut outer = stack.scope();
            outer.allocate(64, 8).unwrap();
            {
                let mut inner = outer.scope();
                inner.allocate(128, 8).unwrap();
                assert_eq!(inner.allocated_bytes(), 224);
            }
            assert_eq!(outer.allocated_bytes(), 96);
        }
        assert_eq!(stack.allocated_bytes(), 32);
    }

    #[test]
    fn test_scope_after_reset_is_harmless() {
        let mut stack = relaxed(512);
        stack.allocate(32, 8).unwrap();
        {
            let mut scope = stack.scope();
            scope.allocate(16, 8).unwrap();
            scope.reset();
        }
        assert_eq!(stack.allocated_bytes(), 0);
        assert!(stack.allocation_count_is_exact());
    }

    #[test]
    fn test_reset_twice() {
        let mut stack = relaxed(128);
        stack.allocate(40, 8).unwrap();
        stack.reset();
        let once = stack.stats();
        stack.reset();
        assert_eq!(stack.stats(), once);
        assert_eq!(once.allocated_bytes, 0);
    }

    #[test]
    #[should_panic(expected = "allocator contract violation")]
    fn test_strict_stack_panics_on_future_marker() {
        let mut stack =
            StackAllocator::with_config(&StackConfig::with_capacity(64).policy(FailurePolicy::Strict))
                .unwrap();
        stack.allocate(8, 8).unwrap();
        let future = stack.marker();
        stack.reset();
        let _ = stack.free_to_marker(future);
    }
}
