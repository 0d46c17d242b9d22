//! # Pool Allocator
//!
//! Fixed-size chunk allocator for objects that are frequently allocated and freed.
//!
//! Free chunks are threaded into a singly-linked list through their own
//! storage: the first pointer-width bytes of a free chunk hold the address of
//! the next free chunk (null ends the list). No side table is needed.
//!
//! ```text
//! [Chunk0][Chunk1][Chunk2][Chunk3]...[ChunkN]
//!    ↓       ↓       ↓       ↓           ↓
//! [free] → [free] → [used]  [free] → [used]
//!                              ↓
//!                            null
//! ```

// SAFETY: This module reads and writes free-list links inside its own block.
// All unsafe blocks are documented below.
#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::{self, NonNull};

use super::align::{align_up, check_request, POINTER_ALIGN};
use super::allocator::{Allocator, AllocatorKind, AllocatorStats};
use super::block::Block;
use super::config::{FailurePolicy, PoolConfig};
use super::error::{AllocError, AllocResult};

/// A pool allocator for fixed-size chunks.
///
/// Chunks can be allocated and freed individually in O(1), but every chunk
/// has the same size. This is perfect for things like particles, network
/// packets, or temporary game objects.
///
/// Releasing the same chunk twice corrupts the free list (it ends up linked
/// to itself). With `detect_double_free` enabled the pool tags chunks as
/// used/free and rejects the second release with `DoubleFree` instead.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust
/// use ember_memory::{Allocator, PoolAllocator};
///
/// let mut pool = PoolAllocator::new(64, 10).unwrap();
///
/// // Allocate - O(1), no heap allocation
/// let chunk = pool.allocate(48, 8).unwrap();
///
/// // Free - O(1), no heap deallocation
/// pool.deallocate(chunk).unwrap();
/// assert_eq!(pool.free_chunk_count(), 10);
/// ```
#[derive(Debug)]
pub struct PoolAllocator {
    /// The chunk storage.
    block: Block,
    /// Size of every chunk, a multiple of `chunk_align`.
    chunk_size: usize,
    /// Total number of chunks.
    chunk_count: usize,
    /// Alignment every chunk address satisfies.
    chunk_align: usize,
    /// First free chunk, `None` when the pool is exhausted.
    free_head: Option<NonNull<u8>>,
    /// Number of chunks handed out.
    allocated_chunks: usize,
    /// Highest `allocated_chunks` ever observed.
    peak_chunks: usize,
    /// Per-chunk "in use" tags, present when double-free detection is on.
    in_use: Option<Vec<bool>>,
    /// Failure handling.
    policy: FailurePolicy,
}

impl PoolAllocator {
    /// Creates a pool of `chunk_count` chunks of at least `chunk_size` bytes.
    ///
    /// Uses [`FailurePolicy::default`] (strict in debug builds, where a double
    /// free panics) and tags chunks for double-free detection in debug builds.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `chunk_size` cannot hold a free-list link or
    /// `chunk_count` is zero; `BlockAcquisition` if the block cannot be acquired.
    pub fn new(chunk_size: usize, chunk_count: usize) -> AllocResult<Self> {
        Self::with_config(&PoolConfig::new(chunk_size, chunk_count))
    }

    /// Creates a pool whose chunks fit one `T` each.
    ///
    /// # Errors
    ///
    /// `BlockAcquisition` if the block cannot be acquired, `InvalidArgument`
    /// if the pool size overflows.
    pub fn for_type<T>(chunk_count: usize) -> AllocResult<Self> {
        let layout = Layout::new::<T>();
        let config = PoolConfig::new(layout.size().max(std::mem::size_of::<usize>()), chunk_count)
            .chunk_align(layout.align());
        Self::with_config(&config)
    }

    /// Creates a pool from a config section.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the config fails [`PoolConfig::validate`] or the
    /// pool size overflows, `BlockAcquisition` if the block cannot be acquired.
    pub fn with_config(config: &PoolConfig) -> AllocResult<Self> {
        config.validate()?;

        let chunk_align = config.chunk_align.max(POINTER_ALIGN);
        let chunk_size = align_up(config.chunk_size, chunk_align)
            .ok_or(AllocError::invalid("chunk size overflows"))?;
        let total = chunk_size
            .checked_mul(config.chunk_count)
            .ok_or(AllocError::invalid("pool size overflows"))?;

        let block = Block::acquire(total, chunk_align)?;
        let in_use = config
            .detect_double_free
            .then(|| vec![false; config.chunk_count]);

        let mut pool = Self {
            block,
            chunk_size,
            chunk_count: config.chunk_count,
            chunk_align,
            free_head: None,
            allocated_chunks: 0,
            peak_chunks: 0,
            in_use,
            policy: config.policy,
        };
        pool.link_all_chunks();

        tracing::debug!(
            "Pool created: {} chunks of {} bytes (align {}), double-free detection {}",
            pool.chunk_count,
            pool.chunk_size,
            pool.chunk_align,
            pool.in_use.is_some()
        );

        Ok(pool)
    }

    /// Size of every chunk in bytes (after rounding).
    #[inline]
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total number of chunks.
    #[inline]
    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Alignment every chunk address satisfies.
    #[inline]
    #[must_use]
    pub const fn chunk_align(&self) -> usize {
        self.chunk_align
    }

    /// Number of chunks currently handed out.
    #[inline]
    #[must_use]
    pub const fn allocated_chunks(&self) -> usize {
        self.allocated_chunks
    }

    /// Number of chunks on the free list.
    #[inline]
    #[must_use]
    pub const fn free_chunk_count(&self) -> usize {
        self.chunk_count - self.allocated_chunks
    }

    /// Returns true if `ptr` is the start of one of this pool's chunks.
    #[must_use]
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        self.chunk_index(ptr).is_some()
    }

    /// Index of the chunk starting at `ptr`.
    fn chunk_index(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = (ptr.as_ptr() as usize).checked_sub(self.block.base_addr())?;
        (offset < self.block.size() && offset % self.chunk_size == 0)
            .then(|| offset / self.chunk_size)
    }

    /// Threads every chunk into the free list, chunk 0 first.
    fn link_all_chunks(&mut self) {
        for index in 0..self.chunk_count {
            let next = if index + 1 < self.chunk_count {
                self.block.ptr_at((index + 1) * self.chunk_size).as_ptr()
            } else {
                ptr::null_mut()
            };
            let chunk = self.block.ptr_at(index * self.chunk_size);
            // SAFETY: chunk lies in our block, is aligned to chunk_align
            // (>= pointer alignment) and is at least one pointer wide.
            unsafe { write_link(chunk, next) };
        }
        self.free_head = Some(self.block.base());
        if let Some(in_use) = &mut self.in_use {
            in_use.fill(false);
        }
    }

    fn pop(&mut self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        check_request(size, align)?;
        if size > self.chunk_size {
            return Err(AllocError::invalid("request larger than the pool chunk size"));
        }
        if align > self.chunk_align {
            return Err(AllocError::invalid("alignment stronger than the pool chunk alignment"));
        }

        let chunk = self.free_head.ok_or(AllocError::OutOfMemory {
            requested: self.chunk_size,
            remaining: 0,
        })?;

        // SAFETY: every pointer on the free list is a free chunk of this
        // pool whose first bytes hold a link written by link_all_chunks or push.
        let next = unsafe { read_link(chunk) };
        self.free_head = NonNull::new(next);

        if let Some(in_use) = &mut self.in_use {
            let index = (chunk.as_ptr() as usize - self.block.base_addr()) / self.chunk_size;
            in_use[index] = true;
        }
        self.allocated_chunks += 1;
        self.peak_chunks = self.peak_chunks.max(self.allocated_chunks);
        Ok(chunk)
    }

    fn push(&mut self, ptr: NonNull<u8>) -> AllocResult<()> {
        let index = self
            .chunk_index(ptr)
            .ok_or(AllocError::invalid("pointer is not a chunk of this pool"))?;
        let address = ptr.as_ptr() as usize;

        if let Some(in_use) = &self.in_use {
            if !in_use[index] {
                return Err(AllocError::DoubleFree { address });
            }
        }
        if self.allocated_chunks == 0 {
            return Err(AllocError::DoubleFree { address });
        }

        // Re-derive the chunk from our own base so the link write stays
        // within the block's provenance.
        let chunk = self.block.ptr_at(index * self.chunk_size);
        let head = self.free_head.map_or(ptr::null_mut(), NonNull::as_ptr);
        // SAFETY: chunk is a chunk-aligned slot inside our block.
        unsafe { write_link(chunk, head) };
        self.free_head = Some(chunk);

        if let Some(in_use) = &mut self.in_use {
            in_use[index] = false;
        }
        self.allocated_chunks -= 1;
        Ok(())
    }
}

impl Allocator for PoolAllocator {
    /// Pops a chunk off the free list.
    ///
    /// `size` must fit in a chunk and `align` must not exceed
    /// [`chunk_align`](PoolAllocator::chunk_align); otherwise the request is
    /// only validated, never honoured partially.
    #[inline]
    fn allocate(&mut self, size: usize, align: usize) -> AllocResult<NonNull<u8>> {
        let result = self.pop(size, align);
        self.policy.enforce(result)
    }

    /// Pushes the chunk back onto the head of the free list.
    #[inline]
    fn deallocate(&mut self, ptr: NonNull<u8>) -> AllocResult<()> {
        let result = self.push(ptr);
        self.policy.enforce(result)
    }

    /// Rebuilds the free list as if freshly constructed.
    fn reset(&mut self) {
        tracing::debug!("Pool reset: reclaiming {} chunks", self.allocated_chunks);
        self.link_all_chunks();
        self.allocated_chunks = 0;
    }

    #[inline]
    fn allocated_bytes(&self) -> usize {
        self.allocated_chunks * self.chunk_size
    }

    #[inline]
    fn allocation_count(&self) -> usize {
        self.allocated_chunks
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.block.size()
    }

    fn kind(&self) -> AllocatorKind {
        AllocatorKind::Pool
    }

    fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            kind: AllocatorKind::Pool,
            capacity: self.block.size(),
            allocated_bytes: self.allocated_bytes(),
            allocation_count: self.allocated_chunks,
            peak_bytes: self.peak_chunks * self.chunk_size,
            count_is_exact: true,
        }
    }
}

// SAFETY: the free list only ever points into the pool's own block, which
// moves with the pool. Not Sync: there is no internal synchronization.
unsafe impl Send for PoolAllocator {}

/// Writes a free-list link into the first bytes of `chunk`.
///
/// # Safety
///
/// `chunk` must be valid for writes of one pointer and pointer-aligned.
#[inline]
#[allow(clippy::cast_ptr_alignment)]
unsafe fn write_link(chunk: NonNull<u8>, next: *mut u8) {
    chunk.as_ptr().cast::<*mut u8>().write(next);
}

/// Reads the free-list link stored in `chunk`.
///
/// # Safety
///
/// `chunk` must hold a link written by [`write_link`].
#[inline]
#[allow(clippy::cast_ptr_alignment)]
unsafe fn read_link(chunk: NonNull<u8>) -> *mut u8 {
    chunk.as_ptr().cast::<*mut u8>().read()
}
