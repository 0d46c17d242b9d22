//! # Ember Memory
//!
//! Arena, stack and pool allocators for latency-critical engine code:
//! - Frame-transient data in an [`Arena`], reset once per frame
//! - Nested initialization phases on a [`StackAllocator`] with markers
//! - Fixed-size objects in a [`PoolAllocator`] with O(1) free
//!
//! ## Architecture Rules
//!
//! 1. **One block per allocator** - acquired at construction, released on drop
//! 2. **No system calls after construction** - allocation is pure arithmetic
//! 3. **Single-threaded** - no internal locking; one allocator per thread
//!
//! ## Example
//!
//! ```rust
//! use ember_memory::{Allocator, Arena, PoolAllocator};
//!
//! let mut frame = Arena::new(64 * 1024)?;
//! let scratch = frame.allocate(1024, 16)?;
//! assert_eq!(scratch.as_ptr() as usize % 16, 0);
//! frame.reset();
//!
//! let mut packets = PoolAllocator::new(256, 32)?;
//! let packet = packets.allocate(200, 8)?;
//! packets.deallocate(packet)?;
//! # Ok::<(), ember_memory::AllocError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;

pub use memory::{
    AllocError, AllocResult, Allocator, AllocatorKind, AllocatorStats, Arena, ArenaConfig,
    FailurePolicy, MemoryConfig, PoolAllocator, PoolConfig, StackAllocator, StackConfig,
    StackMarker, StackScope,
};
