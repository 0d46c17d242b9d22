//! # Memory Management
//!
//! Fixed-budget allocators over a single owned block each.
//!
//! ## Design Philosophy
//!
//! Every allocator acquires its block once, at construction. After that:
//! - No system calls
//! - No growth
//! - Every call is a handful of arithmetic and memory operations
//!
//! | Strategy | Individual free | Bulk release |
//! |----------|-----------------|--------------|
//! | [`Arena`] | no-op | `reset` |
//! | [`StackAllocator`] | no-op | `reset`, `free_to_marker` |
//! | [`PoolAllocator`] | O(1) free-list push | `reset` |

mod align;
mod allocator;
mod arena;
mod block;
mod config;
mod cursor;
mod error;
mod pool;
mod stack;

pub use align::{align_up, padding_for, POINTER_ALIGN};
pub use allocator::{Allocator, AllocatorKind, AllocatorStats};
pub use arena::Arena;
pub use block::Block;
pub use config::{ArenaConfig, FailurePolicy, MemoryConfig, PoolConfig, StackConfig};
pub use error::{AllocError, AllocResult};
pub use pool::PoolAllocator;
pub use stack::{StackAllocator, StackMarker, StackScope};
