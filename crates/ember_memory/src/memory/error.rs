//! # Allocator Error Types
//!
//! All errors that can occur while acquiring or carving up a memory block.

use thiserror::Error;

/// Errors that can occur in the memory subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// A request or construction parameter breaks the allocator contract.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument.
        reason: &'static str,
    },

    /// Not enough space left in the block (or no free chunk in a pool).
    #[error("out of memory: requested {requested} bytes, {remaining} remaining")]
    OutOfMemory {
        /// Bytes the caller asked for (including alignment padding).
        requested: usize,
        /// Bytes still available when the request was made.
        remaining: usize,
    },

    /// A stack marker is later than the current cursor or belongs to another stack.
    #[error("invalid marker: marker at offset {marker}, stack cursor at {offset}")]
    InvalidMarker {
        /// Offset carried by the rejected marker.
        marker: usize,
        /// Stack cursor at the time of the call.
        offset: usize,
    },

    /// A pool chunk was released while already on the free list.
    #[error("double free of chunk at {address:#x}")]
    DoubleFree {
        /// Address of the chunk.
        address: usize,
    },

    /// The host refused to hand out the backing block.
    #[error("failed to acquire backing block of {size} bytes aligned to {align}")]
    BlockAcquisition {
        /// Requested block size.
        size: usize,
        /// Requested block alignment.
        align: usize,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AllocError {
    /// Shorthand for [`AllocError::InvalidArgument`].
    #[inline]
    pub(crate) const fn invalid(reason: &'static str) -> Self {
        Self::InvalidArgument { reason }
    }

    /// Returns true for caller bugs, as opposed to runtime exhaustion.
    ///
    /// Strict allocators panic on these instead of returning them.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::InvalidMarker { .. } | Self::DoubleFree { .. }
        )
    }
}

/// Result type for allocator operations.
pub type AllocResult<T> = Result<T, AllocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violation_classification() {
        assert!(AllocError::invalid("zero size").is_contract_violation());
        assert!(AllocError::InvalidMarker { marker: 8, offset: 4 }.is_contract_violation());
        assert!(AllocError::DoubleFree { address: 0x1000 }.is_contract_violation());
        assert!(!AllocError::OutOfMemory { requested: 8, remaining: 0 }.is_contract_violation());
        assert!(!AllocError::BlockAcquisition { size: 8, align: 8 }.is_contract_violation());
    }

    #[test]
    fn test_error_messages() {
        let err = AllocError::OutOfMemory { requested: 128, remaining: 64 };
        assert_eq!(err.to_string(), "out of memory: requested 128 bytes, 64 remaining");

        let err = AllocError::DoubleFree { address: 0x40 };
        assert_eq!(err.to_string(), "double free of chunk at 0x40");
    }
}
