//! # Allocator Configuration
//!
//! Allocator budgets are read once at startup, usually from a TOML file:
//!
//! ```toml
//! [arena]
//! capacity = 1048576
//!
//! [stack]
//! capacity = 65536
//! policy = "strict"
//!
//! [pool]
//! chunk_size = 64
//! chunk_count = 1024
//! chunk_align = 16
//! detect_double_free = true
//! ```

use serde::Deserialize;

use super::align::POINTER_ALIGN;
use super::error::{AllocError, AllocResult};

/// What an allocator does when a caller breaks its contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Every failure is returned as an `Err`.
    Relaxed,
    /// Contract violations panic immediately. Exhaustion is still returned.
    Strict,
}

impl FailurePolicy {
    /// Passes `result` through, or panics if this policy is strict and the
    /// error is a contract violation.
    #[inline]
    pub(crate) fn enforce<T>(self, result: AllocResult<T>) -> AllocResult<T> {
        if let Err(err) = &result {
            tracing::trace!("Allocator call failed: {}", err);
            assert!(
                self == Self::Relaxed || !err.is_contract_violation(),
                "allocator contract violation: {err}"
            );
        }
        result
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Relaxed
        }
    }
}

const fn default_align() -> usize {
    POINTER_ALIGN
}

const fn default_detect_double_free() -> bool {
    cfg!(debug_assertions)
}

/// Configuration for an [`Arena`](super::Arena).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArenaConfig {
    /// Size of the backing block in bytes.
    pub capacity: usize,
    /// Alignment of the backing block base.
    #[serde(default = "default_align")]
    pub block_align: usize,
    /// Failure handling.
    #[serde(default)]
    pub policy: FailurePolicy,
}

impl ArenaConfig {
    /// Config with the given capacity and defaults for everything else.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            block_align: default_align(),
            policy: FailurePolicy::default(),
        }
    }

    /// Overrides the failure policy.
    #[must_use]
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Checks the config without acquiring memory.
    ///
    /// # Errors
    ///
    /// `Config` for a zero capacity or a non-power-of-two `block_align`.
    pub fn validate(&self) -> AllocResult<()> {
        validate_block("arena", self.capacity, self.block_align)
    }
}

/// Configuration for a [`StackAllocator`](super::StackAllocator).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StackConfig {
    /// Size of the backing block in bytes.
    pub capacity: usize,
    /// Alignment of the backing block base.
    #[serde(default = "default_align")]
    pub block_align: usize,
    /// Failure handling.
    #[serde(default)]
    pub policy: FailurePolicy,
}

impl StackConfig {
    /// Config with the given capacity and defaults for everything else.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            block_align: default_align(),
            policy: FailurePolicy::default(),
        }
    }

    /// Overrides the failure policy.
    #[must_use]
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Checks the config without acquiring memory.
    ///
    /// # Errors
    ///
    /// `Config` for a zero capacity or a non-power-of-two `block_align`.
    pub fn validate(&self) -> AllocResult<()> {
        validate_block("stack", self.capacity, self.block_align)
    }
}

/// Configuration for a [`PoolAllocator`](super::PoolAllocator).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PoolConfig {
    /// Requested chunk size in bytes. Rounded up to the chunk alignment.
    pub chunk_size: usize,
    /// Number of chunks in the pool.
    pub chunk_count: usize,
    /// Alignment every chunk address satisfies.
    #[serde(default = "default_align")]
    pub chunk_align: usize,
    /// Tag chunks as used/free and reject a second free of the same chunk.
    #[serde(default = "default_detect_double_free")]
    pub detect_double_free: bool,
    /// Failure handling.
    #[serde(default)]
    pub policy: FailurePolicy,
}

impl PoolConfig {
    /// Config for `chunk_count` chunks of `chunk_size` bytes.
    #[must_use]
    pub fn new(chunk_size: usize, chunk_count: usize) -> Self {
        Self {
            chunk_size,
            chunk_count,
            chunk_align: default_align(),
            detect_double_free: default_detect_double_free(),
            policy: FailurePolicy::default(),
        }
    }

    /// Overrides the chunk alignment.
    #[must_use]
    pub fn chunk_align(mut self, align: usize) -> Self {
        self.chunk_align = align;
        self
    }

    /// Enables or disables double-free detection.
    #[must_use]
    pub fn detect_double_free(mut self, enabled: bool) -> Self {
        self.detect_double_free = enabled;
        self
    }

    /// Overrides the failure policy.
    #[must_use]
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Checks the config without acquiring memory.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if a chunk cannot hold a free-list link, the count
    /// is zero, or `chunk_align` is not a power of two.
    pub fn validate(&self) -> AllocResult<()> {
        if self.chunk_size < std::mem::size_of::<usize>() {
            return Err(AllocError::invalid("chunk size cannot hold a free-list link"));
        }
        if self.chunk_count == 0 {
            return Err(AllocError::invalid("chunk count must be non-zero"));
        }
        if !self.chunk_align.is_power_of_two() {
            return Err(AllocError::invalid("chunk alignment must be a power of two"));
        }
        Ok(())
    }
}

/// Top-level memory budget file. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    /// Frame arena budget.
    pub arena: Option<ArenaConfig>,
    /// Scratch stack budget.
    pub stack: Option<StackConfig>,
    /// Object pool budget.
    pub pool: Option<PoolConfig>,
}

impl MemoryConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `Config` if the document does not parse or a section is invalid.
    pub fn from_toml_str(source: &str) -> AllocResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| AllocError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every present section.
    ///
    /// # Errors
    ///
    /// `Config` describing the first invalid section.
    pub fn validate(&self) -> AllocResult<()> {
        let checks = [
            self.arena.as_ref().map(ArenaConfig::validate),
            self.stack.as_ref().map(StackConfig::validate),
            self.pool.as_ref().map(PoolConfig::validate),
        ];
        for check in checks.into_iter().flatten() {
            check.map_err(|err| AllocError::Config(err.to_string()))?;
        }
        Ok(())
    }
}

fn validate_block(section: &'static str, capacity: usize, align: usize) -> AllocResult<()> {
    if capacity == 0 {
        return Err(AllocError::Config(format!("{section}: capacity must be non-zero")));
    }
    if !align.is_power_of_two() {
        return Err(AllocError::Config(format!(
            "{section}: block_align {align} is not a power of two"
        )));
    }
    Ok(())
}
