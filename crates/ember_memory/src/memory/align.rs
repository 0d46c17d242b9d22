//! Alignment arithmetic on integer addresses.
//!
//! All address math is done on `usize` so nothing ever forms a pointer
//! outside the owned block just to test it.

use super::error::{AllocError, AllocResult};

/// Default alignment: the platform pointer width.
pub const POINTER_ALIGN: usize = std::mem::align_of::<usize>();

/// Rounds `value` up to the next multiple of `align`.
///
/// `align` must be a power of two. Returns `None` on overflow.
#[inline]
#[must_use]
pub const fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    match value.checked_add(align - 1) {
        Some(bumped) => Some(bumped & !(align - 1)),
        None => None,
    }
}

/// Bytes needed to move `addr` forward to the next multiple of `align`.
#[inline]
#[must_use]
pub const fn padding_for(addr: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    addr.wrapping_neg() & (align - 1)
}

/// Validates an allocation request shared by every strategy.
#[inline]
pub(crate) fn check_request(size: usize, align: usize) -> AllocResult<()> {
    if size == 0 {
        return Err(AllocError::invalid("allocation size must be non-zero"));
    }
    if !align.is_power_of_two() {
        return Err(AllocError::invalid("alignment must be a power of two"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up_exact_and_overflow() {
        assert_eq!(align_up(0, 64), Some(0));
        assert_eq!(align_up(64, 64), Some(64));
        assert_eq!(align_up(usize::MAX, 2), None);
    }

    #[test]
    fn test_padding_matches_align_up() {
        for addr in 0..256usize {
            for align in [1, 2, 4, 8, 16, 32, 64] {
                let aligned = align_up(addr, align).unwrap();
                assert_eq!(addr + padding_for(addr, align), aligned);
                assert_eq!(aligned % align, 0);
                assert!(aligned - addr < align);
            }
        }
    }

    #[test]
    fn test_check_request() {
        assert!(check_request(1, 1).is_ok());
        assert!(check_request(0, 8).is_err());
        assert!(check_request(8, 0).is_err());
        assert!(check_request(8, 12).is_err());
    }
}
