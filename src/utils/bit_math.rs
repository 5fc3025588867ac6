//! ## Bit Math Library in Rust
//!
//! Bit scans over the 256-bit words of a [`BoundaryBitmap`](crate::utils::BoundaryBitmap).

use alloy_primitives::U256;

/// Index of the highest set bit. `x` must be nonzero.
#[inline]
pub fn most_significant_bit(x: U256) -> u8 {
    debug_assert!(!x.is_zero(), "ZERO");
    (255 - x.leading_zeros()) as u8
}

/// Index of the lowest set bit. `x` must be nonzero.
#[inline]
pub fn least_significant_bit(x: U256) -> u8 {
    debug_assert!(!x.is_zero(), "ZERO");
    x.trailing_zeros() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_significant_bit() {
        for i in 0..=255 {
            let x = U256::from(1) << i;
            assert_eq!(most_significant_bit(x), i as u8);
            assert_eq!(most_significant_bit(x | U256::from(1)), i as u8);
        }
        assert_eq!(most_significant_bit(U256::MAX), 255);
    }

    #[test]
    fn test_least_significant_bit() {
        for i in 0..=255 {
            let x = U256::from(1) << i;
            assert_eq!(least_significant_bit(x), i as u8);
            assert_eq!(least_significant_bit(U256::MAX << i), i as u8);
        }
    }
}
