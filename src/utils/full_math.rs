//! ## Full Math
//!
//! Multiplication and division on 512-bit intermediates with an explicit rounding direction.

use crate::prelude::*;
use alloy_primitives::{U160, U256, U512};

/// Rounding direction of a division.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rounding {
    Down,
    Up,
}

/// Calculates `floor(a * b / denominator)` with full precision.
///
/// Fails with [`Error::MulDivOverflow`] if the result does not fit in 256 bits or the
/// denominator is zero.
#[inline]
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, Error> {
    mul_div_rounding(a, b, denominator, Rounding::Down)
}

/// Calculates `ceil(a * b / denominator)` with full precision.
#[inline]
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, Error> {
    mul_div_rounding(a, b, denominator, Rounding::Up)
}

pub fn mul_div_rounding(
    a: U256,
    b: U256,
    denominator: U256,
    rounding: Rounding,
) -> Result<U256, Error> {
    if denominator.is_zero() {
        return Err(Error::MulDivOverflow);
    }
    let product: U512 = a.widening_mul(b);
    let (mut quotient, remainder) = product.div_rem(U512::from(denominator));
    if rounding == Rounding::Up && !remainder.is_zero() {
        quotient += U512::from(1);
    }
    narrow_u512(quotient)
}

/// Divides with the given rounding, for 512-bit operands that do not fit the 256-bit helpers.
#[inline]
pub fn div_rounding_u512(
    numerator: U512,
    denominator: U512,
    rounding: Rounding,
) -> Result<U512, Error> {
    if denominator.is_zero() {
        return Err(Error::MulDivOverflow);
    }
    let (quotient, remainder) = numerator.div_rem(denominator);
    if rounding == Rounding::Up && !remainder.is_zero() {
        Ok(quotient + U512::from(1))
    } else {
        Ok(quotient)
    }
}

/// Truncates a 512-bit value to 256 bits, failing if any high limb is set.
#[inline]
pub fn narrow_u512(x: U512) -> Result<U256, Error> {
    let limbs = x.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return Err(Error::MulDivOverflow);
    }
    Ok(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

/// Floor of the square root, by Newton's method.
pub fn sqrt_u512(x: U512) -> U512 {
    if x.is_zero() {
        return U512::ZERO;
    }
    // 2^ceil(bits / 2) is an upper bound of the root
    let mut z = U512::from(1) << ((x.bit_len() + 1) / 2);
    loop {
        let y = (z + x / z) >> 1;
        if y >= z {
            return z;
        }
        z = y;
    }
}

/// Ceiling of the square root.
#[inline]
pub fn sqrt_rounding_up_u512(x: U512) -> U512 {
    let root = sqrt_u512(x);
    if root * root == x {
        root
    } else {
        root + U512::from(1)
    }
}

#[inline]
pub fn to_u128(x: U256) -> Result<u128, Error> {
    if x > U256::from(u128::MAX) {
        return Err(Error::SafeCastToU128Overflow);
    }
    Ok(x.to::<u128>())
}

#[inline]
pub fn to_u160(x: U256) -> Result<U160, Error> {
    if x > U256::from(U160::MAX) {
        return Err(Error::SafeCastToU160Overflow);
    }
    Ok(U160::from(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::uint;

    const Q128: U256 = U256::from_limbs([0, 0, 1, 0]);

    #[test]
    #[should_panic(expected = "MulDivOverflow")]
    fn test_mul_div_denominator_zero() {
        mul_div(Q128, U256::from(5), U256::ZERO).unwrap();
    }

    #[test]
    #[should_panic(expected = "MulDivOverflow")]
    fn test_mul_div_output_overflow() {
        mul_div(Q128, Q128, U256::from(1)).unwrap();
    }

    #[test]
    fn test_mul_div_all_max_inputs() {
        assert_eq!(mul_div(U256::MAX, U256::MAX, U256::MAX).unwrap(), U256::MAX);
    }

    #[test]
    fn test_mul_div_phantom_overflow() {
        assert_eq!(
            mul_div(Q128, U256::from(35) * Q128, U256::from(8) * Q128).unwrap(),
            U256::from(4375) * Q128 / U256::from(1000)
        );
        assert_eq!(
            mul_div(Q128, U256::from(1000) * Q128, U256::from(3000) * Q128).unwrap(),
            Q128 / U256::from(3)
        );
    }

    #[test]
    fn test_mul_div_rounding_up() {
        assert_eq!(
            mul_div_rounding_up(Q128, U256::from(1000) * Q128, U256::from(3000) * Q128).unwrap(),
            Q128 / U256::from(3) + U256::from(1)
        );
        assert_eq!(
            mul_div_rounding_up(U256::from(10), U256::from(10), U256::from(4)).unwrap(),
            U256::from(25)
        );
    }

    #[test]
    #[should_panic(expected = "MulDivOverflow")]
    fn test_mul_div_rounding_up_overflow_after_rounding() {
        mul_div_rounding_up(
            uint!(535006138814359_U256),
            uint!(
                432862656469423142931042426214547535783388063929571229938474969_U256
            ),
            U256::from(2),
        )
        .unwrap();
    }

    #[test]
    fn test_sqrt() {
        for x in [0u64, 1, 2, 3, 4, 15, 16, 17, 1 << 40, u64::MAX] {
            let root = sqrt_u512(U512::from(x));
            assert!(root * root <= U512::from(x));
            assert!((root + U512::from(1)) * (root + U512::from(1)) > U512::from(x));
        }
        let big = U512::from(1) << 462;
        assert_eq!(sqrt_u512(big), U512::from(1) << 231);
        assert_eq!(
            sqrt_rounding_up_u512(big + U512::from(1)),
            (U512::from(1) << 231) + U512::from(1)
        );
        assert_eq!(sqrt_rounding_up_u512(U512::from(16)), U512::from(4));
    }

    #[test]
    fn test_safe_casts() {
        assert_eq!(to_u128(U256::from(u128::MAX)).unwrap(), u128::MAX);
        assert_eq!(
            to_u128(U256::from(u128::MAX) + U256::from(1)).unwrap_err(),
            Error::SafeCastToU128Overflow
        );
        assert_eq!(
            to_u160(U256::from(1) << 160).unwrap_err(),
            Error::SafeCastToU160Overflow
        );
    }
}
