use alloy_primitives::{uint, U160, U256};

/// The minimum boundary that can be passed to [`get_price_x96_at_boundary`].
pub const MIN_BOUNDARY: i32 = -527400;
/// The maximum boundary that can be passed to [`get_price_x96_at_boundary`].
pub const MAX_BOUNDARY: i32 = 443635;

/// The price returned by [`get_price_x96_at_boundary`] for [`MIN_BOUNDARY`].
pub const MIN_RATIO: U160 = uint!(989314_U160);
/// The price returned by [`get_price_x96_at_boundary`] for [`MAX_BOUNDARY`].
pub const MAX_RATIO: U160 = uint!(1461300573427867316570072651998408279850435624081_U160);

pub const Q96: U256 = U256::from_limbs([0, 0x100000000, 0, 0]);
pub const Q97: U256 = U256::from_limbs([0, 0x200000000, 0, 0]);

/// Fee rates are expressed in parts per million.
pub const FEE_DENOMINATOR: u32 = 1_000_000;

/// The largest taker fee a resolution can be configured with, in parts per million.
pub const MAX_TAKER_FEE: i32 = 10_000;

/// The resolution tiers a grid can be created with. The discriminant is the bucket width in
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    LOW = 1,
    MEDIUM = 5,
    HIGH = 30,
}

impl Resolution {
    /// The default taker fee of the resolution, in parts per million.
    pub const fn taker_fee(&self) -> i32 {
        match self {
            Self::LOW => 100,
            Self::MEDIUM => 500,
            Self::HIGH => 3000,
        }
    }

    /// The default maker fee of the resolution, in parts per million. Negative values are
    /// rebates paid out of the taker fee.
    pub const fn maker_fee(&self) -> i32 {
        match self {
            Self::LOW => -80,
            Self::MEDIUM => -400,
            Self::HIGH => -2400,
        }
    }

    #[inline]
    pub const fn as_i32(&self) -> i32 {
        *self as i32
    }
}

impl TryFrom<i32> for Resolution {
    type Error = crate::error::Error;

    fn try_from(resolution: i32) -> Result<Self, Self::Error> {
        match resolution {
            1 => Ok(Self::LOW),
            5 => Ok(Self::MEDIUM),
            30 => Ok(Self::HIGH),
            _ => Err(crate::error::Error::InvalidResolution(resolution)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q_constants() {
        assert_eq!(Q96, U256::from(1) << 96);
        assert_eq!(Q97, U256::from(1) << 97);
    }

    #[test]
    fn test_resolution_fees() {
        for resolution in [Resolution::LOW, Resolution::MEDIUM, Resolution::HIGH] {
            assert!(resolution.maker_fee() <= 0);
            assert!(resolution.maker_fee().abs() <= resolution.taker_fee());
            assert!(resolution.taker_fee() <= MAX_TAKER_FEE);
        }
        assert_eq!(Resolution::MEDIUM.as_i32(), 5);
        assert_eq!(Resolution::try_from(30).unwrap(), Resolution::HIGH);
        assert!(Resolution::try_from(10).is_err());
    }
}
