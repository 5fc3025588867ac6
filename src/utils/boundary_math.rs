//! ## Boundary Math
//!
//! Conversions between a boundary and its price `1.0001^boundary` as a Q64.96 fixed point number,
//! plus the range and resolution checks built on them.

use super::most_significant_bit;
use crate::prelude::*;
use alloy_primitives::{uint, U160, U256};
use num_integer::Integer;

/// `MAX_RATIO - MIN_RATIO`, used for a single comparison range check
const MAX_RATIO_MINUS_MIN_RATIO: U160 =
    uint!(1461300573427867316570072651998408279850434634767_U160);

/// Trait to provide boundary math functions for [`U160`] prices.
pub trait BoundaryMath: Sized {
    fn get_price_x96_at_boundary(boundary: i32) -> Result<Self, Error>;
    fn get_boundary_at_price_x96(self) -> Result<i32, Error>;
}

impl BoundaryMath for U160 {
    #[inline]
    fn get_price_x96_at_boundary(boundary: i32) -> Result<Self, Error> {
        get_price_x96_at_boundary(boundary)
    }

    #[inline]
    fn get_boundary_at_price_x96(self) -> Result<i32, Error> {
        get_boundary_at_price_x96(self)
    }
}

/// Returns whether `boundary` is a multiple of `resolution`.
#[inline]
pub const fn is_valid_boundary(boundary: i32, resolution: i32) -> bool {
    boundary % resolution == 0
}

/// Returns whether `boundary` lies in `[MIN_BOUNDARY, MAX_BOUNDARY]`.
#[inline]
pub const fn is_in_range(boundary: i32) -> bool {
    MIN_BOUNDARY <= boundary && boundary <= MAX_BOUNDARY
}

/// Returns whether `price_x96` lies in `[MIN_RATIO, MAX_RATIO]`.
#[inline]
pub fn is_price_x96_in_range(price_x96: U160) -> bool {
    // wraps below MIN_RATIO
    price_x96.wrapping_sub(MIN_RATIO) <= MAX_RATIO_MINUS_MIN_RATIO
}

/// Returns whether `boundary_lower` can hold orders: it is a multiple of `resolution` and the
/// whole bucket `[boundary_lower, boundary_lower + resolution]` is in range.
#[inline]
pub const fn is_valid_boundary_lower(boundary_lower: i32, resolution: i32) -> bool {
    is_valid_boundary(boundary_lower, resolution)
        && is_in_range(boundary_lower)
        && is_in_range(boundary_lower + resolution)
}

/// Rounds `boundary` down to a multiple of `resolution`, toward negative infinity.
///
/// ## Arguments
///
/// * `boundary`: the boundary to round
/// * `resolution`: the bucket width
///
/// returns: i32
#[inline]
pub fn get_boundary_lower_at_boundary(boundary: i32, resolution: i32) -> i32 {
    boundary.div_floor(&resolution) * resolution
}

/// Shifts a boundary lower by one `resolution` so that its bucket stays representable.
#[inline]
pub const fn rewrite_to_valid_boundary_lower(boundary_lower: i32, resolution: i32) -> i32 {
    if boundary_lower < MIN_BOUNDARY {
        boundary_lower + resolution
    } else if boundary_lower + resolution > MAX_BOUNDARY {
        boundary_lower - resolution
    } else {
        boundary_lower
    }
}

/// Returns the price as a Q64.96 for the given boundary, computed as 1.0001^boundary
///
/// ## Arguments
///
/// * `boundary`: the boundary for which to compute the price
///
/// ## Returns
///
/// The price as a Q64.96
pub fn get_price_x96_at_boundary(boundary: i32) -> Result<U160, Error> {
    if !is_in_range(boundary) {
        return Err(Error::BoundaryOutOfRange(boundary));
    }
    let abs_boundary = boundary.unsigned_abs();

    // Equivalent: ratio = 2**128 / 1.0001 if abs_boundary & 0x1 else 1 << 128
    let mut ratio = if abs_boundary & 0x1 != 0 {
        uint!(0xfff97272373d413259a46990580e213a_U256)
    } else {
        U256::from_limbs([0, 0, 1, 0])
    };

    // Iterate through 1th to 19th bit of abs_boundary because -MIN_BOUNDARY < 2**20
    // Equivalent to:
    // for i in 1..20 {
    //     if abs_boundary & (1 << i) != 0 {
    //         ratio = (ratio * ((1 << 128) / 1.0001.pow(1 << i))) >> 128;
    //     }
    // }
    if abs_boundary & 0x2 != 0 {
        ratio = (ratio * uint!(0xfff2e50f5f656932ef12357cf3c7fdcc_U256)) >> 128;
    }
    if abs_boundary & 0x4 != 0 {
        ratio = (ratio * uint!(0xffe5caca7e10e4e61c3624eaa0941cd0_U256)) >> 128;
    }
    if abs_boundary & 0x8 != 0 {
        ratio = (ratio * uint!(0xffcb9843d60f6159c9db58835c926644_U256)) >> 128;
    }
    if abs_boundary & 0x10 != 0 {
        ratio = (ratio * uint!(0xff973b41fa98c081472e6896dfb254c0_U256)) >> 128;
    }
    if abs_boundary & 0x20 != 0 {
        ratio = (ratio * uint!(0xff2ea16466c96a3843ec78b326b52861_U256)) >> 128;
    }
    if abs_boundary & 0x40 != 0 {
        ratio = (ratio * uint!(0xfe5dee046a99a2a811c461f1969c3053_U256)) >> 128;
    }
    if abs_boundary & 0x80 != 0 {
        ratio = (ratio * uint!(0xfcbe86c7900a88aedcffc83b479aa3a4_U256)) >> 128;
    }
    if abs_boundary & 0x100 != 0 {
        ratio = (ratio * uint!(0xf987a7253ac413176f2b074cf7815e54_U256)) >> 128;
    }
    if abs_boundary & 0x200 != 0 {
        ratio = (ratio * uint!(0xf3392b0822b70005940c7a398e4b70f3_U256)) >> 128;
    }
    if abs_boundary & 0x400 != 0 {
        ratio = (ratio * uint!(0xe7159475a2c29b7443b29c7fa6e889d9_U256)) >> 128;
    }
    if abs_boundary & 0x800 != 0 {
        ratio = (ratio * uint!(0xd097f3bdfd2022b8845ad8f792aa5825_U256)) >> 128;
    }
    if abs_boundary & 0x1000 != 0 {
        ratio = (ratio * uint!(0xa9f746462d870fdf8a65dc1f90e061e5_U256)) >> 128;
    }
    if abs_boundary & 0x2000 != 0 {
        ratio = (ratio * uint!(0x70d869a156d2a1b890bb3df62baf32f7_U256)) >> 128;
    }
    if abs_boundary & 0x4000 != 0 {
        ratio = (ratio * uint!(0x31be135f97d08fd981231505542fcfa6_U256)) >> 128;
    }
    if abs_boundary & 0x8000 != 0 {
        ratio = (ratio * uint!(0x9aa508b5b7a84e1c677de54f3e99bc9_U256)) >> 128;
    }
    if abs_boundary & 0x10000 != 0 {
        ratio = (ratio * uint!(0x5d6af8dedb81196699c329225ee604_U256)) >> 128;
    }
    if abs_boundary & 0x20000 != 0 {
        ratio = (ratio * uint!(0x2216e584f5fa1ea926041bedfe98_U256)) >> 128;
    }
    if abs_boundary & 0x40000 != 0 {
        ratio = (ratio * uint!(0x48a170391f7dc42444e8fa2_U256)) >> 128;
    }
    if abs_boundary & 0x80000 != 0 {
        ratio = (ratio * uint!(0x149b34ee7ac263_U256)) >> 128;
    }

    if boundary > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 to Q64.96, rounding up
    ratio = (ratio + uint!(0xffffffff_U256)) >> 32;
    Ok(U160::from(ratio))
}

/// Returns the boundary corresponding to a given price, s.t.
/// get_price_x96_at_boundary(boundary) <= price_x96 and
/// get_price_x96_at_boundary(boundary + 1) > price_x96
///
/// ## Arguments
///
/// * `price_x96`: the price as a Q64.96 for which to compute the boundary
///
/// ## Returns
///
/// The greatest boundary whose price does not exceed `price_x96`
pub fn get_boundary_at_price_x96(price_x96: U160) -> Result<i32, Error> {
    if !is_price_x96_in_range(price_x96) {
        return Err(Error::PriceOutOfRange(price_x96));
    }
    let price = U256::from(price_x96);

    // 160 > msb >= 19
    let msb = most_significant_bit(price) as usize;

    // the integer part of log_2(price) * 2**64, negative values in two's complement
    let mut log_2_x64: U256 = U256::from(msb).wrapping_sub(uint!(96_U256)) << 64;

    // the first 128 significant bits of the price, 2**128 > r >= 2**127
    let mut r = if msb >= 127 {
        price >> (msb - 127)
    } else {
        price << (127 - msb)
    };

    // Approximate the fractional part of log_2 to 14 binary digits
    let mut decimals = 0_u64;
    for bit in (50..64).rev() {
        let square = r * r;
        // f = (r**2 >= 2**255)
        let f = square.as_limbs()[3] >> 63;
        r = square >> (127 + f as usize);
        decimals |= f << bit;
    }
    log_2_x64 |= U256::from_limbs([decimals, 0, 0, 0]);

    // boundary = log_2(price) / log_2(1.0001)
    // 2**64 / log_2(1.0001) = 127869479499801913173570
    let log_10001 = log_2_x64.wrapping_mul(uint!(127869479499801913173570_U256));
    let boundary_low = (log_10001.wrapping_sub(uint!(1701496478404566209298070050330123605_U256))
        >> 128_usize)
        .as_limbs()[0] as i32;
    let boundary_high = (log_10001
        .wrapping_add(uint!(145669732385994811453513810576699044247_U256))
        >> 128_usize)
        .as_limbs()[0] as i32;

    if boundary_low == boundary_high || boundary_high > MAX_BOUNDARY {
        return Ok(boundary_low);
    }
    if get_price_x96_at_boundary(boundary_high)? <= price_x96 {
        Ok(boundary_high)
    } else {
        Ok(boundary_low)
    }
}
