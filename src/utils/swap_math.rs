//! ## Swap Math
//!
//! A bucket of resting orders is traded linearly: filling `x` out of `liquidity` moves the price
//! `x / liquidity` of the way from the start of the bucket to its far edge. Input amounts follow
//! from the average of the start and end prices of the fill.

use super::{
    div_rounding_u512, mul_div, mul_div_rounding_up, narrow_u512, sqrt_rounding_up_u512,
    to_u128, to_u160, Rounding,
};
use crate::prelude::*;
use alloy_primitives::{I256, U160, U256, U512};

/// Computes the result of swapping some amount in, or amount out, against one bucket
///
/// The fee, plus the amount in, will never exceed the amount remaining if the swap's
/// `amount_remaining` is negative (exact input)
///
/// ## Arguments
///
/// * `price_current_x96`: The current price of the grid
/// * `price_boundary_x96`: The far edge of the bucket, from which the direction of the swap is
///   inferred
/// * `price_limit_x96`: The price that cannot be crossed
/// * `amount_remaining`: How much input (negative) or output (positive) is remaining to be
///   swapped
/// * `liquidity`: The maker amount between `price_current_x96` and `price_boundary_x96`
/// * `fee_pips`: The taker fee rate in parts per million
///
/// ## Returns
///
/// * `price_next_x96`: The price after swapping the amount in/out, not to exceed the price limit
/// * `amount_in`: The amount to be swapped in, of either token0 or token1, based on the direction
///   of the swap
/// * `amount_out`: The amount to be received, of either token0 or token1, based on the direction
///   of the swap
/// * `fee_amount`: The amount of input that will be taken as a fee
pub fn compute_swap_step(
    price_current_x96: U160,
    price_boundary_x96: U160,
    price_limit_x96: U160,
    amount_remaining: I256,
    liquidity: u128,
    fee_pips: i32,
) -> Result<(U160, u128, u128, u128), Error> {
    if price_boundary_x96 == price_current_x96 {
        return Ok((price_current_x96, 0, 0, 0));
    }
    let fee_pips = U256::from(fee_pips.clamp(0, FEE_DENOMINATOR as i32 - 1) as u32);
    let fee_complement = U256::from(FEE_DENOMINATOR) - fee_pips;
    let zero_for_one = price_boundary_x96 < price_current_x96;
    let exact_in = amount_remaining.is_negative();

    let price_current = U256::from(price_current_x96);
    let liquidity = U256::from(liquidity);
    let delta = abs_diff(price_current, U256::from(price_boundary_x96));

    // stop at the limit when it lies inside the bucket
    let limited = if zero_for_one {
        price_limit_x96 > price_boundary_x96
    } else {
        price_limit_x96 < price_boundary_x96
    };
    let (price_target, max_out) = if limited {
        let distance = abs_diff(price_current, U256::from(price_limit_x96));
        (U256::from(price_limit_x96), mul_div(liquidity, distance, delta)?)
    } else {
        (U256::from(price_boundary_x96), liquidity)
    };

    let amount_remaining_abs = amount_remaining.unsigned_abs();
    let (price_next, amount_in, amount_out, fee_amount) = if exact_in {
        let amount_remaining_less_fee =
            mul_div(amount_remaining_abs, fee_complement, U256::from(FEE_DENOMINATOR))?;
        let amount_in_full = get_amount_in(max_out, price_current, price_target, zero_for_one)?;
        if amount_remaining_less_fee >= amount_in_full {
            let fee_amount = mul_div_rounding_up(amount_in_full, fee_pips, fee_complement)?;
            (price_target, amount_in_full, max_out, fee_amount)
        } else {
            let amount_in = amount_remaining_less_fee;
            let amount_out =
                get_amount_out(amount_in, price_current, delta, liquidity, zero_for_one)?
                    .min(max_out);
            let price_next = if amount_out == max_out {
                price_target
            } else {
                get_next_price(price_current, delta, liquidity, amount_out, zero_for_one)?
            };
            // the remainder of the budget is taken as fee
            (price_next, amount_in, amount_out, amount_remaining_abs - amount_in)
        }
    } else {
        let (amount_out, price_next) = if amount_remaining_abs >= max_out {
            (max_out, price_target)
        } else {
            let price_next = get_next_price(
                price_current,
                delta,
                liquidity,
                amount_remaining_abs,
                zero_for_one,
            )?;
            (amount_remaining_abs, price_next)
        };
        let amount_in = get_amount_in(amount_out, price_current, price_next, zero_for_one)?;
        let fee_amount = mul_div_rounding_up(amount_in, fee_pips, fee_complement)?;
        (price_next, amount_in, amount_out, fee_amount)
    };

    Ok((
        to_u160(price_next)?,
        to_u128(amount_in)?,
        to_u128(amount_out)?,
        to_u128(fee_amount)?,
    ))
}

#[inline]
fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// Moves the price from `price_current` by `amount_out / liquidity` of `delta`, rounding away
/// from the current price.
#[inline]
pub fn get_next_price(
    price_current: U256,
    delta: U256,
    liquidity: U256,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    let moved = mul_div_rounding_up(delta, amount_out, liquidity)?;
    if zero_for_one {
        Ok(price_current.saturating_sub(moved))
    } else {
        Ok(price_current + moved)
    }
}

/// Returns the input needed to receive `amount_out` while the price moves from `price_current`
/// to `price_next`, rounded up.
///
/// Token0 is paid at the average price when the price falls, token1 at the average price when it
/// rises.
#[inline]
pub fn get_amount_in(
    amount_out: U256,
    price_current: U256,
    price_next: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    let price_sum = price_current + price_next;
    if zero_for_one {
        mul_div_rounding_up(amount_out, Q97, price_sum)
    } else {
        mul_div_rounding_up(amount_out, price_sum, Q97)
    }
}

/// Returns the output received for `amount_in` entering the bucket at `price_current`, rounded
/// down.
///
/// Solves `amount_in = amount_out * avg_price` with the end price moving linearly in
/// `amount_out`. When the price falls this is a linear equation; when it rises the quadratic is
/// solved with a square root rounded up.
pub fn get_amount_out(
    amount_in: U256,
    price_current: U256,
    delta: U256,
    liquidity: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    if liquidity.is_zero() {
        return Ok(U256::ZERO);
    }
    let amount_in = U512::from(amount_in);
    let price_current = U512::from(price_current);
    let delta = U512::from(delta);
    let liquidity = U512::from(liquidity);
    let q97 = U512::from(Q97);

    let amount_out = if zero_for_one {
        // out = 2 * in * P * L / (2**97 * L + in * D)
        let numerator = (amount_in * price_current * liquidity) << 1;
        let denominator = q97 * liquidity + amount_in * delta;
        div_rounding_u512(numerator, denominator, Rounding::Down)?
    } else {
        // out = 2**97 * in / (P + sqrt(P**2 + 2**97 * D * in / L))
        let discriminant = price_current * price_current
            + div_rounding_u512(q97 * delta * amount_in, liquidity, Rounding::Up)?;
        let denominator = price_current + sqrt_rounding_up_u512(discriminant);
        div_rounding_u512(q97 * amount_in, denominator, Rounding::Down)?
    };
    narrow_u512(amount_out)
}
