use super::mul_div;
use crate::prelude::*;
use alloy_primitives::U256;

/// Splits a taker fee between the makers that were filled and the protocol.
///
/// The makers receive `taker_fee_amount * |maker_fee_pips| / taker_fee_pips`, rounded down, and
/// the protocol keeps the rest.
///
/// ## Arguments
///
/// * `taker_fee_amount`: the fee paid by the taker
/// * `taker_fee_pips`: the taker fee rate in parts per million
/// * `maker_fee_pips`: the maker fee rate in parts per million, zero or negative
///
/// ## Returns
///
/// * `for_maker`: the part of the fee credited to makers
/// * `for_protocol`: the part of the fee kept by the protocol
#[inline]
pub fn compute_fees(
    taker_fee_amount: u128,
    taker_fee_pips: i32,
    maker_fee_pips: i32,
) -> Result<(u128, u128), Error> {
    if taker_fee_pips <= 0 {
        return Ok((0, taker_fee_amount));
    }
    let for_maker = mul_div(
        U256::from(taker_fee_amount),
        U256::from(maker_fee_pips.unsigned_abs()),
        U256::from(taker_fee_pips as u32),
    )?;
    let for_maker = to_u128(for_maker)?.min(taker_fee_amount);
    Ok((for_maker, taker_fee_amount - for_maker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_fee_between_maker_and_protocol() {
        assert_eq!(compute_fees(1000, 10000, -10000).unwrap(), (1000, 0));
        assert_eq!(compute_fees(1000, 10000, -4999).unwrap(), (499, 501));
        assert_eq!(compute_fees(1000, 10000, 0).unwrap(), (0, 1000));
    }

    #[test]
    fn zero_taker_fee_goes_to_protocol() {
        assert_eq!(compute_fees(0, 0, 0).unwrap(), (0, 0));
        assert_eq!(compute_fees(7, 0, 0).unwrap(), (0, 7));
    }

    #[test]
    fn split_is_conservative() {
        for resolution in [Resolution::LOW, Resolution::MEDIUM, Resolution::HIGH] {
            for amount in [0, 1, 99, 12345, u64::MAX as u128, u128::MAX] {
                let (for_maker, for_protocol) =
                    compute_fees(amount, resolution.taker_fee(), resolution.maker_fee()).unwrap();
                assert_eq!(for_maker + for_protocol, amount);
                assert!(for_maker <= amount);
            }
        }
    }

    #[test]
    fn default_resolution_split() {
        // 1504 * 2400 / 3000 = 1203.2
        assert_eq!(
            compute_fees(
                1504,
                Resolution::HIGH.taker_fee(),
                Resolution::HIGH.maker_fee()
            )
            .unwrap(),
            (1203, 301)
        );
    }
}
