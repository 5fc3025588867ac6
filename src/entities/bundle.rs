use crate::prelude::*;
use alloy_primitives::U256;

/// The pooled maker liquidity of one side at one boundary lower. Every order placed while the
/// bundle is open owns `amount / maker_amount_total` of it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bundle {
    pub boundary_lower: i32,
    /// Whether the makers provide token0
    pub zero: bool,
    pub maker_amount_total: u128,
    pub maker_amount_remaining: u128,
    pub taker_amount_remaining: u128,
    pub taker_fee_amount_remaining: u128,
}

/// The part of a taker fill a bundle absorbed, and the part left for the next bundle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TakerFill {
    pub amount_in_used: u128,
    pub amount_in_remaining: u128,
    pub amount_out_used: u128,
    pub amount_out_remaining: u128,
    pub taker_fee_for_maker_amount_used: u128,
    pub taker_fee_for_maker_amount_remaining: u128,
}

/// The amounts released by [`Bundle::remove_liquidity`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiquidityRemoval {
    /// The unfilled maker principal returned, in the bundle's token
    pub maker_amount_out: u128,
    /// The taker payment, in the other token
    pub taker_amount_out: u128,
    /// The maker share of taker fees, in the other token
    pub taker_fee_amount_out: u128,
}

impl Bundle {
    #[inline]
    pub const fn new(boundary_lower: i32, zero: bool) -> Self {
        Self {
            boundary_lower,
            zero,
            maker_amount_total: 0,
            maker_amount_remaining: 0,
            taker_amount_remaining: 0,
            taker_fee_amount_remaining: 0,
        }
    }

    /// Whether no taker has filled any of the bundle yet, so a new maker can join it without
    /// sharing in earlier taker payments.
    #[inline]
    pub const fn is_unfilled(&self) -> bool {
        self.maker_amount_remaining == self.maker_amount_total
            && self.taker_amount_remaining == 0
            && self.taker_fee_amount_remaining == 0
    }

    /// Adds maker liquidity to the bundle.
    #[inline]
    pub fn add_liquidity(&mut self, amount: u128) -> Result<(), Error> {
        let total = self
            .maker_amount_total
            .checked_add(amount)
            .ok_or(Error::MakerAmountOverflow)?;
        let remaining = self
            .maker_amount_remaining
            .checked_add(amount)
            .ok_or(Error::MakerAmountOverflow)?;
        self.maker_amount_total = total;
        self.maker_amount_remaining = remaining;
        Ok(())
    }

    /// Removes `amount` of maker liquidity and releases its pro-rata share of the unfilled
    /// principal, the taker payments and the taker fees. Shares round down, so the last order of
    /// a partially filled bundle may leave dust behind.
    ///
    /// ## Arguments
    ///
    /// * `amount`: the amount of the order being settled
    pub fn remove_liquidity(&mut self, amount: u128) -> Result<LiquidityRemoval, Error> {
        if amount > self.maker_amount_total {
            return Err(Error::BundleAmountUnderflow);
        }
        let amount_x = U256::from(amount);
        let total = U256::from(self.maker_amount_total);
        let share = |value: u128| -> Result<u128, Error> {
            to_u128(mul_div(amount_x, U256::from(value), total)?)
        };
        let removal = LiquidityRemoval {
            maker_amount_out: share(self.maker_amount_remaining)?,
            taker_amount_out: share(self.taker_amount_remaining)?,
            taker_fee_amount_out: share(self.taker_fee_amount_remaining)?,
        };

        self.maker_amount_total -= amount;
        self.maker_amount_remaining -= removal.maker_amount_out;
        self.taker_amount_remaining -= removal.taker_amount_out;
        self.taker_fee_amount_remaining -= removal.taker_fee_amount_out;
        Ok(removal)
    }

    /// Fills the bundle with a taker step. When `amount_out` exceeds what the bundle has left,
    /// only the corresponding fraction of the input and the fee is attributed to the bundle and
    /// the rest is handed back.
    ///
    /// ## Arguments
    ///
    /// * `amount_in`: the taker input of the step, excluding fees
    /// * `amount_out`: the maker output of the step
    /// * `taker_fee_for_maker_amount`: the part of the taker fee credited to makers
    pub fn update_for_taker(
        &mut self,
        amount_in: u128,
        amount_out: u128,
        taker_fee_for_maker_amount: u128,
    ) -> Result<TakerFill, Error> {
        let fill = if amount_out <= self.maker_amount_remaining {
            TakerFill {
                amount_in_used: amount_in,
                amount_out_used: amount_out,
                taker_fee_for_maker_amount_used: taker_fee_for_maker_amount,
                ..Default::default()
            }
        } else {
            let amount_out_used = self.maker_amount_remaining;
            let used = |value: u128| -> Result<u128, Error> {
                to_u128(mul_div(
                    U256::from(value),
                    U256::from(amount_out_used),
                    U256::from(amount_out),
                )?)
            };
            let amount_in_used = used(amount_in)?;
            let taker_fee_for_maker_amount_used = used(taker_fee_for_maker_amount)?;
            TakerFill {
                amount_in_used,
                amount_in_remaining: amount_in - amount_in_used,
                amount_out_used,
                amount_out_remaining: amount_out - amount_out_used,
                taker_fee_for_maker_amount_used,
                taker_fee_for_maker_amount_remaining: taker_fee_for_maker_amount
                    - taker_fee_for_maker_amount_used,
            }
        };

        let taker_amount_remaining = self
            .taker_amount_remaining
            .checked_add(fill.amount_in_used)
            .ok_or(Error::TakerAmountOverflow)?;
        let taker_fee_amount_remaining = self
            .taker_fee_amount_remaining
            .checked_add(fill.taker_fee_for_maker_amount_used)
            .ok_or(Error::TakerAmountOverflow)?;
        self.maker_amount_remaining -= fill.amount_out_used;
        self.taker_amount_remaining = taker_amount_remaining;
        self.taker_fee_amount_remaining = taker_fee_amount_remaining;
        Ok(fill)
    }
}
