//! ## Trading Config
//! The registry of resolutions grids can be created with, and the fee pair charged by each.

use crate::prelude::*;
use alloy_primitives::map::rustc_hash::FxHashMap;

/// The taker and maker fee rates of a resolution, in parts per million.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolutionFees {
    pub taker_fee: i32,
    pub maker_fee: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradingConfig {
    resolutions: FxHashMap<i32, ResolutionFees>,
}

impl Default for TradingConfig {
    /// Enables [`Resolution::LOW`], [`Resolution::MEDIUM`] and [`Resolution::HIGH`] with their
    /// default fees.
    fn default() -> Self {
        let resolutions = [Resolution::LOW, Resolution::MEDIUM, Resolution::HIGH]
            .into_iter()
            .map(|resolution| {
                (
                    resolution.as_i32(),
                    ResolutionFees {
                        taker_fee: resolution.taker_fee(),
                        maker_fee: resolution.maker_fee(),
                    },
                )
            })
            .collect();
        Self { resolutions }
    }
}

impl TradingConfig {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables a new resolution.
    ///
    /// ## Arguments
    ///
    /// * `resolution`: the bucket width, must be positive
    /// * `taker_fee`: the taker fee rate in parts per million
    /// * `maker_fee`: the maker fee rate in parts per million, zero or a negative rebate no
    ///   larger than the taker fee
    pub fn enable_resolution(
        &mut self,
        resolution: i32,
        taker_fee: i32,
        maker_fee: i32,
    ) -> Result<(), Error> {
        if resolution <= 0 {
            return Err(Error::ResolutionZero);
        }
        if self.resolutions.contains_key(&resolution) {
            return Err(Error::ResolutionAlreadyEnabled(resolution));
        }
        validate_fees(taker_fee, maker_fee)?;
        self.resolutions.insert(
            resolution,
            ResolutionFees {
                taker_fee,
                maker_fee,
            },
        );
        Ok(())
    }

    /// Changes the fees of an enabled resolution. Existing grids keep the fees they were
    /// created with.
    pub fn update_resolution(
        &mut self,
        resolution: i32,
        taker_fee: i32,
        maker_fee: i32,
    ) -> Result<(), Error> {
        validate_fees(taker_fee, maker_fee)?;
        let fees = self
            .resolutions
            .get_mut(&resolution)
            .ok_or(Error::ResolutionNotEnabled(resolution))?;
        *fees = ResolutionFees {
            taker_fee,
            maker_fee,
        };
        Ok(())
    }

    #[inline]
    pub fn fees(&self, resolution: i32) -> Option<ResolutionFees> {
        self.resolutions.get(&resolution).copied()
    }
}

#[inline]
fn validate_fees(taker_fee: i32, maker_fee: i32) -> Result<(), Error> {
    if taker_fee <= 0 {
        return Err(Error::TakerFeeZero);
    }
    if taker_fee > MAX_TAKER_FEE {
        return Err(Error::TakerFeeTooLarge(taker_fee));
    }
    if maker_fee > 0 || maker_fee.unsigned_abs() > taker_fee as u32 {
        return Err(Error::InvalidMakerFee(maker_fee));
    }
    Ok(())
}
