use alloy_primitives::Address;
use derive_more::From;

/// A maker's claim on `amount / maker_amount_total` of a bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Order {
    pub owner: Address,
    pub bundle_id: u64,
    pub amount: u128,
}

/// The parameters of a maker order to place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, From)]
pub struct MakerOrderParameters {
    pub boundary_lower: i32,
    pub amount: u128,
}

impl MakerOrderParameters {
    #[inline]
    pub const fn new(boundary_lower: i32, amount: u128) -> Self {
        Self {
            boundary_lower,
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_from_tuple() {
        let parameters: MakerOrderParameters = (-5, 100).into();
        assert_eq!(parameters, MakerOrderParameters::new(-5, 100));
    }
}
