use alloy_primitives::{keccak256, Address};

/// Computes the address identifying a grid, as the trailing 20 bytes of
/// `keccak256(token0 ++ token1 ++ resolution)`.
///
/// ## Arguments
///
/// * `token_a`: The first token of the pair, irrespective of sort order
/// * `token_b`: The second token of the pair, irrespective of sort order
/// * `resolution`: The resolution of the grid
#[inline]
#[must_use]
pub fn compute_grid_address(token_a: Address, token_b: Address, resolution: i32) -> Address {
    let (token0, token1) = if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    let mut preimage = [0_u8; 44];
    preimage[..20].copy_from_slice(token0.as_slice());
    preimage[20..40].copy_from_slice(token1.as_slice());
    preimage[40..].copy_from_slice(&resolution.to_be_bytes());
    Address::from_slice(&keccak256(preimage)[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn independent_of_token_order() {
        assert_eq!(
            compute_grid_address(TOKEN0, TOKEN1, 5),
            compute_grid_address(TOKEN1, TOKEN0, 5)
        );
    }

    #[test]
    fn distinct_per_resolution() {
        assert_ne!(
            compute_grid_address(TOKEN0, TOKEN1, 1),
            compute_grid_address(TOKEN0, TOKEN1, 5)
        );
        assert_ne!(
            compute_grid_address(TOKEN0, TOKEN1, 5),
            Address::ZERO
        );
    }
}
