/// The resting liquidity of one side at one boundary lower.
///
/// `bundle0` is the bundle being filled by takers. `bundle1` is opened when a maker joins the
/// boundary after `bundle0` has been partially filled, and takes over once `bundle0` drains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub bundle0_id: Option<u64>,
    pub bundle1_id: Option<u64>,
    /// The maker amount remaining across both bundles
    pub maker_amount_remaining: u128,
}

impl Boundary {
    /// Whether the boundary holds no resting liquidity and belongs in no bitmap.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.maker_amount_remaining == 0
    }

    /// Moves `bundle1` into the `bundle0` slot.
    #[inline]
    pub fn promote(&mut self) {
        self.bundle0_id = self.bundle1_id.take();
    }
}
