mod bit_math;
pub use bit_math::*;

mod full_math;
pub use full_math::*;

mod boundary_math;
pub use boundary_math::*;

mod boundary_bitmap;
pub use boundary_bitmap::*;

mod compute_grid_address;
pub use compute_grid_address::compute_grid_address;

mod fee_math;
pub use fee_math::compute_fees;

mod swap_math;
pub use swap_math::*;
