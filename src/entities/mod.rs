pub mod boundary;
pub mod bundle;
pub mod grid;
pub mod order;
pub mod transaction;

pub use boundary::Boundary;
pub use bundle::{Bundle, LiquidityRemoval, TakerFill};
pub use grid::{Context, Grid, SwapOutcome};
pub use order::{MakerOrderParameters, Order};
pub use transaction::{Changes, GridState, Slot0, StagedBitmap, Transaction};

pub(crate) use transaction::side;
