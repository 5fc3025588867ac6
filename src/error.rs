#[cfg(doc)]
use crate::prelude::*;

use alloy_primitives::{Address, U160};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum Error {
    /// Thrown when the boundary passed to [`get_price_x96_at_boundary`] is not between
    /// [`MIN_BOUNDARY`] and [`MAX_BOUNDARY`].
    #[cfg_attr(feature = "std", error("Boundary out of range: {0}"))]
    BoundaryOutOfRange(i32),

    /// Thrown when a boundary lower is not a multiple of the resolution, or its bucket does not
    /// fit between [`MIN_BOUNDARY`] and [`MAX_BOUNDARY`].
    #[cfg_attr(feature = "std", error("Invalid boundary: {0}"))]
    InvalidBoundary(i32),

    /// Thrown when the price passed to [`get_boundary_at_price_x96`] is not between
    /// [`MIN_RATIO`] and [`MAX_RATIO`].
    #[cfg_attr(feature = "std", error("Price out of range: {0}"))]
    PriceOutOfRange(U160),

    #[cfg_attr(feature = "std", error("Price limit out of range: {0}"))]
    PriceLimitOutOfRange(U160),

    #[cfg_attr(feature = "std", error("Invalid price"))]
    InvalidPrice,

    #[cfg_attr(feature = "std", error("Invalid resolution: {0}"))]
    InvalidResolution(i32),

    #[cfg_attr(feature = "std", error("Amount is zero"))]
    ZeroAmount,

    #[cfg_attr(feature = "std", error("Grid is not initialized"))]
    Uninitialized,

    #[cfg_attr(feature = "std", error("Grid is already initialized"))]
    AlreadyInitialized,

    /// Thrown when one of the seed order lists passed to [`Grid::initialize`] is empty.
    #[cfg_attr(feature = "std", error("Seed orders are empty"))]
    OrdersEmpty,

    #[cfg_attr(feature = "std", error("Caller {0} is not the order owner"))]
    Unauthorized(Address),

    /// Thrown when an order does not exist or has already been settled.
    #[cfg_attr(feature = "std", error("Order not found: {0}"))]
    OrderNotFound(u64),

    #[cfg_attr(feature = "std", error("Bundle not found: {0}"))]
    BundleNotFound(u64),

    #[cfg_attr(feature = "std", error("Overflow in full math mulDiv"))]
    MulDivOverflow,

    #[cfg_attr(feature = "std", error("Overflow when casting to u128"))]
    SafeCastToU128Overflow,

    #[cfg_attr(feature = "std", error("Overflow when casting to U160"))]
    SafeCastToU160Overflow,

    #[cfg_attr(feature = "std", error("Overflow when adding maker amount"))]
    MakerAmountOverflow,

    #[cfg_attr(feature = "std", error("Overflow when adding taker amount"))]
    TakerAmountOverflow,

    #[cfg_attr(feature = "std", error("Underflow when removing bundle amount"))]
    BundleAmountUnderflow,

    /// Thrown when a swap callback or a flash callback does not pay back what is owed.
    #[cfg_attr(feature = "std", error("Insufficient payment of token {0}"))]
    InsufficientPayment(Address),

    #[cfg_attr(feature = "std", error("Insufficient balance of token {token} for {account}"))]
    InsufficientBalance { token: Address, account: Address },

    #[cfg_attr(feature = "std", error("Tokens are identical"))]
    IdenticalTokens,

    #[cfg_attr(feature = "std", error("Resolution is zero"))]
    ResolutionZero,

    #[cfg_attr(feature = "std", error("Resolution already enabled: {0}"))]
    ResolutionAlreadyEnabled(i32),

    #[cfg_attr(feature = "std", error("Resolution not enabled: {0}"))]
    ResolutionNotEnabled(i32),

    #[cfg_attr(feature = "std", error("Taker fee must be positive"))]
    TakerFeeZero,

    #[cfg_attr(feature = "std", error("Taker fee too large: {0}"))]
    TakerFeeTooLarge(i32),

    #[cfg_attr(feature = "std", error("Invalid maker fee: {0}"))]
    InvalidMakerFee(i32),

    #[cfg_attr(feature = "std", error("Grid {0} is not registered with the oracle"))]
    OracleNotRegistered(Address),

    /// Thrown when the observation requested from the oracle is older than the oldest one kept.
    #[cfg_attr(feature = "std", error("Target timestamp is too old"))]
    OracleTargetTooOld,
}
