//! # gridex-engine
//!
//! The state engine of a grid order book trading pair.
//!
//! ## Features
//!
//! - Makers rest orders in buckets of `resolution` boundaries, where the price of boundary `b` is
//!   `1.0001^b` as a Q64.96
//! - Orders at the same bucket share a [`Bundle`](entities::Bundle) that is filled and settled pro
//!   rata
//! - Takers swap through a step-wise loop that walks a per side
//!   [`BoundaryBitmap`](utils::BoundaryBitmap) of initialized buckets
//! - Every entry point is staged in a [`Transaction`](entities::Transaction) and committed only
//!   once payments are verified
//! - A ring buffer [`ObservationLog`](oracle::ObservationLog) of cumulative boundaries
//! - Extensive unit tests and benchmarks

pub mod config;
pub mod constants;
pub mod entities;
pub mod error;
pub mod oracle;
pub mod payments;
pub mod utils;


pub mod prelude {
    pub use crate::{
        config::*, constants::*, entities::*, error::*, oracle::*, payments::*, utils::*,
    };

    pub(crate) use crate::entities::side;
}
