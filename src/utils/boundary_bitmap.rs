//! ## Boundary Bitmap
//! The [`BoundaryBitmapProvider`] trait provides
//! [`BoundaryBitmapProvider::next_initialized_boundary_within_one_word`] and the cross-word
//! [`BoundaryBitmapProvider::next_initialized_boundary`] for any bitmap that implements
//! [`BoundaryBitmapProvider::get_word`]. Bit `i` of word `w` stands for the bucket whose lower
//! boundary is `(w * 256 + i) * resolution`.

use super::{get_price_x96_at_boundary, least_significant_bit, most_significant_bit};
use crate::prelude::*;
use alloy_primitives::{map::rustc_hash::FxHashMap, U160, U256};
use num_integer::Integer;

pub type BoundaryBitmap = FxHashMap<i16, U256>;

/// Computes the position in the bitmap where the bucket of `boundary` lives.
///
/// ## Arguments
///
/// * `boundary`: the boundary for which to compute the position
/// * `resolution`: the bucket width of the grid
///
/// ## Returns
///
/// * `word_pos`: the key of the word containing the bit
/// * `bit_pos`: the bit position in the word
#[inline]
pub fn position(boundary: i32, resolution: i32) -> (i16, u8) {
    compressed_position(boundary.div_floor(&resolution))
}

#[inline]
const fn compressed_position(compressed: i32) -> (i16, u8) {
    ((compressed >> 8) as i16, (compressed & 0xff) as u8)
}

/// Provides boundary searches for a bitmap that implements [`Self::get_word`]
pub trait BoundaryBitmapProvider {
    /// Get a bitmap word at a specific position, zero if never written
    fn get_word(&self, word_pos: i16) -> U256;

    /// Returns the next initialized bucket contained in the same word as the bucket that is
    /// either strictly below `boundary` (`lte`) or strictly above the bucket of `boundary`.
    ///
    /// ## Arguments
    ///
    /// * `boundary`: the starting boundary
    /// * `resolution`: the bucket width of the grid
    /// * `lte`: whether to search for the next initialized bucket to the left (less than or
    ///   equal to the starting boundary)
    ///
    /// ## Returns
    ///
    /// The lower boundary of the next bucket, or the edge of the word when none is initialized,
    /// and whether that bucket is initialized
    #[inline]
    fn next_initialized_boundary_within_one_word(
        &self,
        boundary: i32,
        resolution: i32,
        lte: bool,
    ) -> (i32, bool) {
        if lte {
            // buckets whose lower boundary is strictly below `boundary`
            let (word_pos, bit_pos) = compressed_position((boundary - 1).div_floor(&resolution));
            // all the 1s at or to the right of `bit_pos`
            let mask = U256::MAX >> (255 - bit_pos as usize);
            let masked = self.get_word(word_pos) & mask;
            let initialized = !masked.is_zero();
            let bit = if initialized {
                most_significant_bit(masked) as i32
            } else {
                0
            };
            (((word_pos as i32) * 256 + bit) * resolution, initialized)
        } else {
            // start from the bucket after the current one, its state does not matter
            let (word_pos, bit_pos) =
                compressed_position(boundary.div_floor(&resolution) + 1);
            // all the 1s at or to the left of `bit_pos`
            let mask = U256::MAX << bit_pos as usize;
            let masked = self.get_word(word_pos) & mask;
            let initialized = !masked.is_zero();
            let bit = if initialized {
                least_significant_bit(masked) as i32
            } else {
                255
            };
            (((word_pos as i32) * 256 + bit) * resolution, initialized)
        }
    }

    /// Searches word by word for the next initialized bucket in the swap direction.
    ///
    /// When the bucket at `boundary_lower` is initialized and the price has not yet crossed it,
    /// that bucket is returned. Otherwise the search stops at the first initialized bucket or at
    /// the first word edge beyond [`MIN_BOUNDARY`] or [`MAX_BOUNDARY`], which is returned with
    /// `initialized = false`.
    ///
    /// ## Arguments
    ///
    /// * `boundary`: the current boundary
    /// * `price_x96`: the current price
    /// * `current_initialized`: whether the bucket at `boundary_lower` is initialized
    /// * `boundary_lower`: the lower boundary of the current bucket
    /// * `resolution`: the bucket width of the grid
    /// * `lte`: whether the price is falling
    fn next_initialized_boundary(
        &self,
        boundary: i32,
        price_x96: U160,
        current_initialized: bool,
        boundary_lower: i32,
        resolution: i32,
        lte: bool,
    ) -> Result<(i32, bool), Error> {
        if current_initialized {
            if lte {
                if price_x96 > get_price_x96_at_boundary(boundary_lower)? {
                    return Ok((boundary_lower, true));
                }
            } else if price_x96 < get_price_x96_at_boundary(boundary_lower + resolution)? {
                return Ok((boundary_lower, true));
            }
        }

        let mut cursor = if lte { boundary } else { boundary_lower };
        loop {
            let (next, initialized) =
                self.next_initialized_boundary_within_one_word(cursor, resolution, lte);
            if initialized || (lte && next <= MIN_BOUNDARY) || (!lte && next >= MAX_BOUNDARY) {
                return Ok((next, initialized));
            }
            cursor = next;
        }
    }
}

/// Writes words of a bitmap
pub trait BoundaryBitmapWriter: BoundaryBitmapProvider {
    fn set_word(&mut self, word_pos: i16, word: U256);

    /// Flips the initialized state of the bucket at `boundary` from false to true, or vice versa.
    #[inline]
    fn flip_boundary(&mut self, boundary: i32, resolution: i32) {
        debug_assert!(boundary % resolution == 0);
        let (word_pos, bit_pos) = position(boundary, resolution);
        let word = self.get_word(word_pos) ^ (U256::from(1) << bit_pos as usize);
        self.set_word(word_pos, word);
    }
}

impl BoundaryBitmapProvider for BoundaryBitmap {
    #[inline]
    fn get_word(&self, word_pos: i16) -> U256 {
        self.get(&word_pos).copied().unwrap_or(U256::ZERO)
    }
}

impl BoundaryBitmapWriter for BoundaryBitmap {
    #[inline]
    fn set_word(&mut self, word_pos: i16, word: U256) {
        if word.is_zero() {
            self.remove(&word_pos);
        } else {
            self.insert(word_pos, word);
        }
    }
}
