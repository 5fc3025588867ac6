//! ## Staged State
//! Every mutating entry point of [`Grid`] works on a [`Transaction`] layered over the committed
//! [`GridState`]. Reads fall through to the committed state, writes are kept in the transaction,
//! and nothing becomes visible until [`GridState::commit`] applies the [`Changes`].

use crate::prelude::*;
use alloy_primitives::{map::rustc_hash::FxHashMap, Address, U160, U256};
use core::hash::Hash;

/// The current price of a grid and the boundary at that price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Slot0 {
    pub price_x96: U160,
    pub boundary: i32,
}

/// The committed state of one grid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridState {
    pub(crate) slot0: Option<Slot0>,
    pub(crate) bundles: FxHashMap<u64, Bundle>,
    /// Boundary records of token0 makers and token1 makers
    pub(crate) boundaries: [FxHashMap<i32, Boundary>; 2],
    pub(crate) bitmaps: [BoundaryBitmap; 2],
    pub(crate) orders: FxHashMap<u64, Order>,
    pub(crate) tokens_owed: FxHashMap<Address, (u128, u128)>,
    pub(crate) protocol_fees: (u128, u128),
    pub(crate) next_bundle_id: u64,
    pub(crate) next_order_id: u64,
}

/// Maps a maker side to its index in [`GridState::boundaries`] and [`GridState::bitmaps`].
#[inline]
pub(crate) const fn side(zero: bool) -> usize {
    !zero as usize
}

/// Writes to a map, where `None` deletes the key.
#[derive(Clone, Debug)]
struct Staged<K, V> {
    writes: FxHashMap<K, Option<V>>,
}

impl<K, V> Default for Staged<K, V> {
    fn default() -> Self {
        Self {
            writes: FxHashMap::default(),
        }
    }
}

impl<K: Copy + Eq + Hash, V: Copy> Staged<K, V> {
    #[inline]
    fn get(&self, committed: &FxHashMap<K, V>, key: K) -> Option<V> {
        match self.writes.get(&key) {
            Some(staged) => *staged,
            None => committed.get(&key).copied(),
        }
    }

    #[inline]
    fn insert(&mut self, key: K, value: V) {
        self.writes.insert(key, Some(value));
    }

    #[inline]
    fn remove(&mut self, key: K) {
        self.writes.insert(key, None);
    }

    fn apply(self, committed: &mut FxHashMap<K, V>) {
        for (key, value) in self.writes {
            match value {
                Some(value) => committed.insert(key, value),
                None => committed.remove(&key),
            };
        }
    }
}

/// The writes of a [`Transaction`], detached from the state they were staged against.
#[derive(Clone, Debug, Default)]
pub struct Changes {
    slot0: Option<Slot0>,
    bundles: Staged<u64, Bundle>,
    boundaries: [Staged<i32, Boundary>; 2],
    words: [Staged<i16, U256>; 2],
    orders: Staged<u64, Order>,
    tokens_owed: Staged<Address, (u128, u128)>,
    protocol_fees: Option<(u128, u128)>,
    next_bundle_id: Option<u64>,
    next_order_id: Option<u64>,
}

impl GridState {
    /// Applies the changes of a finished transaction.
    pub fn commit(&mut self, changes: Changes) {
        if let Some(slot0) = changes.slot0 {
            self.slot0 = Some(slot0);
        }
        changes.bundles.apply(&mut self.bundles);
        let [boundaries0, boundaries1] = changes.boundaries;
        boundaries0.apply(&mut self.boundaries[0]);
        boundaries1.apply(&mut self.boundaries[1]);
        let [words0, words1] = changes.words;
        words0.apply(&mut self.bitmaps[0]);
        words1.apply(&mut self.bitmaps[1]);
        changes.orders.apply(&mut self.orders);
        changes.tokens_owed.apply(&mut self.tokens_owed);
        if let Some(protocol_fees) = changes.protocol_fees {
            self.protocol_fees = protocol_fees;
        }
        if let Some(next_bundle_id) = changes.next_bundle_id {
            self.next_bundle_id = next_bundle_id;
        }
        if let Some(next_order_id) = changes.next_order_id {
            self.next_order_id = next_order_id;
        }
    }
}

/// A bitmap of one side as seen from inside a transaction.
pub struct StagedBitmap<'a> {
    committed: &'a BoundaryBitmap,
    words: &'a mut Staged<i16, U256>,
}

impl BoundaryBitmapProvider for StagedBitmap<'_> {
    #[inline]
    fn get_word(&self, word_pos: i16) -> U256 {
        self.words
            .get(self.committed, word_pos)
            .unwrap_or(U256::ZERO)
    }
}

impl BoundaryBitmapWriter for StagedBitmap<'_> {
    #[inline]
    fn set_word(&mut self, word_pos: i16, word: U256) {
        if word.is_zero() {
            self.words.remove(word_pos);
        } else {
            self.words.insert(word_pos, word);
        }
    }
}

#[derive(Debug)]
pub struct Transaction<'a> {
    committed: &'a GridState,
    changes: Changes,
}

impl<'a> Transaction<'a> {
    #[inline]
    pub fn new(committed: &'a GridState) -> Self {
        Self {
            committed,
            changes: Changes::default(),
        }
    }

    /// Ends the transaction, releasing the borrow of the committed state.
    #[inline]
    pub fn finish(self) -> Changes {
        self.changes
    }

    #[inline]
    pub fn slot0(&self) -> Result<Slot0, Error> {
        self.changes
            .slot0
            .or(self.committed.slot0)
            .ok_or(Error::Uninitialized)
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.changes.slot0.is_some() || self.committed.slot0.is_some()
    }

    #[inline]
    pub fn set_slot0(&mut self, slot0: Slot0) {
        self.changes.slot0 = Some(slot0);
    }

    #[inline]
    pub fn bundle(&self, bundle_id: u64) -> Result<Bundle, Error> {
        self.changes
            .bundles
            .get(&self.committed.bundles, bundle_id)
            .ok_or(Error::BundleNotFound(bundle_id))
    }

    #[inline]
    pub fn set_bundle(&mut self, bundle_id: u64, bundle: Bundle) {
        self.changes.bundles.insert(bundle_id, bundle);
    }

    #[inline]
    pub fn remove_bundle(&mut self, bundle_id: u64) {
        self.changes.bundles.remove(bundle_id);
    }

    /// Opens an empty bundle and returns its id.
    pub fn create_bundle(&mut self, boundary_lower: i32, zero: bool) -> u64 {
        let bundle_id = self
            .changes
            .next_bundle_id
            .unwrap_or(self.committed.next_bundle_id)
            .max(1);
        self.changes.next_bundle_id = Some(bundle_id + 1);
        self.set_bundle(bundle_id, Bundle::new(boundary_lower, zero));
        bundle_id
    }

    #[inline]
    pub fn boundary(&self, zero: bool, boundary_lower: i32) -> Option<Boundary> {
        let side = side(zero);
        self.changes.boundaries[side].get(&self.committed.boundaries[side], boundary_lower)
    }

    /// Stores a boundary record, removing it once it holds no liquidity.
    #[inline]
    pub fn set_boundary(&mut self, zero: bool, boundary_lower: i32, boundary: Boundary) {
        let staged = &mut self.changes.boundaries[side(zero)];
        if boundary.is_empty() {
            staged.remove(boundary_lower);
        } else {
            staged.insert(boundary_lower, boundary);
        }
    }

    #[inline]
    pub fn bitmap(&mut self, zero: bool) -> StagedBitmap<'_> {
        let side = side(zero);
        StagedBitmap {
            committed: &self.committed.bitmaps[side],
            words: &mut self.changes.words[side],
        }
    }

    #[inline]
    pub fn order(&self, order_id: u64) -> Option<Order> {
        self.changes.orders.get(&self.committed.orders, order_id)
    }

    /// Records a new order and returns its id.
    pub fn create_order(&mut self, order: Order) -> u64 {
        let order_id = self
            .changes
            .next_order_id
            .unwrap_or(self.committed.next_order_id)
            .max(1);
        self.changes.next_order_id = Some(order_id + 1);
        self.changes.orders.insert(order_id, order);
        order_id
    }

    #[inline]
    pub fn remove_order(&mut self, order_id: u64) {
        self.changes.orders.remove(order_id);
    }

    #[inline]
    pub fn tokens_owed(&self, owner: Address) -> (u128, u128) {
        self.changes
            .tokens_owed
            .get(&self.committed.tokens_owed, owner)
            .unwrap_or_default()
    }

    #[inline]
    pub fn set_tokens_owed(&mut self, owner: Address, owed: (u128, u128)) {
        if owed == (0, 0) {
            self.changes.tokens_owed.remove(owner);
        } else {
            self.changes.tokens_owed.insert(owner, owed);
        }
    }

    #[inline]
    pub fn protocol_fees(&self) -> (u128, u128) {
        self.changes
            .protocol_fees
            .unwrap_or(self.committed.protocol_fees)
    }

    #[inline]
    pub fn set_protocol_fees(&mut self, protocol_fees: (u128, u128)) {
        self.changes.protocol_fees = Some(protocol_fees);
    }
}
