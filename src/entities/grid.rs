use crate::prelude::*;
use alloy_primitives::{Address, I256, U160, U256};
use core::fmt;
use tracing::{debug, instrument, trace, warn};

/// A grid trading pair: resting maker orders at fixed boundaries, filled by taker swaps that walk
/// the boundaries in price order.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    /// The identity of the grid in the token ledger and the price oracle
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub resolution: i32,
    pub taker_fee: i32,
    pub maker_fee: i32,
    state: GridState,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("address", &self.address)
            .field("token0", &self.token0)
            .field("token1", &self.token1)
            .field("resolution", &self.resolution)
            .field("taker_fee", &self.taker_fee)
            .field("maker_fee", &self.maker_fee)
            .field("slot0", &self.state.slot0)
            .finish()
    }
}

/// The environment an entry point of [`Grid`] runs in.
///
/// The grid is borrowed mutably for the whole call, so callbacks, which only get the ledger,
/// cannot reenter it.
pub struct Context<'a, L, O> {
    pub sender: Address,
    pub timestamp: u64,
    pub ledger: &'a mut L,
    pub oracle: &'a mut O,
}

impl<'a, L, O> Context<'a, L, O> {
    #[inline]
    pub fn new(sender: Address, timestamp: u64, ledger: &'a mut L, oracle: &'a mut O) -> Self {
        Self {
            sender,
            timestamp,
            ledger,
            oracle,
        }
    }
}

/// The result of a swap. Positive amounts are owed to the grid, negative amounts are paid to the
/// recipient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SwapOutcome {
    pub amount0: I256,
    pub amount1: I256,
    pub price_x96: U160,
    pub boundary: i32,
}

struct SwapState {
    amount_specified_remaining: I256,
    amount_in: U256,
    amount_out: U256,
    protocol_fee: u128,
    price_x96: U160,
    boundary: i32,
}

struct StepComputations {
    price_start_x96: U160,
    boundary_next: i32,
    initialized: bool,
    price_target_x96: U160,
    price_next_x96: U160,
    amount_in: u128,
    amount_out: u128,
    fee_amount: u128,
}

impl Grid {
    /// Creates an uninitialized grid.
    ///
    /// ## Arguments
    ///
    /// * `token_a`: One of the tokens of the pair
    /// * `token_b`: The other token of the pair
    /// * `resolution`: The bucket width, which must be enabled in `config`
    /// * `config`: The resolutions and fees grids can be created with
    #[inline]
    pub fn new(
        token_a: Address,
        token_b: Address,
        resolution: i32,
        config: &TradingConfig,
    ) -> Result<Self, Error> {
        if token_a == token_b {
            return Err(Error::IdenticalTokens);
        }
        let fees = config
            .fees(resolution)
            .ok_or(Error::ResolutionNotEnabled(resolution))?;
        let (token0, token1) = if token_a < token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        Ok(Self {
            address: compute_grid_address(token0, token1, resolution),
            token0,
            token1,
            resolution,
            taker_fee: fees.taker_fee,
            maker_fee: fees.maker_fee,
            state: GridState::default(),
        })
    }

    #[inline]
    const fn token(&self, zero: bool) -> Address {
        if zero {
            self.token0
        } else {
            self.token1
        }
    }

    #[inline]
    pub const fn slot0(&self) -> Option<Slot0> {
        self.state.slot0
    }

    #[inline]
    pub fn boundary(&self, zero: bool, boundary_lower: i32) -> Option<Boundary> {
        self.state.boundaries[side(zero)]
            .get(&boundary_lower)
            .copied()
    }

    #[inline]
    pub fn bundle(&self, bundle_id: u64) -> Option<Bundle> {
        self.state.bundles.get(&bundle_id).copied()
    }

    #[inline]
    pub fn order(&self, order_id: u64) -> Option<Order> {
        self.state.orders.get(&order_id).copied()
    }

    #[inline]
    pub fn tokens_owed(&self, owner: Address) -> (u128, u128) {
        self.state
            .tokens_owed
            .get(&owner)
            .copied()
            .unwrap_or_default()
    }

    #[inline]
    pub const fn protocol_fees(&self) -> (u128, u128) {
        self.state.protocol_fees
    }

    /// Whether the bucket at `boundary_lower` of the given maker side holds resting liquidity.
    #[inline]
    pub fn is_initialized_boundary(&self, zero: bool, boundary_lower: i32) -> bool {
        let (word_pos, bit_pos) = position(boundary_lower, self.resolution);
        self.state.bitmaps[side(zero)]
            .get_word(word_pos)
            .bit(bit_pos as usize)
    }

    /// Returns the cumulative boundary of the grid `seconds_ago` seconds before `now`.
    #[inline]
    pub fn get_boundary_cumulative<O: PriceOracle>(
        &self,
        oracle: &O,
        now: u64,
        seconds_ago: u32,
    ) -> Result<i64, Error> {
        let slot0 = self.slot0().ok_or(Error::Uninitialized)?;
        oracle.get_boundary_cumulative(self.address, slot0.boundary, now, seconds_ago)
    }

    /// Sets the initial price and places the seed orders of both sides.
    ///
    /// ## Arguments
    ///
    /// * `ctx`: The caller, who pays for the seed orders
    /// * `recipient`: The owner of the seed orders
    /// * `price_x96`: The initial price as a Q64.96
    /// * `orders0`: The seed orders selling token0, must not be empty
    /// * `orders1`: The seed orders selling token1, must not be empty
    ///
    /// ## Returns
    ///
    /// The ids of the orders placed for each side
    pub fn initialize<L: TokenLedger, O: PriceOracle>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        recipient: Address,
        price_x96: U160,
        orders0: &[MakerOrderParameters],
        orders1: &[MakerOrderParameters],
    ) -> Result<(Vec<u64>, Vec<u64>), Error> {
        let mut tx = Transaction::new(&self.state);
        if tx.is_initialized() {
            return Err(Error::AlreadyInitialized);
        }
        let boundary = get_boundary_at_price_x96(price_x96)?;
        if orders0.is_empty() || orders1.is_empty() {
            return Err(Error::OrdersEmpty);
        }
        tx.set_slot0(Slot0 {
            price_x96,
            boundary,
        });
        let (order_ids0, amount0) = self.place_all(&mut tx, recipient, true, orders0)?;
        let (order_ids1, amount1) = self.place_all(&mut tx, recipient, false, orders1)?;
        let changes = tx.finish();

        with_rollback(ctx.ledger, |ledger| {
            self.pull_payment(ledger, ctx.sender, true, amount0)?;
            self.pull_payment(ledger, ctx.sender, false, amount1)
        })?;
        ctx.oracle.register(self.address, ctx.timestamp);
        self.state.commit(changes);
        debug!(grid = %self.address, %price_x96, boundary, amount0, amount1, "initialized");
        Ok((order_ids0, order_ids1))
    }

    /// Places a maker order at `boundary_lower`, paid by the caller.
    ///
    /// ## Arguments
    ///
    /// * `ctx`: The caller, who pays `amount`
    /// * `recipient`: The owner of the order
    /// * `zero`: Whether the order sells token0
    /// * `boundary_lower`: The lower boundary of the bucket, a multiple of the resolution
    /// * `amount`: The amount of the token to sell
    ///
    /// ## Returns
    ///
    /// The id of the order
    pub fn place_maker_order<L: TokenLedger, O>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        recipient: Address,
        zero: bool,
        boundary_lower: i32,
        amount: u128,
    ) -> Result<u64, Error> {
        let mut tx = Transaction::new(&self.state);
        tx.slot0()?;
        let order_id = self.place(&mut tx, recipient, zero, boundary_lower, amount)?;
        let changes = tx.finish();

        with_rollback(ctx.ledger, |ledger| {
            self.pull_payment(ledger, ctx.sender, zero, amount)
        })?;
        self.state.commit(changes);
        debug!(grid = %self.address, order_id, zero, boundary_lower, amount, %recipient, "placed maker order");
        Ok(order_id)
    }

    /// Places several maker orders of one side for a single payment of their sum. An empty batch
    /// places nothing.
    pub fn place_maker_order_in_batch<L: TokenLedger, O>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        recipient: Address,
        zero: bool,
        orders: &[MakerOrderParameters],
    ) -> Result<Vec<u64>, Error> {
        let mut tx = Transaction::new(&self.state);
        tx.slot0()?;
        let (order_ids, amount) = self.place_all(&mut tx, recipient, zero, orders)?;
        let changes = tx.finish();

        with_rollback(ctx.ledger, |ledger| {
            self.pull_payment(ledger, ctx.sender, zero, amount)
        })?;
        self.state.commit(changes);
        debug!(grid = %self.address, orders = order_ids.len(), zero, amount, %recipient, "placed maker orders");
        Ok(order_ids)
    }

    /// Settles an order of the caller and credits the unfilled principal, the taker payments and
    /// the maker fees to the caller's tokens owed.
    ///
    /// ## Returns
    ///
    /// The amounts of token0 and token1 credited
    pub fn settle_maker_order<L, O>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        order_id: u64,
    ) -> Result<(u128, u128), Error> {
        let mut tx = Transaction::new(&self.state);
        tx.slot0()?;
        let (amount0, amount1) = self.settle(&mut tx, ctx.sender, order_id)?;
        let (owed0, owed1) = tx.tokens_owed(ctx.sender);
        tx.set_tokens_owed(
            ctx.sender,
            (
                owed0.checked_add(amount0).ok_or(Error::MakerAmountOverflow)?,
                owed1.checked_add(amount1).ok_or(Error::MakerAmountOverflow)?,
            ),
        );
        let changes = tx.finish();
        self.state.commit(changes);
        debug!(grid = %self.address, order_id, amount0, amount1, "settled maker order");
        Ok((amount0, amount1))
    }

    /// Settles an order of the caller and pays out what it is owed right away.
    #[inline]
    pub fn settle_maker_order_and_collect<L: TokenLedger, O>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        order_id: u64,
    ) -> Result<(u128, u128), Error> {
        self.settle_maker_orders_and_collect_in_batch(ctx, &[order_id])
    }

    /// Settles several orders of the caller and pays out their sum, one transfer per token.
    pub fn settle_maker_orders_and_collect_in_batch<L: TokenLedger, O>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        order_ids: &[u64],
    ) -> Result<(u128, u128), Error> {
        let mut tx = Transaction::new(&self.state);
        tx.slot0()?;
        let (mut amount0, mut amount1) = (0_u128, 0_u128);
        for order_id in order_ids {
            let (settled0, settled1) = self.settle(&mut tx, ctx.sender, *order_id)?;
            amount0 = amount0
                .checked_add(settled0)
                .ok_or(Error::MakerAmountOverflow)?;
            amount1 = amount1
                .checked_add(settled1)
                .ok_or(Error::MakerAmountOverflow)?;
        }
        let changes = tx.finish();

        let sender = ctx.sender;
        with_rollback(ctx.ledger, |ledger| {
            ledger.transfer(self.token0, self.address, sender, amount0)?;
            ledger.transfer(self.token1, self.address, sender, amount1)
        })?;
        self.state.commit(changes);
        debug!(grid = %self.address, orders = order_ids.len(), amount0, amount1, "settled and collected maker orders");
        Ok((amount0, amount1))
    }

    /// Pays out up to the requested amounts of the caller's tokens owed.
    ///
    /// ## Returns
    ///
    /// The amounts of token0 and token1 paid
    pub fn collect<L: TokenLedger, O>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        recipient: Address,
        amount0_requested: u128,
        amount1_requested: u128,
    ) -> Result<(u128, u128), Error> {
        let mut tx = Transaction::new(&self.state);
        tx.slot0()?;
        let (owed0, owed1) = tx.tokens_owed(ctx.sender);
        let amount0 = amount0_requested.min(owed0);
        let amount1 = amount1_requested.min(owed1);
        tx.set_tokens_owed(ctx.sender, (owed0 - amount0, owed1 - amount1));
        let changes = tx.finish();

        with_rollback(ctx.ledger, |ledger| {
            ledger.transfer(self.token0, self.address, recipient, amount0)?;
            ledger.transfer(self.token1, self.address, recipient, amount1)
        })?;
        self.state.commit(changes);
        debug!(grid = %self.address, owner = %ctx.sender, %recipient, amount0, amount1, "collected");
        Ok((amount0, amount1))
    }

    /// Pays out up to the requested amounts of the accrued protocol fees. Deciding who may call
    /// this is up to the caller.
    pub fn collect_protocol<L: TokenLedger, O>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        recipient: Address,
        amount0_requested: u128,
        amount1_requested: u128,
    ) -> Result<(u128, u128), Error> {
        let mut tx = Transaction::new(&self.state);
        tx.slot0()?;
        let (fees0, fees1) = tx.protocol_fees();
        let amount0 = amount0_requested.min(fees0);
        let amount1 = amount1_requested.min(fees1);
        tx.set_protocol_fees((fees0 - amount0, fees1 - amount1));
        let changes = tx.finish();

        with_rollback(ctx.ledger, |ledger| {
            ledger.transfer(self.token0, self.address, recipient, amount0)?;
            ledger.transfer(self.token1, self.address, recipient, amount1)
        })?;
        self.state.commit(changes);
        debug!(grid = %self.address, %recipient, amount0, amount1, "collected protocol fees");
        Ok((amount0, amount1))
    }

    /// Swaps token0 for token1, or token1 for token0.
    ///
    /// The output is sent to `recipient` first, then `callback` is given the ledger and the
    /// amounts owed, and must leave the input in the grid's balance. Otherwise the whole swap is
    /// undone.
    ///
    /// ## Arguments
    ///
    /// * `ctx`: The caller
    /// * `recipient`: The address to receive the output of the swap
    /// * `zero_for_one`: The direction of the swap, true for token0 to token1
    /// * `amount_specified`: The amount of the swap, which implicitly configures the swap as
    ///   exact input (negative), or exact output (positive)
    /// * `price_limit_x96`: The price the swap may not pass, the range bound in the swap
    ///   direction when `None`
    /// * `callback`: Pays the grid, given `amount0` and `amount1`
    #[instrument(level = "debug", skip_all, fields(grid = %self.address, zero_for_one, %amount_specified))]
    pub fn swap<L, O, F>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        recipient: Address,
        zero_for_one: bool,
        amount_specified: I256,
        price_limit_x96: Option<U160>,
        callback: F,
    ) -> Result<SwapOutcome, Error>
    where
        L: TokenLedger,
        O: PriceOracle,
        F: FnOnce(&mut L, I256, I256) -> Result<(), Error>,
    {
        let mut tx = Transaction::new(&self.state);
        let slot0_start = tx.slot0()?;
        let outcome = self.compute_swap(&mut tx, zero_for_one, amount_specified, price_limit_x96)?;
        let changes = tx.finish();

        let (amount_in, amount_out) = if zero_for_one {
            (outcome.amount0, -outcome.amount1)
        } else {
            (outcome.amount1, -outcome.amount0)
        };
        let amount_in = to_u128(amount_in.into_raw())?;
        let amount_out = to_u128(amount_out.into_raw())?;
        let token_in = self.token(zero_for_one);
        let token_out = self.token(!zero_for_one);
        let timestamp = ctx.timestamp;
        let oracle = &mut *ctx.oracle;

        with_rollback(ctx.ledger, |ledger| {
            ledger.transfer(token_out, self.address, recipient, amount_out)?;
            let balance_before = ledger.balance_of(token_in, self.address);
            callback(ledger, outcome.amount0, outcome.amount1)?;
            let balance_after = ledger.balance_of(token_in, self.address);
            if balance_before
                .checked_add(amount_in)
                .map_or(true, |required| balance_after < required)
            {
                warn!(grid = %self.address, token = %token_in, amount_in, "swap underpaid");
                return Err(Error::InsufficientPayment(token_in));
            }
            if outcome.price_x96 != slot0_start.price_x96 {
                oracle.update(self.address, slot0_start.boundary, timestamp)?;
            }
            Ok(())
        })?;
        self.state.commit(changes);
        debug!(
            %recipient,
            amount0 = %outcome.amount0,
            amount1 = %outcome.amount1,
            price_x96 = %outcome.price_x96,
            boundary = outcome.boundary,
            "swapped"
        );
        Ok(outcome)
    }

    /// Runs the swap loop against a throwaway copy of the state and returns what [`Self::swap`]
    /// would, without moving tokens.
    #[inline]
    pub fn quote_swap(
        &self,
        zero_for_one: bool,
        amount_specified: I256,
        price_limit_x96: Option<U160>,
    ) -> Result<SwapOutcome, Error> {
        let mut tx = Transaction::new(&self.state);
        self.compute_swap(&mut tx, zero_for_one, amount_specified, price_limit_x96)
    }

    /// Lends out tokens of the grid for the duration of `callback`, which must return at least
    /// what was lent. Anything returned beyond that accrues to the protocol.
    ///
    /// ## Returns
    ///
    /// The surplus of token0 and token1 paid back
    pub fn flash<L, O, F>(
        &mut self,
        ctx: &mut Context<'_, L, O>,
        recipient: Address,
        amount0: u128,
        amount1: u128,
        callback: F,
    ) -> Result<(u128, u128), Error>
    where
        L: TokenLedger,
        F: FnOnce(&mut L) -> Result<(), Error>,
    {
        let mut tx = Transaction::new(&self.state);
        tx.slot0()?;
        let (paid0, paid1) = with_rollback(ctx.ledger, |ledger| {
            let balance0_before = ledger.balance_of(self.token0, self.address);
            let balance1_before = ledger.balance_of(self.token1, self.address);
            ledger.transfer(self.token0, self.address, recipient, amount0)?;
            ledger.transfer(self.token1, self.address, recipient, amount1)?;
            callback(ledger)?;
            let paid0 = ledger
                .balance_of(self.token0, self.address)
                .checked_sub(balance0_before)
                .ok_or(Error::InsufficientPayment(self.token0));
            let paid1 = ledger
                .balance_of(self.token1, self.address)
                .checked_sub(balance1_before)
                .ok_or(Error::InsufficientPayment(self.token1));
            let paid = paid0.and_then(|paid0| paid1.map(|paid1| (paid0, paid1)));
            if let Err(err) = &paid {
                warn!(grid = %self.address, ?err, "flash not repaid");
            }
            let (paid0, paid1) = paid?;
            let (fees0, fees1) = tx.protocol_fees();
            tx.set_protocol_fees((
                fees0.checked_add(paid0).ok_or(Error::TakerAmountOverflow)?,
                fees1.checked_add(paid1).ok_or(Error::TakerAmountOverflow)?,
            ));
            Ok((paid0, paid1))
        })?;
        let changes = tx.finish();
        self.state.commit(changes);
        debug!(grid = %self.address, %recipient, amount0, amount1, paid0, paid1, "flash");
        Ok((paid0, paid1))
    }

    fn place_all(
        &self,
        tx: &mut Transaction<'_>,
        recipient: Address,
        zero: bool,
        orders: &[MakerOrderParameters],
    ) -> Result<(Vec<u64>, u128), Error> {
        let mut order_ids = Vec::with_capacity(orders.len());
        let mut total = 0_u128;
        for order in orders {
            order_ids.push(self.place(tx, recipient, zero, order.boundary_lower, order.amount)?);
            total = total
                .checked_add(order.amount)
                .ok_or(Error::MakerAmountOverflow)?;
        }
        Ok((order_ids, total))
    }

    /// Adds an order to the open bundle of a boundary, opening a bundle when there is none that
    /// can be joined.
    fn place(
        &self,
        tx: &mut Transaction<'_>,
        owner: Address,
        zero: bool,
        boundary_lower: i32,
        amount: u128,
    ) -> Result<u64, Error> {
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        if !is_valid_boundary_lower(boundary_lower, self.resolution) {
            return Err(Error::InvalidBoundary(boundary_lower));
        }

        let mut boundary = tx.boundary(zero, boundary_lower).unwrap_or_default();
        let was_empty = boundary.is_empty();
        let bundle_id = match boundary.bundle0_id {
            Some(bundle0_id) if tx.bundle(bundle0_id)?.is_unfilled() => bundle0_id,
            Some(_) => match boundary.bundle1_id {
                Some(bundle1_id) => bundle1_id,
                None => {
                    let bundle1_id = tx.create_bundle(boundary_lower, zero);
                    boundary.bundle1_id = Some(bundle1_id);
                    bundle1_id
                }
            },
            None => {
                let bundle0_id = tx.create_bundle(boundary_lower, zero);
                boundary.bundle0_id = Some(bundle0_id);
                bundle0_id
            }
        };

        let mut bundle = tx.bundle(bundle_id)?;
        bundle.add_liquidity(amount)?;
        boundary.maker_amount_remaining = boundary
            .maker_amount_remaining
            .checked_add(amount)
            .ok_or(Error::MakerAmountOverflow)?;
        tx.set_bundle(bundle_id, bundle);
        tx.set_boundary(zero, boundary_lower, boundary);
        if was_empty {
            tx.bitmap(zero).flip_boundary(boundary_lower, self.resolution);
        }
        let order_id = tx.create_order(Order {
            owner,
            bundle_id,
            amount,
        });
        trace!(order_id, bundle_id, boundary_lower, zero, amount, "order placed");
        Ok(order_id)
    }

    /// Removes an order from its bundle and returns what it is owed, as token0 and token1.
    fn settle(
        &self,
        tx: &mut Transaction<'_>,
        sender: Address,
        order_id: u64,
    ) -> Result<(u128, u128), Error> {
        let order = tx.order(order_id).ok_or(Error::OrderNotFound(order_id))?;
        if order.owner != sender {
            return Err(Error::Unauthorized(sender));
        }
        let mut bundle = tx.bundle(order.bundle_id)?;
        let removal = bundle.remove_liquidity(order.amount)?;
        tx.set_bundle(order.bundle_id, bundle);

        let mut referenced = false;
        if let Some(mut boundary) = tx.boundary(bundle.zero, bundle.boundary_lower) {
            boundary.maker_amount_remaining = boundary
                .maker_amount_remaining
                .checked_sub(removal.maker_amount_out)
                .ok_or(Error::BundleAmountUnderflow)?;
            if boundary.bundle0_id == Some(order.bundle_id) && bundle.maker_amount_remaining == 0
            {
                boundary.promote();
            }
            if boundary.is_empty() {
                tx.bitmap(bundle.zero)
                    .flip_boundary(bundle.boundary_lower, self.resolution);
            }
            referenced = boundary.bundle0_id == Some(order.bundle_id)
                || boundary.bundle1_id == Some(order.bundle_id);
            tx.set_boundary(bundle.zero, bundle.boundary_lower, boundary);
        }
        if bundle.maker_amount_total == 0 && !referenced {
            tx.remove_bundle(order.bundle_id);
        }
        tx.remove_order(order_id);

        let taker_amount = removal
            .taker_amount_out
            .checked_add(removal.taker_fee_amount_out)
            .ok_or(Error::TakerAmountOverflow)?;
        trace!(
            order_id,
            bundle_id = order.bundle_id,
            maker_amount_out = removal.maker_amount_out,
            taker_amount_out = removal.taker_amount_out,
            taker_fee_amount_out = removal.taker_fee_amount_out,
            "order settled"
        );
        Ok(if bundle.zero {
            (removal.maker_amount_out, taker_amount)
        } else {
            (taker_amount, removal.maker_amount_out)
        })
    }

    fn compute_swap(
        &self,
        tx: &mut Transaction<'_>,
        zero_for_one: bool,
        amount_specified: I256,
        price_limit_x96: Option<U160>,
    ) -> Result<SwapOutcome, Error> {
        let slot0 = tx.slot0()?;
        if amount_specified.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let price_limit_x96 = match price_limit_x96 {
            Some(limit) => {
                let valid = if zero_for_one {
                    limit >= MIN_RATIO && limit < slot0.price_x96
                } else {
                    limit <= MAX_RATIO && limit > slot0.price_x96
                };
                if !valid {
                    return Err(Error::PriceLimitOutOfRange(limit));
                }
                limit
            }
            None if zero_for_one => MIN_RATIO,
            None => MAX_RATIO,
        };

        // takers receive the token of the makers they fill
        let zero = !zero_for_one;
        let exact_input = amount_specified.is_negative();

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_in: U256::ZERO,
            amount_out: U256::ZERO,
            protocol_fee: 0,
            price_x96: slot0.price_x96,
            boundary: slot0.boundary,
        };

        while !state.amount_specified_remaining.is_zero() && state.price_x96 != price_limit_x96 {
            let boundary_lower = rewrite_to_valid_boundary_lower(
                get_boundary_lower_at_boundary(state.boundary, self.resolution),
                self.resolution,
            );
            let current_initialized = tx.boundary(zero, boundary_lower).is_some();
            let (boundary_next, initialized) = tx.bitmap(zero).next_initialized_boundary(
                state.boundary,
                state.price_x96,
                current_initialized,
                boundary_lower,
                self.resolution,
                zero_for_one,
            )?;
            if !initialized {
                break;
            }

            let price_lower_x96 = get_price_x96_at_boundary(boundary_next)?;
            let price_upper_x96 = get_price_x96_at_boundary(boundary_next + self.resolution)?;
            let mut step = if zero_for_one {
                StepComputations {
                    price_start_x96: state.price_x96.min(price_upper_x96),
                    boundary_next,
                    initialized,
                    price_target_x96: price_lower_x96,
                    price_next_x96: U160::ZERO,
                    amount_in: 0,
                    amount_out: 0,
                    fee_amount: 0,
                }
            } else {
                StepComputations {
                    price_start_x96: state.price_x96.max(price_lower_x96),
                    boundary_next,
                    initialized,
                    price_target_x96: price_upper_x96,
                    price_next_x96: U160::ZERO,
                    amount_in: 0,
                    amount_out: 0,
                    fee_amount: 0,
                }
            };
            // the next bucket begins at or beyond the limit
            if (zero_for_one && step.price_start_x96 <= price_limit_x96)
                || (!zero_for_one && step.price_start_x96 >= price_limit_x96)
            {
                break;
            }

            let mut boundary = tx
                .boundary(zero, step.boundary_next)
                .unwrap_or_default();
            (
                step.price_next_x96,
                step.amount_in,
                step.amount_out,
                step.fee_amount,
            ) = compute_swap_step(
                step.price_start_x96,
                step.price_target_x96,
                price_limit_x96,
                state.amount_specified_remaining,
                boundary.maker_amount_remaining,
                self.taker_fee,
            )?;

            if exact_input {
                state.amount_specified_remaining = I256::from_raw(
                    state.amount_specified_remaining.into_raw()
                        + U256::from(step.amount_in)
                        + U256::from(step.fee_amount),
                );
            } else {
                state.amount_specified_remaining = I256::from_raw(
                    state.amount_specified_remaining.into_raw() - U256::from(step.amount_out),
                );
            }
            state.amount_in += U256::from(step.amount_in) + U256::from(step.fee_amount);
            state.amount_out += U256::from(step.amount_out);

            let (fee_for_maker, fee_for_protocol) =
                compute_fees(step.fee_amount, self.taker_fee, self.maker_fee)?;
            state.protocol_fee = state
                .protocol_fee
                .checked_add(fee_for_protocol)
                .ok_or(Error::TakerAmountOverflow)?;
            self.fill_boundary(
                tx,
                &mut boundary,
                step.amount_in,
                step.amount_out,
                fee_for_maker,
            )?;
            if boundary.is_empty() {
                tx.bitmap(zero)
                    .flip_boundary(step.boundary_next, self.resolution);
            }
            tx.set_boundary(zero, step.boundary_next, boundary);

            state.price_x96 = step.price_next_x96;
            state.boundary = get_boundary_at_price_x96(state.price_x96)?;
            trace!(
                boundary_lower = step.boundary_next,
                initialized = step.initialized,
                price_x96 = %state.price_x96,
                amount_in = step.amount_in,
                amount_out = step.amount_out,
                fee_amount = step.fee_amount,
                "swap step"
            );
        }

        let (fees0, fees1) = tx.protocol_fees();
        let protocol_fees = if zero_for_one {
            let fees0 = fees0
                .checked_add(state.protocol_fee)
                .ok_or(Error::TakerAmountOverflow)?;
            (fees0, fees1)
        } else {
            let fees1 = fees1
                .checked_add(state.protocol_fee)
                .ok_or(Error::TakerAmountOverflow)?;
            (fees0, fees1)
        };
        tx.set_protocol_fees(protocol_fees);
        tx.set_slot0(Slot0 {
            price_x96: state.price_x96,
            boundary: state.boundary,
        });

        let amount_in = I256::from_raw(state.amount_in);
        let amount_out = I256::from_raw(state.amount_out);
        let (amount0, amount1) = if zero_for_one {
            (amount_in, -amount_out)
        } else {
            (-amount_out, amount_in)
        };
        Ok(SwapOutcome {
            amount0,
            amount1,
            price_x96: state.price_x96,
            boundary: state.boundary,
        })
    }

    /// Applies one swap step to the bundles of a boundary. The fill goes to `bundle0` and
    /// spills into `bundle1`, which takes over once `bundle0` is drained.
    fn fill_boundary(
        &self,
        tx: &mut Transaction<'_>,
        boundary: &mut Boundary,
        amount_in: u128,
        amount_out: u128,
        fee_for_maker: u128,
    ) -> Result<(), Error> {
        let Some(bundle0_id) = boundary.bundle0_id else {
            return Ok(());
        };
        let mut bundle0 = tx.bundle(bundle0_id)?;
        let fill = bundle0.update_for_taker(amount_in, amount_out, fee_for_maker)?;
        tx.set_bundle(bundle0_id, bundle0);
        trace!(
            bundle_id = bundle0_id,
            amount_in_used = fill.amount_in_used,
            amount_out_used = fill.amount_out_used,
            "bundle filled"
        );

        if bundle0.maker_amount_remaining == 0 {
            if let Some(bundle1_id) = boundary.bundle1_id {
                if fill.amount_out_remaining != 0 {
                    let mut bundle1 = tx.bundle(bundle1_id)?;
                    let spill = bundle1.update_for_taker(
                        fill.amount_in_remaining,
                        fill.amount_out_remaining,
                        fill.taker_fee_for_maker_amount_remaining,
                    )?;
                    tx.set_bundle(bundle1_id, bundle1);
                    trace!(
                        bundle_id = bundle1_id,
                        amount_in_used = spill.amount_in_used,
                        amount_out_used = spill.amount_out_used,
                        "bundle filled"
                    );
                }
            }
            boundary.promote();
        }
        boundary.maker_amount_remaining = boundary
            .maker_amount_remaining
            .checked_sub(amount_out)
            .ok_or(Error::BundleAmountUnderflow)?;
        Ok(())
    }

    /// Pulls `amount` of one token from `payer` into the grid and checks that it arrived.
    fn pull_payment<L: TokenLedger>(
        &self,
        ledger: &mut L,
        payer: Address,
        zero: bool,
        amount: u128,
    ) -> Result<(), Error> {
        let token = self.token(zero);
        let balance_before = ledger.balance_of(token, self.address);
        ledger.transfer(token, payer, self.address, amount)?;
        let balance_after = ledger.balance_of(token, self.address);
        if balance_before
            .checked_add(amount)
            .map_or(true, |required| balance_after < required)
        {
            warn!(grid = %self.address, %token, %payer, amount, "maker payment missing");
            return Err(Error::InsufficientPayment(token));
        }
        Ok(())
    }
}

/// Runs `f` against the ledger and restores the ledger if it fails.
#[inline]
fn with_rollback<L: TokenLedger, T>(
    ledger: &mut L,
    f: impl FnOnce(&mut L) -> Result<T, Error>,
) -> Result<T, Error> {
    let snapshot = ledger.snapshot();
    match f(ledger) {
        Ok(value) => Ok(value),
        Err(err) => {
            ledger.restore(snapshot);
            Err(err)
        }
    }
}
