//! ## Token Ledger
//! Token custody is an external collaborator of the grid. The [`TokenLedger`] trait is the
//! surface the grid moves tokens through, and [`InMemoryLedger`] keeps balances in a hash map.

use crate::prelude::*;
use alloy_primitives::{map::rustc_hash::FxHashMap, Address};

/// Fungible token balances keyed by token and account.
pub trait TokenLedger {
    /// A copy of the ledger state that can be restored when an operation fails
    type Snapshot;

    fn balance_of(&self, token: Address, account: Address) -> u128;

    /// Moves `amount` of `token` from `from` to `to`.
    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), Error>;

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: Self::Snapshot);
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryLedger {
    balances: FxHashMap<(Address, Address), u128>,
}

impl InMemoryLedger {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` of `token` to `account` out of thin air.
    #[inline]
    pub fn mint(&mut self, token: Address, account: Address, amount: u128) -> Result<(), Error> {
        let balance = self.balances.entry((token, account)).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(Error::InsufficientBalance { token, account })?;
        Ok(())
    }
}

impl TokenLedger for InMemoryLedger {
    type Snapshot = FxHashMap<(Address, Address), u128>;

    #[inline]
    fn balance_of(&self, token: Address, account: Address) -> u128 {
        self.balances.get(&(token, account)).copied().unwrap_or(0)
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), Error> {
        if amount == 0 || from == to {
            return Ok(());
        }
        let from_balance = self
            .balance_of(token, from)
            .checked_sub(amount)
            .ok_or(Error::InsufficientBalance {
                token,
                account: from,
            })?;
        let to_balance = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(Error::InsufficientBalance { token, account: to })?;
        if from_balance == 0 {
            self.balances.remove(&(token, from));
        } else {
            self.balances.insert((token, from), from_balance);
        }
        self.balances.insert((token, to), to_balance);
        Ok(())
    }

    #[inline]
    fn snapshot(&self) -> Self::Snapshot {
        self.balances.clone()
    }

    #[inline]
    fn restore(&mut self, snapshot: Self::Snapshot) {
        self.balances = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn transfer_moves_balance() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(TOKEN0, ALICE, 100).unwrap();
        ledger.transfer(TOKEN0, ALICE, BOB, 40).unwrap();
        assert_eq!(ledger.balance_of(TOKEN0, ALICE), 60);
        assert_eq!(ledger.balance_of(TOKEN0, BOB), 40);
        assert_eq!(ledger.balance_of(TOKEN1, BOB), 0);
    }

    #[test]
    fn transfer_insufficient_balance() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(TOKEN0, ALICE, 10).unwrap();
        assert_eq!(
            ledger.transfer(TOKEN0, ALICE, BOB, 11),
            Err(Error::InsufficientBalance {
                token: TOKEN0,
                account: ALICE
            })
        );
        assert_eq!(ledger.balance_of(TOKEN0, ALICE), 10);
    }

    #[test]
    fn zero_transfer_is_noop() {
        let mut ledger = InMemoryLedger::new();
        ledger.transfer(TOKEN0, ALICE, BOB, 0).unwrap();
        assert_eq!(ledger, InMemoryLedger::new());
    }

    #[test]
    fn restore_snapshot() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(TOKEN1, BOB, 5).unwrap();
        let snapshot = ledger.snapshot();
        ledger.transfer(TOKEN1, BOB, ALICE, 5).unwrap();
        ledger.restore(snapshot);
        assert_eq!(ledger.balance_of(TOKEN1, BOB), 5);
        assert_eq!(ledger.balance_of(TOKEN1, ALICE), 0);
    }
}
