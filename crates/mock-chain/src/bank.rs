//! In-memory native currency for the mock chain.
//!
//! Accounts hold free balances. Deposits attached to bids move into the
//! auction's escrow, and withdrawals pay out of it through [`Transfer`].

use std::collections::{HashMap, HashSet};

use auction_module::{Transfer, TransferError};
use auction_types::{Address, Amount};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Balance overflow")]
    Overflow,
}

#[derive(Debug, Default)]
pub struct MockBank {
    balances: HashMap<Address, Amount>,
    /// Funds held by the auction
    escrow: Amount,
    /// Accounts whose incoming transfers fail
    rejecting: HashSet<Address>,
}

impl MockBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn escrow(&self) -> Amount {
        self.escrow
    }

    /// Mint funds into an account.
    pub fn fund(&mut self, address: Address, amount: Amount) -> Result<Amount, BankError> {
        let balance = self.balances.entry(address).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(BankError::Overflow)?;
        Ok(*balance)
    }

    /// Move a bid deposit from an account into escrow.
    pub fn lock(&mut self, from: &Address, amount: Amount) -> Result<(), BankError> {
        let have = self.balance_of(from);
        if have < amount {
            return Err(BankError::InsufficientBalance { have, need: amount });
        }
        let escrow = self.escrow.checked_add(amount).ok_or(BankError::Overflow)?;
        self.balances.insert(*from, have - amount);
        self.escrow = escrow;
        Ok(())
    }

    /// Return a locked deposit whose bid was rejected.
    pub fn unlock(&mut self, to: &Address, amount: Amount) -> Result<(), BankError> {
        self.pay_out(to, amount)
    }

    /// Make transfers to `address` fail (or succeed again).
    pub fn set_rejecting(&mut self, address: Address, reject: bool) {
        if reject {
            self.rejecting.insert(address);
        } else {
            self.rejecting.remove(&address);
        }
    }

    fn pay_out(&mut self, to: &Address, amount: Amount) -> Result<(), BankError> {
        if self.escrow < amount {
            return Err(BankError::InsufficientBalance {
                have: self.escrow,
                need: amount,
            });
        }
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(BankError::Overflow)?;
        self.escrow -= amount;
        self.balances.insert(*to, balance);
        Ok(())
    }
}

impl Transfer for MockBank {
    fn send(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        if self.rejecting.contains(to) {
            return Err(TransferError(format!(
                "account {} rejects transfers",
                hex::encode(to)
            )));
        }
        self.pay_out(to, amount)
            .map_err(|e| TransferError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_and_send() {
        let mut bank = MockBank::new();
        let alice = [1u8; 32];
        let bob = [2u8; 32];

        bank.fund(alice, 100).unwrap();
        bank.lock(&alice, 60).unwrap();
        assert_eq!(bank.balance_of(&alice), 40);
        assert_eq!(bank.escrow(), 60);

        assert_eq!(
            bank.lock(&alice, 41),
            Err(BankError::InsufficientBalance { have: 40, need: 41 })
        );

        bank.send(&bob, 25).unwrap();
        assert_eq!(bank.balance_of(&bob), 25);
        assert_eq!(bank.escrow(), 35);

        bank.unlock(&alice, 35).unwrap();
        assert_eq!(bank.balance_of(&alice), 75);
        assert_eq!(bank.escrow(), 0);
    }

    #[test]
    fn test_rejecting_account() {
        let mut bank = MockBank::new();
        let alice = [1u8; 32];
        bank.fund(alice, 10).unwrap();
        bank.lock(&alice, 10).unwrap();

        bank.set_rejecting(alice, true);
        assert!(bank.send(&alice, 10).is_err());
        assert_eq!(bank.escrow(), 10);

        bank.set_rejecting(alice, false);
        bank.send(&alice, 10).unwrap();
        assert_eq!(bank.balance_of(&alice), 10);
    }

    #[test]
    fn test_send_more_than_escrow() {
        let mut bank = MockBank::new();
        assert!(bank.send(&[1u8; 32], 1).is_err());
    }
}
