//! Capabilities the host runtime provides to the auction.
//!
//! The module never reads the wall clock and never moves funds itself. A host
//! supplies the current time through [`Clock`] and pays out withdrawals through
//! [`Transfer`].

use std::cell::Cell;
use std::collections::HashMap;

use auction_types::{Address, Amount, Timestamp};
use thiserror::Error;

/// Source of the current time (seconds). Must be non-decreasing.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Failure reported by the host when a payout could not be made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransferError(pub String);

/// Moves funds out of the auction to an address.
pub trait Transfer {
    fn send(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError>;
}

/// Clock whose time is set explicitly.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Timestamp>,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.set(now);
    }

    pub fn advance(&self, secs: u64) {
        self.now.set(self.now.get().saturating_add(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

/// Transfer sink that records payouts in memory.
///
/// Payouts to addresses in the reject list fail, which lets callers exercise
/// the failed-transfer path.
#[derive(Debug, Default)]
pub struct InMemoryTransfer {
    /// Payouts in the order they were made
    pub payouts: Vec<(Address, Amount)>,
    /// Total paid per address
    pub received: HashMap<Address, Amount>,
    rejected: Vec<Address>,
}

impl InMemoryTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future payout to `address` fail.
    pub fn reject(&mut self, address: Address) {
        self.rejected.push(address);
    }

    /// Accept payouts to `address` again.
    pub fn accept(&mut self, address: &Address) {
        self.rejected.retain(|a| a != address);
    }

    pub fn received_by(&self, address: &Address) -> Amount {
        self.received.get(address).copied().unwrap_or(0)
    }

    pub fn total_paid(&self) -> Amount {
        self.payouts.iter().map(|(_, amount)| amount).sum()
    }
}

impl Transfer for InMemoryTransfer {
    fn send(&mut self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        if self.rejected.contains(to) {
            return Err(TransferError(format!(
                "recipient {} rejected payment",
                hex::encode(to)
            )));
        }
        self.payouts.push((*to, amount));
        *self.received.entry(*to).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(50);
        assert_eq!(clock.now(), 150);
        clock.set(1_000);
        assert_eq!(clock.now(), 1_000);
    }

    #[test]
    fn test_in_memory_transfer() {
        let mut sink = InMemoryTransfer::new();
        let alice = [1u8; 32];
        let bob = [2u8; 32];

        sink.send(&alice, 10).unwrap();
        sink.send(&alice, 5).unwrap();
        assert_eq!(sink.received_by(&alice), 15);

        sink.reject(bob);
        assert!(sink.send(&bob, 7).is_err());
        assert_eq!(sink.received_by(&bob), 0);

        sink.accept(&bob);
        sink.send(&bob, 7).unwrap();
        assert_eq!(sink.total_paid(), 22);
        assert_eq!(sink.payouts.len(), 3);
    }
}
