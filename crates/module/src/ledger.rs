//! Per-bidder ledger of sealed bids.
//!
//! Each bidder owns an ordered list of bids. The order is the contract with the
//! bidder: reveal tuples are matched against it by position. Bids are only ever
//! appended, and are marked consumed rather than removed.

use std::collections::HashMap;

use auction_types::{Address, Amount, Bid, Commitment};

/// Ordered bid lists keyed by bidder.
#[derive(Debug, Default, Clone)]
pub struct BidLedger {
    /// Bids per bidder, in placement order
    bids: HashMap<Address, Vec<Bid>>,

    /// Bidders in order of their first bid
    bidders: Vec<Address>,
}

impl BidLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new unconsumed bid and return its index.
    pub fn append(&mut self, bidder: Address, commitment: Commitment, deposit: Amount) -> usize {
        if !self.bids.contains_key(&bidder) {
            self.bidders.push(bidder);
        }
        let entries = self.bids.entry(bidder).or_default();
        entries.push(Bid::new(commitment, deposit));
        entries.len() - 1
    }

    /// Bids placed by `bidder`, in placement order.
    pub fn entries_of(&self, bidder: &Address) -> &[Bid] {
        self.bids.get(bidder).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of bids placed by `bidder`, consumed or not.
    pub fn count_of(&self, bidder: &Address) -> usize {
        self.entries_of(bidder).len()
    }

    /// Index of the first consumed bid of `bidder`, if any.
    pub fn first_consumed(&self, bidder: &Address) -> Option<usize> {
        self.entries_of(bidder).iter().position(Bid::is_consumed)
    }

    /// Mark a bid consumed and return its commitment and deposit.
    ///
    /// Returns `None` if the bid does not exist or was already consumed.
    pub(crate) fn consume(&mut self, bidder: &Address, index: usize) -> Option<(Commitment, Amount)> {
        let bid = self.bids.get_mut(bidder)?.get_mut(index)?;
        bid.consume().then_some((bid.commitment, bid.deposit))
    }

    /// Bidders in order of their first bid.
    pub fn bidders(&self) -> &[Address] {
        &self.bidders
    }

    /// Total number of bids in the ledger.
    pub fn len(&self) -> usize {
        self.bids.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bidders.is_empty()
    }

    /// Sum of deposits still locked in unconsumed bids.
    pub fn unconsumed_deposits(&self) -> Amount {
        self.bids
            .values()
            .flatten()
            .filter(|bid| !bid.is_consumed())
            .map(|bid| bid.deposit)
            .sum()
    }
}
