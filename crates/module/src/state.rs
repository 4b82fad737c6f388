//! State structures for a single blind auction.

use std::collections::HashMap;

use auction_types::{Address, Amount, AuctionPhase, Bid, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::AuctionEvent;
use crate::genesis::{AuctionGenesisConfig, GenesisValidationError, InvalidRevealPolicy};
use crate::host::Clock;
use crate::ledger::BidLedger;

/// Auction state.
///
/// One value per auction, owned by the host that created it. Handlers take it
/// by `&mut` and either apply a call completely or leave it untouched.
#[derive(Debug, Clone)]
pub struct AuctionState {
    /// Receives the winning bid on finalization
    pub beneficiary: Address,

    /// Bids are accepted while `now < bidding_end`
    pub bidding_end: Timestamp,

    /// Reveals are accepted while `bidding_end <= now < reveal_end`
    pub reveal_end: Timestamp,

    /// Treatment of reveals that do not match their commitment
    pub invalid_reveal_policy: InvalidRevealPolicy,

    /// Current highest valid bid (escrowed until finalization)
    highest_bid: Amount,

    /// Holder of the highest bid
    highest_bidder: Option<Address>,

    /// Set once by finalize
    ended: bool,

    /// Sealed bids per bidder
    pub(crate) ledger: BidLedger,

    /// Funds owed but not yet withdrawn
    pending_returns: HashMap<Address, Amount>,

    /// Events not yet drained by the host
    events: Vec<AuctionEvent>,

    /// Sum of all deposits ever accepted
    total_deposited: Amount,

    /// Sum of all successful withdrawals
    total_withdrawn: Amount,

    /// Sum of deposits kept from mismatched reveals
    total_forfeited: Amount,
}

/// Snapshot of where every deposited unit currently sits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundTotals {
    pub deposited: Amount,
    pub unconsumed: Amount,
    pub pending: Amount,
    pub escrowed: Amount,
    pub withdrawn: Amount,
    pub forfeited: Amount,
}

impl FundTotals {
    /// Sum of all buckets other than `deposited`.
    pub fn accounted(&self) -> u128 {
        [
            self.unconsumed,
            self.pending,
            self.escrowed,
            self.withdrawn,
            self.forfeited,
        ]
        .iter()
        .map(|v| *v as u128)
        .sum()
    }

    /// Whether every deposited unit is accounted for exactly once.
    pub fn is_balanced(&self) -> bool {
        self.accounted() == self.deposited as u128
    }
}

impl AuctionState {
    /// Create a new auction starting at `now`.
    pub fn new(config: &AuctionGenesisConfig, now: Timestamp) -> Result<Self, GenesisValidationError> {
        let schedule = config.schedule(now)?;

        info!(
            beneficiary = %hex::encode(config.beneficiary),
            bidding_end = schedule.bidding_end,
            reveal_end = schedule.reveal_end,
            "Auction created"
        );

        Ok(Self {
            beneficiary: config.beneficiary,
            bidding_end: schedule.bidding_end,
            reveal_end: schedule.reveal_end,
            invalid_reveal_policy: config.invalid_reveal_policy,
            highest_bid: 0,
            highest_bidder: None,
            ended: false,
            ledger: BidLedger::new(),
            pending_returns: HashMap::new(),
            events: Vec::new(),
            total_deposited: 0,
            total_withdrawn: 0,
            total_forfeited: 0,
        })
    }

    /// Create a new auction starting at the clock's current time.
    pub fn from_clock(
        config: &AuctionGenesisConfig,
        clock: &impl Clock,
    ) -> Result<Self, GenesisValidationError> {
        Self::new(config, clock.now())
    }

    /// Phase of the auction at time `now`.
    pub fn phase(&self, now: Timestamp) -> AuctionPhase {
        if self.ended {
            AuctionPhase::Ended
        } else if now < self.bidding_end {
            AuctionPhase::Bidding
        } else if now < self.reveal_end {
            AuctionPhase::Reveal
        } else {
            AuctionPhase::AwaitingFinalization
        }
    }

    pub fn highest_bid(&self) -> Amount {
        self.highest_bid
    }

    pub fn highest_bidder(&self) -> Option<Address> {
        self.highest_bidder
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn ledger(&self) -> &BidLedger {
        &self.ledger
    }

    /// Bids placed by `bidder`, in placement order.
    pub fn entries_of(&self, bidder: &Address) -> &[Bid] {
        self.ledger.entries_of(bidder)
    }

    /// Funds owed to `address` and not yet withdrawn.
    pub fn pending_return(&self, address: &Address) -> Amount {
        self.pending_returns.get(address).copied().unwrap_or(0)
    }

    /// All non-zero pending balances.
    pub fn pending_returns(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.pending_returns.iter().filter(|(_, amount)| **amount > 0)
    }

    /// Events recorded since the last drain.
    pub fn events(&self) -> &[AuctionEvent] {
        &self.events
    }

    /// Take all recorded events.
    pub fn drain_events(&mut self) -> Vec<AuctionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    /// Where every deposited unit currently sits.
    pub fn fund_totals(&self) -> FundTotals {
        FundTotals {
            deposited: self.total_deposited,
            unconsumed: self.ledger.unconsumed_deposits(),
            pending: self.pending_returns.values().sum(),
            escrowed: if self.ended { 0 } else { self.highest_bid },
            withdrawn: self.total_withdrawn,
            forfeited: self.total_forfeited,
        }
    }

    /// Check the conservation-of-funds invariant.
    pub fn is_balanced(&self) -> bool {
        self.fund_totals().is_balanced()
    }

    // === Mutations used by the handlers ===

    pub(crate) fn record(&mut self, event: AuctionEvent) {
        self.events.push(event);
    }

    pub(crate) fn set_total_deposited(&mut self, total: Amount) {
        self.total_deposited = total;
    }

    /// Credit `amount` to the pending balance of `address`.
    ///
    /// Credits never exceed total deposits, which are bounded by `Amount::MAX`.
    pub(crate) fn credit(&mut self, address: Address, amount: Amount) {
        if amount == 0 {
            return;
        }
        *self.pending_returns.entry(address).or_insert(0) += amount;
    }

    /// Zero the pending balance of `address` and return what it held.
    pub(crate) fn take_pending(&mut self, address: &Address) -> Amount {
        self.pending_returns.remove(address).unwrap_or(0)
    }

    pub(crate) fn add_forfeited(&mut self, amount: Amount) {
        self.total_forfeited += amount;
    }

    pub(crate) fn add_withdrawn(&mut self, amount: Amount) {
        self.total_withdrawn += amount;
    }

    /// Make `candidate` the highest bidder if `value` beats the current bid.
    ///
    /// Ties keep the incumbent. The displaced leader's escrowed bid moves to
    /// their pending returns.
    pub(crate) fn try_place(&mut self, candidate: Address, value: Amount) -> bool {
        if value <= self.highest_bid {
            return false;
        }

        if let Some(previous) = self.highest_bidder {
            self.credit(previous, self.highest_bid);
        }

        self.highest_bid = value;
        self.highest_bidder = Some(candidate);

        info!(bidder = %hex::encode(candidate), amount = value, "Highest bid increased");
        self.record(AuctionEvent::HighestBidIncreased {
            bidder: candidate,
            amount: value,
        });

        true
    }

    /// Mark the auction ended and return the winning bid and bidder.
    pub(crate) fn end(&mut self) -> (Option<Address>, Amount) {
        self.ended = true;
        (self.highest_bidder, self.highest_bid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ManualClock;

    fn new_state() -> AuctionState {
        let config = AuctionGenesisConfig::new([9u8; 32], 100, 50);
        AuctionState::new(&config, 1_000).unwrap()
    }

    #[test]
    fn test_schedule_from_clock() {
        let clock = ManualClock::new(500);
        let config = AuctionGenesisConfig::new([9u8; 32], 100, 50);
        let state = AuctionState::from_clock(&config, &clock).unwrap();
        assert_eq!(state.bidding_end, 600);
        assert_eq!(state.reveal_end, 650);
    }

    #[test]
    fn test_phase_boundaries() {
        let state = new_state();
        assert_eq!(state.phase(1_000), AuctionPhase::Bidding);
        assert_eq!(state.phase(1_099), AuctionPhase::Bidding);
        assert_eq!(state.phase(1_100), AuctionPhase::Reveal);
        assert_eq!(state.phase(1_149), AuctionPhase::Reveal);
        assert_eq!(state.phase(1_150), AuctionPhase::AwaitingFinalization);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AuctionGenesisConfig::new([9u8; 32], 0, 50);
        assert!(AuctionState::new(&config, 0).is_err());
    }

    #[test]
    fn test_pending_operations() {
        let mut state = new_state();
        let addr = [1u8; 32];

        assert_eq!(state.pending_return(&addr), 0);

        state.credit(addr, 100);
        state.credit(addr, 50);
        state.credit(addr, 0);
        assert_eq!(state.pending_return(&addr), 150);

        assert_eq!(state.take_pending(&addr), 150);
        assert_eq!(state.pending_return(&addr), 0);
        assert_eq!(state.take_pending(&addr), 0);
    }

    #[test]
    fn test_try_place_strictly_greater() {
        let mut state = new_state();
        let alice = [1u8; 32];
        let bob = [2u8; 32];

        assert!(!state.try_place(alice, 0));
        assert!(state.try_place(alice, 100));
        assert!(!state.try_place(bob, 100));
        assert_eq!(state.highest_bidder(), Some(alice));
        assert_eq!(state.pending_return(&alice), 0);

        assert!(state.try_place(bob, 101));
        assert_eq!(state.highest_bid(), 101);
        assert_eq!(state.highest_bidder(), Some(bob));
        assert_eq!(state.pending_return(&alice), 100);

        let increases = state
            .events()
            .iter()
            .filter(|e| matches!(e, AuctionEvent::HighestBidIncreased { .. }))
            .count();
        assert_eq!(increases, 2);
    }

    #[test]
    fn test_fund_totals_accounted() {
        let totals = FundTotals {
            deposited: 300,
            unconsumed: 50,
            pending: 100,
            escrowed: 150,
            withdrawn: 0,
            forfeited: 0,
        };
        assert!(totals.is_balanced());
        assert!(!FundTotals {
            withdrawn: 1,
            ..totals
        }
        .is_balanced());
    }
}
