//! Query handlers for the auction module.
//!
//! These functions provide read-only access to auction state.

use auction_types::{Address, Amount, AuctionPhase, Bid, Timestamp};
use serde::{Deserialize, Serialize};

use crate::genesis::InvalidRevealPolicy;
use crate::state::{AuctionState as ModuleState, FundTotals};

/// Query request types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Get an overview of the auction.
    GetSummary,

    /// Get the phase at the query time.
    GetPhase,

    /// Get all bids of a bidder, in placement order.
    GetBids { bidder: Address },

    /// Get all bidders, in order of their first bid.
    ListBidders,

    /// Get the current highest bid and its bidder.
    GetHighestBid,

    /// Get an address's pending returns.
    GetPendingReturn { address: Address },

    /// Get the fund accounting snapshot.
    GetFundTotals,
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    Summary(AuctionSummary),

    Phase(AuctionPhase),

    /// Bids of one bidder.
    Bids(Vec<Bid>),

    Bidders(Vec<Address>),

    HighestBid {
        bidder: Option<Address>,
        amount: Amount,
    },

    /// Pending balance.
    PendingReturn(Amount),

    FundTotals(FundTotals),
}

/// Handle a query at time `now`.
pub fn handle_query(state: &ModuleState, query: AuctionQuery, now: Timestamp) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetSummary => {
            AuctionQueryResponse::Summary(AuctionSummary::from_state(state, now))
        }

        AuctionQuery::GetPhase => AuctionQueryResponse::Phase(state.phase(now)),

        AuctionQuery::GetBids { bidder } => {
            AuctionQueryResponse::Bids(state.entries_of(&bidder).to_vec())
        }

        AuctionQuery::ListBidders => {
            AuctionQueryResponse::Bidders(state.ledger().bidders().to_vec())
        }

        AuctionQuery::GetHighestBid => AuctionQueryResponse::HighestBid {
            bidder: state.highest_bidder(),
            amount: state.highest_bid(),
        },

        AuctionQuery::GetPendingReturn { address } => {
            AuctionQueryResponse::PendingReturn(state.pending_return(&address))
        }

        AuctionQuery::GetFundTotals => AuctionQueryResponse::FundTotals(state.fund_totals()),
    }
}

/// Summary of an auction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub beneficiary: Address,
    pub phase: AuctionPhase,
    pub bidding_end: Timestamp,
    pub reveal_end: Timestamp,
    pub invalid_reveal_policy: InvalidRevealPolicy,
    pub highest_bid: Amount,
    pub highest_bidder: Option<Address>,
    pub num_bidders: usize,
    pub num_bids: usize,
    pub total_deposited: Amount,
}

impl AuctionSummary {
    /// Create summary from auction state.
    pub fn from_state(state: &ModuleState, now: Timestamp) -> Self {
        Self {
            beneficiary: state.beneficiary,
            phase: state.phase(now),
            bidding_end: state.bidding_end,
            reveal_end: state.reveal_end,
            invalid_reveal_policy: state.invalid_reveal_policy,
            highest_bid: state.highest_bid(),
            highest_bidder: state.highest_bidder(),
            num_bidders: state.ledger().bidders().len(),
            num_bids: state.ledger().len(),
            total_deposited: state.total_deposited(),
        }
    }
}

/// Bidders who still hold unrevealed bids.
pub fn get_unrevealed_bidders(state: &ModuleState) -> Vec<Address> {
    state
        .ledger()
        .bidders()
        .iter()
        .filter(|bidder| state.entries_of(bidder).iter().any(|bid| !bid.is_consumed()))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::AuctionGenesisConfig;
    use crate::handlers::{handle_place_bid, CallContext};
    use auction_types::Commitment;

    fn setup_state() -> ModuleState {
        let config = AuctionGenesisConfig::new([9u8; 32], 100, 50);
        ModuleState::new(&config, 1_000).unwrap()
    }

    #[test]
    fn test_get_pending_return_query() {
        let state = setup_state();
        let response = handle_query(&state, AuctionQuery::GetPendingReturn { address: [1u8; 32] }, 1_000);
        assert_eq!(response, AuctionQueryResponse::PendingReturn(0));
    }

    #[test]
    fn test_get_phase_query() {
        let state = setup_state();
        assert_eq!(
            handle_query(&state, AuctionQuery::GetPhase, 1_120),
            AuctionQueryResponse::Phase(AuctionPhase::Reveal)
        );
    }

    #[test]
    fn test_summary_and_bids() {
        let mut state = setup_state();
        let alice = [1u8; 32];
        let ctx = CallContext::new(alice, 1_010).with_value(25);
        handle_place_bid(&mut state, &ctx, Commitment([4u8; 32])).unwrap();
        handle_place_bid(&mut state, &ctx, Commitment([5u8; 32])).unwrap();

        let AuctionQueryResponse::Summary(summary) = handle_query(&state, AuctionQuery::GetSummary, 1_010)
        else {
            panic!("expected summary");
        };
        assert_eq!(summary.phase, AuctionPhase::Bidding);
        assert_eq!(summary.num_bidders, 1);
        assert_eq!(summary.num_bids, 2);
        assert_eq!(summary.total_deposited, 50);

        let AuctionQueryResponse::Bids(bids) = handle_query(&state, AuctionQuery::GetBids { bidder: alice }, 1_010)
        else {
            panic!("expected bids");
        };
        assert_eq!(bids[1].commitment, Commitment([5u8; 32]));

        assert_eq!(get_unrevealed_bidders(&state), vec![alice]);
    }
}
