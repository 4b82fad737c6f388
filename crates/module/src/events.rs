//! Events recorded by the auction as state changes.

use auction_types::{Address, Amount};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Tagged auction event. Hosts drain these after each call.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionEvent {
    /// A sealed bid was appended to the ledger.
    BidPlaced {
        bidder: Address,
        index: u64,
        deposit: Amount,
    },
    /// A revealed bid became the new highest bid.
    HighestBidIncreased { bidder: Address, amount: Amount },
    /// A revealed bid did not match its commitment; the deposit was kept.
    BidForfeited {
        bidder: Address,
        index: u64,
        deposit: Amount,
    },
    /// A revealed bid did not match its commitment; the deposit was refunded.
    BidVoided {
        bidder: Address,
        index: u64,
        deposit: Amount,
    },
    /// The auction was finalized.
    AuctionEnded {
        winner: Option<Address>,
        amount: Amount,
    },
    /// Pending funds were paid out.
    Withdrawn { to: Address, amount: Amount },
}

impl AuctionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuctionEvent::BidPlaced { .. } => "BidPlaced",
            AuctionEvent::HighestBidIncreased { .. } => "HighestBidIncreased",
            AuctionEvent::BidForfeited { .. } => "BidForfeited",
            AuctionEvent::BidVoided { .. } => "BidVoided",
            AuctionEvent::AuctionEnded { .. } => "AuctionEnded",
            AuctionEvent::Withdrawn { .. } => "Withdrawn",
        }
    }
}
