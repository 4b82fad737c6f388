//! RPC-compatible types for the mock chain.
//!
//! These types are JSON-serializable versions of the core auction types, with
//! byte arrays carried as hex strings.

use auction_crypto::CryptoError;
use auction_module::{AuctionEvent, AuctionGenesisConfig, AuctionSummary, InvalidRevealPolicy};
use auction_types::{AuctionOutcome, Bid};
use serde::{Deserialize, Serialize};

/// Genesis configuration for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfigRpc {
    /// Hex-encoded beneficiary address
    pub beneficiary: String,
    pub bidding_duration: u64,
    pub reveal_duration: u64,
    #[serde(default)]
    pub invalid_reveal_policy: InvalidRevealPolicy,
    /// Chain time to start from; the auction opens at this time
    pub initial_timestamp: Option<u64>,
}

impl GenesisConfigRpc {
    pub fn to_config(&self) -> Result<AuctionGenesisConfig, CryptoError> {
        let beneficiary = auction_crypto::parse_address(&self.beneficiary)?;
        Ok(
            AuctionGenesisConfig::new(beneficiary, self.bidding_duration, self.reveal_duration)
                .with_policy(self.invalid_reveal_policy),
        )
    }
}

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Parameters for placing a sealed bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBidParams {
    pub sender: String,
    /// Hex-encoded commitment (32 bytes)
    pub commitment: String,
    pub deposit: u64,
}

/// Parameters for revealing all of a sender's bids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealParams {
    pub sender: String,
    pub values: Vec<u64>,
    pub fakes: Vec<bool>,
    /// Hex-encoded secrets (32 bytes each)
    pub secrets: Vec<String>,
}

/// Sealed bid for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRpc {
    pub commitment: String,
    pub deposit: u64,
    pub consumed: bool,
}

impl From<&Bid> for BidRpc {
    fn from(b: &Bid) -> Self {
        Self {
            commitment: b.commitment.to_hex(),
            deposit: b.deposit,
            consumed: b.is_consumed(),
        }
    }
}

/// Auction overview for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionSummaryRpc {
    pub beneficiary: String,
    pub phase: String,
    pub bidding_end: u64,
    pub reveal_end: u64,
    pub invalid_reveal_policy: InvalidRevealPolicy,
    pub highest_bid: u64,
    pub highest_bidder: Option<String>,
    pub num_bidders: usize,
    pub num_bids: usize,
    pub total_deposited: u64,
}

impl From<AuctionSummary> for AuctionSummaryRpc {
    fn from(s: AuctionSummary) -> Self {
        Self {
            beneficiary: hex::encode(s.beneficiary),
            phase: s.phase.to_string(),
            bidding_end: s.bidding_end,
            reveal_end: s.reveal_end,
            invalid_reveal_policy: s.invalid_reveal_policy,
            highest_bid: s.highest_bid,
            highest_bidder: s.highest_bidder.map(hex::encode),
            num_bidders: s.num_bidders,
            num_bids: s.num_bids,
            total_deposited: s.total_deposited,
        }
    }
}

/// Finalization result for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionOutcomeRpc {
    pub winner: Option<String>,
    pub amount: u64,
}

impl From<AuctionOutcome> for AuctionOutcomeRpc {
    fn from(o: AuctionOutcome) -> Self {
        Self {
            winner: o.winner.map(hex::encode),
            amount: o.amount,
        }
    }
}

/// Auction event with the block it was recorded in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRpc {
    pub height: u64,
    pub timestamp: u64,
    pub name: String,
    /// Bidder, recipient or winner, when the event has one
    pub address: Option<String>,
    pub index: Option<u64>,
    pub amount: u64,
}

impl EventRpc {
    pub fn new(height: u64, timestamp: u64, event: &AuctionEvent) -> Self {
        let (address, index, amount) = match *event {
            AuctionEvent::BidPlaced {
                bidder,
                index,
                deposit,
            }
            | AuctionEvent::BidForfeited {
                bidder,
                index,
                deposit,
            }
            | AuctionEvent::BidVoided {
                bidder,
                index,
                deposit,
            } => (Some(bidder), Some(index), deposit),
            AuctionEvent::HighestBidIncreased { bidder, amount } => (Some(bidder), None, amount),
            AuctionEvent::AuctionEnded { winner, amount } => (winner, None, amount),
            AuctionEvent::Withdrawn { to, amount } => (Some(to), None, amount),
        };

        Self {
            height,
            timestamp,
            name: event.name().to_string(),
            address: address.map(hex::encode),
            index,
            amount,
        }
    }
}
