//! Core type definitions for sealed-bid (blind) auctions.
//!
//! This crate provides the shared data structures used across the auction
//! system: identities and amounts, commitments and their openings, the bid
//! records kept by the ledger, and the auction lifecycle phases.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

// =========================
// PRIMITIVES
// =========================

/// Generic address type (32 bytes)
pub type Address = [u8; 32];

/// Amount of native currency units
pub type Amount = u64;

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Width in bytes of commitments and secrets.
pub const HASH_LEN: usize = 32;

/// Opaque commitment to `(value, fake, secret)`.
///
/// Produced by the commitment codec and only ever compared for equality.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Commitment(pub [u8; HASH_LEN]);

impl Commitment {
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Blinding secret chosen by the bidder (32 bytes).
#[derive(
    Clone, Copy, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Secret(pub [u8; HASH_LEN]);

impl Secret {
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// Secrets are never printed in full.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({}..)", hex::encode(&self.0[..4]))
    }
}

// =========================
// BIDS
// =========================

/// A sealed bid held in the ledger.
///
/// The commitment and deposit never change after creation. The `consumed`
/// marker is set once, when the bid is processed by a reveal.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Bid {
    pub commitment: Commitment,
    pub deposit: Amount,
    consumed: bool,
}

impl Bid {
    /// Create a new, unconsumed bid.
    pub fn new(commitment: Commitment, deposit: Amount) -> Self {
        Self {
            commitment,
            deposit,
            consumed: false,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Mark the bid consumed. Returns `false` if it already was.
    pub fn consume(&mut self) -> bool {
        if self.consumed {
            return false;
        }
        self.consumed = true;
        true
    }
}

/// The values a bidder discloses for one of their bids during reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BidOpening {
    /// Claimed bid value
    pub value: Amount,
    /// Whether the bid was a decoy
    pub fake: bool,
    /// Blinding secret
    pub secret: Secret,
}

// =========================
// AUCTION TYPES
// =========================

/// Auction lifecycle phase
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AuctionPhase {
    /// Before bidding_end: accepting sealed bids
    Bidding,
    /// Between bidding_end and reveal_end: accepting reveals
    Reveal,
    /// Reveal window closed, finalize not yet called
    AwaitingFinalization,
    /// Finalized; only withdrawals remain
    Ended,
}

impl AuctionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionPhase::Bidding => "bidding",
            AuctionPhase::Reveal => "reveal",
            AuctionPhase::AwaitingFinalization => "awaiting_finalization",
            AuctionPhase::Ended => "ended",
        }
    }
}

impl fmt::Display for AuctionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of finalizing an auction
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionOutcome {
    /// Highest valid bidder, if any bid was placed successfully
    pub winner: Option<Address>,
    /// Amount credited to the beneficiary
    pub amount: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bid_consumed_once() {
        let mut bid = Bid::new(Commitment([1u8; 32]), 100);
        assert!(!bid.is_consumed());
        assert!(bid.consume());
        assert!(bid.is_consumed());
        assert!(!bid.consume());
        assert_eq!(bid.deposit, 100);
    }

    #[test]
    fn test_bid_borsh_roundtrip_keeps_marker() {
        let mut bid = Bid::new(Commitment([7u8; 32]), 42);
        bid.consume();
        let encoded = borsh::to_vec(&bid).unwrap();
        let decoded: Bid = borsh::from_slice(&encoded).unwrap();
        assert_eq!(bid, decoded);
        assert!(decoded.is_consumed());
    }

    #[test]
    fn test_secret_debug_is_truncated() {
        let secret = Secret([0xab; 32]);
        assert_eq!(format!("{:?}", secret), "Secret(abababab..)");
    }

    #[test]
    fn test_phase_serde_names() {
        let json = serde_json::to_string(&AuctionPhase::AwaitingFinalization).unwrap();
        assert_eq!(json, "\"AwaitingFinalization\"");
        assert_eq!(AuctionPhase::Reveal.to_string(), "reveal");
    }
}
