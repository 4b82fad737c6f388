//! Call message types for the auction module.

use auction_types::{Amount, AuctionOutcome, Commitment, Secret};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Call messages for the auction module.
///
/// The sender and any attached deposit come from the
/// [`CallContext`](crate::handlers::CallContext), not from the message.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionCall {
    /// Place a sealed bid. The attached value is the deposit.
    PlaceBid { commitment: Commitment },

    /// Reveal every bid the sender has placed, in placement order.
    Reveal {
        values: Vec<Amount>,
        fakes: Vec<bool>,
        secrets: Vec<Secret>,
    },

    /// Close the auction and credit the beneficiary (anyone).
    Finalize,

    /// Pay out the sender's pending returns.
    Withdraw,
}

impl AuctionCall {
    pub fn name(&self) -> &'static str {
        match self {
            AuctionCall::PlaceBid { .. } => "place_bid",
            AuctionCall::Reveal { .. } => "reveal",
            AuctionCall::Finalize => "finalize",
            AuctionCall::Withdraw => "withdraw",
        }
    }
}

/// Result of a successfully applied call.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum CallOutcome {
    /// Index of the new bid in the sender's ledger
    BidPlaced { index: u64 },
    Revealed,
    Finalized(AuctionOutcome),
    /// Amount paid out (zero when nothing was owed)
    Withdrawn { amount: Amount },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_borsh_roundtrip() {
        let call = AuctionCall::Reveal {
            values: vec![100, 150],
            fakes: vec![false, true],
            secrets: vec![Secret([1u8; 32]), Secret([2u8; 32])],
        };
        let bytes = borsh::to_vec(&call).unwrap();
        let decoded: AuctionCall = borsh::from_slice(&bytes).unwrap();
        assert_eq!(call, decoded);
        assert_eq!(decoded.name(), "reveal");
    }
}
