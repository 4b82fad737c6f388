//! Auction module error types.

use thiserror::Error;

use auction_types::{AuctionPhase, Timestamp};

/// Errors that can occur in the auction module.
///
/// Every error aborts the call that produced it without mutating state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Operation not allowed in {got} phase (expected {expected}, now {now})")]
    PhaseViolation {
        expected: AuctionPhase,
        got: AuctionPhase,
        now: Timestamp,
    },

    #[error("Reveal length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Bid {index} was already revealed")]
    AlreadyConsumed { index: usize },

    #[error("Auction already ended")]
    AlreadyEnded,

    #[error("Total deposits would overflow")]
    DepositOverflow,

    #[error("Transfer failed: {0}")]
    TransferFailed(String),
}
