//! Genesis configuration for a blind auction.
//!
//! This module defines the parameters an auction is created with: who receives
//! the winning bid, how long each window lasts, and how reveals that do not
//! match their commitment are treated.

use auction_types::{Address, Timestamp};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Treatment of a revealed bid whose opening does not match its commitment.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRevealPolicy {
    /// Deposit stays locked in the auction
    #[default]
    Forfeit,
    /// Deposit is credited back to the bidder's pending returns
    Refund,
}

/// Genesis configuration for a blind auction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionGenesisConfig {
    /// Receives the winning bid on finalization
    pub beneficiary: Address,

    /// Length of the bidding window (seconds)
    pub bidding_duration: u64,

    /// Length of the reveal window (seconds)
    pub reveal_duration: u64,

    /// What happens to deposits of mismatched reveals
    #[serde(default)]
    pub invalid_reveal_policy: InvalidRevealPolicy,
}

impl Default for AuctionGenesisConfig {
    fn default() -> Self {
        Self {
            beneficiary: [0u8; 32],
            bidding_duration: 3600, // 1 hour
            reveal_duration: 3600,  // 1 hour
            invalid_reveal_policy: InvalidRevealPolicy::Forfeit,
        }
    }
}

/// Phase boundaries derived from a config and a start time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub bidding_end: Timestamp,
    pub reveal_end: Timestamp,
}

impl AuctionGenesisConfig {
    /// Create a config with the given beneficiary and durations.
    pub fn new(beneficiary: Address, bidding_duration: u64, reveal_duration: u64) -> Self {
        Self {
            beneficiary,
            bidding_duration,
            reveal_duration,
            ..Default::default()
        }
    }

    /// Use a different policy for mismatched reveals.
    pub fn with_policy(mut self, policy: InvalidRevealPolicy) -> Self {
        self.invalid_reveal_policy = policy;
        self
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.bidding_duration == 0 {
            return Err(GenesisValidationError::InvalidTiming(
                "Bidding duration cannot be zero".into(),
            ));
        }
        if self.reveal_duration == 0 {
            return Err(GenesisValidationError::InvalidTiming(
                "Reveal duration cannot be zero".into(),
            ));
        }
        Ok(())
    }

    /// Compute phase boundaries for an auction starting at `start`.
    pub fn schedule(&self, start: Timestamp) -> Result<Schedule, GenesisValidationError> {
        self.validate()?;

        let bidding_end = start
            .checked_add(self.bidding_duration)
            .ok_or(GenesisValidationError::TimestampOverflow)?;
        let reveal_end = bidding_end
            .checked_add(self.reveal_duration)
            .ok_or(GenesisValidationError::TimestampOverflow)?;

        Ok(Schedule {
            bidding_end,
            reveal_end,
        })
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid timing configuration: {0}")]
    InvalidTiming(String),

    #[error("Phase end time overflows")]
    TimestampOverflow,
}
