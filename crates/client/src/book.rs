//! Local record of a bidder's prepared bids.
//!
//! Reveal must supply one opening per placed bid, in placement order. The book
//! keeps the openings in that order so the reveal arrays can be rebuilt later,
//! and can be checked against the bids the auction actually holds.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use auction_module::AuctionCall;
use auction_types::{Amount, Bid, Secret};

use crate::bid::PreparedBid;

/// Errors from loading, saving or checking a bid book.
#[derive(Debug, Error)]
pub enum BookError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bid book: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Auction holds {ledger} bids but the book has {book}")]
    CountMismatch { ledger: usize, book: usize },

    #[error("Bid {index} has a different commitment on the auction")]
    CommitmentMismatch { index: usize },

    #[error("Bid {index} has deposit {ledger} on the auction but {book} in the book")]
    DepositMismatch {
        index: usize,
        ledger: Amount,
        book: Amount,
    },
}

/// Prepared bids in placement order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidBook {
    bids: Vec<PreparedBid>,
}

impl BidBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a bid after it was placed. Returns its expected ledger index.
    pub fn record(&mut self, bid: PreparedBid) -> usize {
        self.bids.push(bid);
        self.bids.len() - 1
    }

    pub fn bids(&self) -> &[PreparedBid] {
        &self.bids
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    /// Sum of all recorded deposits.
    pub fn total_deposit(&self) -> Amount {
        self.bids.iter().map(|bid| bid.deposit).sum()
    }

    /// Load a book from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BookError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Load a book, or start an empty one if the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, BookError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        Self::load(path)
    }

    /// Write the book as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BookError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Check the book lines up with the bids the auction holds for this bidder.
    pub fn check_alignment(&self, on_ledger: &[Bid]) -> Result<(), BookError> {
        if on_ledger.len() != self.bids.len() {
            return Err(BookError::CountMismatch {
                ledger: on_ledger.len(),
                book: self.bids.len(),
            });
        }

        for (index, (held, prepared)) in on_ledger.iter().zip(&self.bids).enumerate() {
            if held.commitment != prepared.commitment {
                return Err(BookError::CommitmentMismatch { index });
            }
            if held.deposit != prepared.deposit {
                return Err(BookError::DepositMismatch {
                    index,
                    ledger: held.deposit,
                    book: prepared.deposit,
                });
            }
        }

        Ok(())
    }

    /// Reveal arguments in placement order.
    pub fn reveal_arrays(&self) -> (Vec<Amount>, Vec<bool>, Vec<Secret>) {
        let values = self.bids.iter().map(|bid| bid.opening.value).collect();
        let fakes = self.bids.iter().map(|bid| bid.opening.fake).collect();
        let secrets = self.bids.iter().map(|bid| bid.opening.secret).collect();
        (values, fakes, secrets)
    }

    pub fn to_reveal_call(&self) -> AuctionCall {
        let (values, fakes, secrets) = self.reveal_arrays();
        AuctionCall::Reveal {
            values,
            fakes,
            secrets,
        }
    }
}
