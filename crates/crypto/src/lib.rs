//! Commitment primitives for sealed-bid auctions.
//!
//! # Overview
//!
//! Bidders never publish their bid value during the bidding window. Instead
//! they publish a commitment to `(value, fake, secret)` and lock a deposit:
//!
//! 1. **Commit**: the bidder picks a secret and submits
//!    `commit(value, fake, secret)` together with a deposit.
//!
//! 2. **Reveal**: once bidding closes, the bidder discloses the opening. The
//!    auction recomputes the commitment and compares.
//!
//! Decoy bids (`fake = true`) let a bidder hide how many real bids they made.

pub mod commitment;
pub mod error;
pub mod secret;

pub use commitment::{commit, commit_opening, encode_preimage, verify, verify_opening};
pub use error::CryptoError;
pub use secret::{parse_address, parse_commitment, parse_secret, random_secret, secret_from_label};
