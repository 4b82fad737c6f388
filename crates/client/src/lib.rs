//! Client SDK for bidding in sealed-bid auctions.
//!
//! This crate provides a high-level API for:
//! - Preparing sealed bids (commitment, opening and deposit)
//! - Keeping a local book of placed bids in placement order
//! - Building the reveal call from that book

pub mod bid;
pub mod book;

pub use bid::{create_bid, create_fake_bid, BidBuilder, BidError, PreparedBid};
pub use book::{BidBook, BookError};
