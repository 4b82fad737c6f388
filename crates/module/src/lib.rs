//! Sealed-bid auction module with a commit-reveal protocol.
//!
//! This module implements the host-agnostic logic of a blind auction:
//!
//! - Sealed bid placement with locked deposits
//! - Batched reveal matched positionally against each bidder's bids
//! - Highest-bid tracking with escrow of the leading bid
//! - Pull-based returns for outbid, decoy and excess deposits
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `queries`: Read-only state access
//! - `state`: Auction state and fund accounting
//! - `ledger`: Per-bidder bid lists
//! - `host`: Clock and transfer capabilities supplied by the host
//! - `events`: Structured record of state changes
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{handlers, AuctionGenesisConfig, AuctionState, CallContext};
//!
//! let mut state = AuctionState::new(&AuctionGenesisConfig::new(beneficiary, 3600, 600), now)?;
//!
//! // Place a sealed bid
//! let ctx = CallContext::new(bidder, now).with_value(deposit);
//! handlers::handle_place_bid(&mut state, &ctx, commitment)?;
//!
//! // Later, reveal it
//! handlers::handle_reveal(&mut state, &ctx, &[value], &[false], &[secret])?;
//! ```

pub mod call;
pub mod error;
pub mod events;
pub mod genesis;
pub mod handlers;
pub mod host;
pub mod ledger;
pub mod queries;
pub mod state;

pub use call::{AuctionCall, CallOutcome};
pub use error::AuctionError;
pub use events::AuctionEvent;
pub use genesis::{AuctionGenesisConfig, GenesisValidationError, InvalidRevealPolicy, Schedule};
pub use handlers::{CallContext, HandlerResult};
pub use host::{Clock, InMemoryTransfer, ManualClock, Transfer, TransferError};
pub use ledger::BidLedger;
pub use queries::{AuctionQuery, AuctionQueryResponse, AuctionSummary};
pub use state::{AuctionState, FundTotals};
