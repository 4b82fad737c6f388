//! Mock chain server for local testing of the blind auction.
//!
//! This provides a JSON-RPC server that hosts a single auction over a
//! simulated clock and an in-memory bank, without requiring a real blockchain.

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use auction_module::queries::{handle_query, AuctionQuery, AuctionQueryResponse};
use auction_module::{handlers, AuctionState as ModuleState, CallContext, Clock};
use auction_types::{Address, Secret, Timestamp};

mod bank;
mod types;
use bank::MockBank;
use types::*;

/// Seconds per simulated block.
const BLOCK_TIME: u64 = 12;

/// Shared chain state.
struct ChainState {
    /// The hosted auction, once initialized
    auction: Option<ModuleState>,
    /// Native currency
    bank: MockBank,
    /// Events drained from the auction, oldest first
    events: Vec<EventRpc>,
    /// Current block height (simulated)
    block_height: u64,
    /// Current timestamp (simulated, can be advanced)
    timestamp: Timestamp,
}

impl Clock for ChainState {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

impl ChainState {
    fn new() -> Self {
        Self {
            auction: None,
            bank: MockBank::new(),
            events: Vec::new(),
            block_height: 0,
            timestamp: 0,
        }
    }

    fn advance_block(&mut self) {
        self.block_height += 1;
        self.timestamp += BLOCK_TIME;
    }

    fn set_timestamp(&mut self, ts: Timestamp) -> Result<(), ErrorObjectOwned> {
        if ts < self.timestamp {
            return Err(rpc_error(&format!(
                "Time cannot go backwards (now {}, requested {})",
                self.timestamp, ts
            )));
        }
        self.timestamp = ts;
        Ok(())
    }

    fn context(&self, sender: Address) -> CallContext {
        CallContext::from_clock(sender, self)
    }

    fn init_auction(&mut self, config: &GenesisConfigRpc) -> Result<(), ErrorObjectOwned> {
        if self.auction.is_some() {
            return Err(rpc_error("Auction already initialized"));
        }
        if let Some(ts) = config.initial_timestamp {
            self.set_timestamp(ts)?;
        }

        let genesis = config
            .to_config()
            .map_err(|e| rpc_error(&format!("Invalid beneficiary: {}", e)))?;
        let auction = ModuleState::from_clock(&genesis, self)
            .map_err(|e| rpc_error(&format!("Invalid genesis config: {}", e)))?;

        info!(
            bidding_end = auction.bidding_end,
            reveal_end = auction.reveal_end,
            "Chain initialized"
        );
        self.auction = Some(auction);
        Ok(())
    }

    fn auction(&self) -> Result<&ModuleState, ErrorObjectOwned> {
        self.auction
            .as_ref()
            .ok_or_else(|| rpc_error("Auction not initialized"))
    }

    /// Move events recorded by the auction into the chain log.
    fn collect_events(&mut self) {
        let Some(auction) = self.auction.as_mut() else {
            return;
        };
        for event in auction.drain_events() {
            self.events
                .push(EventRpc::new(self.block_height, self.timestamp, &event));
        }
    }
}

/// Command line options.
#[derive(Parser)]
#[command(name = "mock-chain")]
#[command(about = "Local JSON-RPC host for a blind auction")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Genesis config (JSON) to initialize the auction with at startup
    #[arg(long)]
    genesis: Option<PathBuf>,
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Initialize the chain with genesis config.
    #[method(name = "admin_init")]
    async fn admin_init(&self, config: GenesisConfigRpc) -> Result<bool, ErrorObjectOwned>;

    /// Mint funds into an account.
    #[method(name = "admin_fund")]
    async fn admin_fund(&self, address: String, amount: u64) -> Result<u64, ErrorObjectOwned>;

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    /// Make transfers to an account fail (for testing failed withdrawals).
    #[method(name = "admin_rejectTransfers")]
    async fn admin_reject_transfers(
        &self,
        address: String,
        reject: bool,
    ) -> Result<bool, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Place a sealed bid.
    #[method(name = "auction_placeBid")]
    async fn auction_place_bid(&self, params: PlaceBidParams) -> Result<u64, ErrorObjectOwned>;

    /// Reveal all of the sender's bids.
    #[method(name = "auction_reveal")]
    async fn auction_reveal(&self, params: RevealParams) -> Result<bool, ErrorObjectOwned>;

    /// Finalize the auction.
    #[method(name = "auction_finalize")]
    async fn auction_finalize(&self, sender: String)
        -> Result<AuctionOutcomeRpc, ErrorObjectOwned>;

    /// Withdraw the sender's pending returns.
    #[method(name = "auction_withdraw")]
    async fn auction_withdraw(&self, sender: String) -> Result<u64, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Get an account's free balance.
    #[method(name = "chain_getBalance")]
    async fn chain_get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned>;

    /// Get an overview of the auction.
    #[method(name = "query_getSummary")]
    async fn query_get_summary(&self) -> Result<Option<AuctionSummaryRpc>, ErrorObjectOwned>;

    /// Get all bids of a bidder, in placement order.
    #[method(name = "query_getBids")]
    async fn query_get_bids(&self, bidder: String) -> Result<Vec<BidRpc>, ErrorObjectOwned>;

    /// Get an address's pending returns.
    #[method(name = "query_getPendingReturn")]
    async fn query_get_pending_return(&self, address: String) -> Result<u64, ErrorObjectOwned>;

    /// Get events recorded since the given offset.
    #[method(name = "query_getEvents")]
    async fn query_get_events(&self, from: u64) -> Result<Vec<EventRpc>, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainServer {
    fn new(state: ChainState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

fn rpc_error(msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
}

fn parse_address(s: &str) -> Result<Address, ErrorObjectOwned> {
    auction_crypto::parse_address(s).map_err(|e| rpc_error(&format!("Invalid address: {}", e)))
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_init(&self, config: GenesisConfigRpc) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.init_auction(&config)?;
        Ok(true)
    }

    async fn admin_fund(&self, address: String, amount: u64) -> Result<u64, ErrorObjectOwned> {
        let address = parse_address(&address)?;
        let mut state = self.state.write();
        let balance = state
            .bank
            .fund(address, amount)
            .map_err(|e| rpc_error(&format!("Failed to fund: {}", e)))?;

        info!(address = %hex::encode(address), amount, balance, "Account funded");
        Ok(balance)
    }

    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.advance_block();
        Ok(BlockInfo {
            height: state.block_height,
            timestamp: state.timestamp,
        })
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.set_timestamp(timestamp)?;
        info!("Timestamp set to {}", timestamp);
        Ok(true)
    }

    async fn admin_reject_transfers(
        &self,
        address: String,
        reject: bool,
    ) -> Result<bool, ErrorObjectOwned> {
        let address = parse_address(&address)?;
        self.state.write().bank.set_rejecting(address, reject);
        Ok(true)
    }

    async fn auction_place_bid(&self, params: PlaceBidParams) -> Result<u64, ErrorObjectOwned> {
        let sender = parse_address(&params.sender)?;
        let commitment = auction_crypto::parse_commitment(&params.commitment)
            .map_err(|e| rpc_error(&format!("Invalid commitment: {}", e)))?;

        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = state.context(sender).with_value(params.deposit);
        let auction = state
            .auction
            .as_mut()
            .ok_or_else(|| rpc_error("Auction not initialized"))?;

        state
            .bank
            .lock(&sender, params.deposit)
            .map_err(|e| rpc_error(&format!("Failed to lock deposit: {}", e)))?;

        let index = match handlers::handle_place_bid(auction, &ctx, commitment) {
            Ok(index) => index,
            Err(e) => {
                if let Err(unlock) = state.bank.unlock(&sender, params.deposit) {
                    warn!(error = %unlock, "Failed to return deposit of rejected bid");
                }
                return Err(rpc_error(&format!("Failed to place bid: {}", e)));
            }
        };
        state.collect_events();

        info!("Bid {} placed by {}", index, params.sender);
        Ok(index as u64)
    }

    async fn auction_reveal(&self, params: RevealParams) -> Result<bool, ErrorObjectOwned> {
        let sender = parse_address(&params.sender)?;
        let secrets = params
            .secrets
            .iter()
            .map(|s| auction_crypto::parse_secret(s))
            .collect::<Result<Vec<Secret>, _>>()
            .map_err(|e| rpc_error(&format!("Invalid secret: {}", e)))?;

        let mut state = self.state.write();
        let ctx = state.context(sender);
        let auction = state
            .auction
            .as_mut()
            .ok_or_else(|| rpc_error("Auction not initialized"))?;

        handlers::handle_reveal(auction, &ctx, &params.values, &params.fakes, &secrets)
            .map_err(|e| rpc_error(&format!("Failed to reveal: {}", e)))?;
        state.collect_events();

        info!("{} bids revealed by {}", secrets.len(), params.sender);
        Ok(true)
    }

    async fn auction_finalize(
        &self,
        sender: String,
    ) -> Result<AuctionOutcomeRpc, ErrorObjectOwned> {
        let sender = parse_address(&sender)?;
        let mut state = self.state.write();
        let ctx = state.context(sender);
        let auction = state
            .auction
            .as_mut()
            .ok_or_else(|| rpc_error("Auction not initialized"))?;

        let outcome = handlers::handle_finalize(auction, &ctx)
            .map_err(|e| rpc_error(&format!("Failed to finalize: {}", e)))?;
        state.collect_events();

        Ok(AuctionOutcomeRpc::from(outcome))
    }

    async fn auction_withdraw(&self, sender: String) -> Result<u64, ErrorObjectOwned> {
        let address = parse_address(&sender)?;
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = state.context(address);
        let auction = state
            .auction
            .as_mut()
            .ok_or_else(|| rpc_error("Auction not initialized"))?;

        let amount = handlers::handle_withdraw(auction, &ctx, &mut state.bank)
            .map_err(|e| rpc_error(&format!("Failed to withdraw: {}", e)))?;
        state.collect_events();

        if amount > 0 {
            info!("{} withdrawn by {}", amount, sender);
        }
        Ok(amount)
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(BlockInfo {
            height: state.block_height,
            timestamp: state.timestamp,
        })
    }

    async fn chain_get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let address = parse_address(&address)?;
        Ok(self.state.read().bank.balance_of(&address))
    }

    async fn query_get_summary(&self) -> Result<Option<AuctionSummaryRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        let Some(auction) = state.auction.as_ref() else {
            return Ok(None);
        };
        match handle_query(auction, AuctionQuery::GetSummary, state.now()) {
            AuctionQueryResponse::Summary(summary) => Ok(Some(summary.into())),
            _ => Err(rpc_error("Unexpected query response")),
        }
    }

    async fn query_get_bids(&self, bidder: String) -> Result<Vec<BidRpc>, ErrorObjectOwned> {
        let bidder = parse_address(&bidder)?;
        let state = self.state.read();
        let auction = state.auction()?;
        match handle_query(auction, AuctionQuery::GetBids { bidder }, state.now()) {
            AuctionQueryResponse::Bids(bids) => Ok(bids.iter().map(BidRpc::from).collect()),
            _ => Err(rpc_error("Unexpected query response")),
        }
    }

    async fn query_get_pending_return(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let address = parse_address(&address)?;
        let state = self.state.read();
        Ok(state.auction()?.pending_return(&address))
    }

    async fn query_get_events(&self, from: u64) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.events.iter().skip(from as usize).cloned().collect())
    }
}

fn load_genesis(path: &Path) -> Result<GenesisConfigRpc> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading genesis file {}", path.display()))?;
    serde_json::from_str(&data).context("parsing genesis file")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("auction_module=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut chain = ChainState::new();
    if let Some(path) = &args.genesis {
        let genesis = load_genesis(path)?;
        chain
            .init_auction(&genesis)
            .map_err(|e| anyhow::anyhow!("{}", e.message()))?;
    }

    info!("Starting mock chain server on {}", args.listen);

    let server = Server::builder().build(args.listen).await?;
    let handle = server.start(MockChainServer::new(chain).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
