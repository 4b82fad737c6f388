//! CLI for interacting with blind auctions.
//!
//! This binary provides commands for:
//! - Initializing an auction on the mock chain
//! - Placing sealed bids and recording them in a local bid book
//! - Revealing every recorded bid in one call
//! - Finalizing and withdrawing
//! - Querying auction status

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use auction_client::{BidBook, BidBuilder};
use auction_crypto::{parse_commitment, secret_from_label};
use auction_types::Bid;

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for sealed-bid commit-reveal auctions")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the auction
    Init {
        /// Beneficiary address (hex)
        #[arg(long)]
        beneficiary: String,

        /// Bidding window (seconds)
        #[arg(long, default_value = "3600")]
        bidding_duration: u64,

        /// Reveal window (seconds)
        #[arg(long, default_value = "3600")]
        reveal_duration: u64,

        /// Refund deposits of mismatched reveals instead of keeping them
        #[arg(long)]
        refund_invalid: bool,
    },

    /// Mint funds into an account
    Fund {
        /// Account address (hex)
        #[arg(long)]
        address: String,

        #[arg(long)]
        amount: u64,
    },

    /// Place a sealed bid and record it in the bid book
    Bid {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        /// Bid value (kept secret until reveal)
        #[arg(long, default_value = "0")]
        value: u64,

        /// Deposit (visible on-chain). Defaults to the value.
        #[arg(long)]
        deposit: Option<u64>,

        /// Place a decoy bid
        #[arg(long)]
        fake: bool,

        /// Use a short label as the secret instead of a random one
        #[arg(long)]
        secret_label: Option<String>,

        /// Bid book file
        #[arg(long)]
        book: PathBuf,
    },

    /// Reveal every bid in the bid book
    Reveal {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,

        /// Bid book file
        #[arg(long)]
        book: PathBuf,
    },

    /// Finalize the auction
    Finalize {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,
    },

    /// Withdraw pending returns
    Withdraw {
        /// Sender address (hex)
        #[arg(long)]
        sender: String,
    },

    /// Show auction status
    Status,

    /// List a bidder's sealed bids
    Bids {
        /// Bidder address (hex)
        #[arg(long)]
        bidder: String,
    },

    /// Show an address's pending returns
    Pending {
        /// Address (hex)
        #[arg(long)]
        address: String,
    },

    /// Show an account's free balance
    Balance {
        /// Address (hex)
        #[arg(long)]
        address: String,
    },

    /// Show auction events
    Events {
        /// Skip this many events
        #[arg(long, default_value = "0")]
        from: u64,
    },

    /// Advance chain time by one block (for testing)
    AdvanceBlock,

    /// Set chain timestamp (for testing)
    SetTimestamp {
        /// Unix timestamp to set
        #[arg(long)]
        timestamp: u64,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct BlockInfo {
    height: u64,
    timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct BidRpc {
    commitment: String,
    deposit: u64,
    consumed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuctionSummaryRpc {
    beneficiary: String,
    phase: String,
    bidding_end: u64,
    reveal_end: u64,
    invalid_reveal_policy: String,
    highest_bid: u64,
    highest_bidder: Option<String>,
    num_bidders: usize,
    num_bids: usize,
    total_deposited: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuctionOutcomeRpc {
    winner: Option<String>,
    amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct EventRpc {
    height: u64,
    timestamp: u64,
    name: String,
    address: Option<String>,
    index: Option<u64>,
    amount: u64,
}

async fn fetch_bids(client: &HttpClient, bidder: &str) -> Result<Vec<BidRpc>> {
    Ok(client.request("query_getBids", rpc_params![bidder]).await?)
}

async fn place_bid_cmd(
    client: &HttpClient,
    sender: &str,
    builder: BidBuilder,
    book_path: &Path,
) -> Result<()> {
    let mut book = BidBook::load_or_default(book_path)?;

    // The book must match what is already on chain, or reveal will fail later.
    let held = fetch_bids(client, sender).await?;
    if held.len() != book.len() {
        bail!(
            "Bid book has {} bids but the auction holds {}; use the matching book",
            book.len(),
            held.len()
        );
    }

    let mut rng = OsRng;
    let prepared = builder.build(&mut rng)?;

    let params = serde_json::json!({
        "sender": sender,
        "commitment": prepared.commitment.to_hex(),
        "deposit": prepared.deposit,
    });
    let index: u64 = client.request("auction_placeBid", rpc_params![params]).await?;

    let deposit = prepared.deposit;
    let fake = prepared.opening.fake;
    book.record(prepared);
    book.save(book_path)?;

    info!("Bid {} placed", index);
    println!("Bid placed");
    println!("  Index: {}", index);
    println!("  Deposit: {}", deposit);
    if fake {
        println!("  Decoy: yes");
    }
    println!("  Book: {}", book_path.display());

    Ok(())
}

async fn reveal_cmd(client: &HttpClient, sender: &str, book_path: &Path) -> Result<()> {
    let book = BidBook::load(book_path)?;

    let held = fetch_bids(client, sender).await?;
    let ledger = held
        .iter()
        .map(|b| -> Result<Bid> { Ok(Bid::new(parse_commitment(&b.commitment)?, b.deposit)) })
        .collect::<Result<Vec<_>>>()?;
    book.check_alignment(&ledger)?;

    let (values, fakes, secrets) = book.reveal_arrays();
    let params = serde_json::json!({
        "sender": sender,
        "values": values,
        "fakes": fakes,
        "secrets": secrets.iter().map(|s| s.to_hex()).collect::<Vec<_>>(),
    });
    let _: bool = client.request("auction_reveal", rpc_params![params]).await?;

    println!("Revealed {} bids", book.len());
    Ok(())
}

async fn status_cmd(client: &HttpClient) -> Result<()> {
    let summary: Option<AuctionSummaryRpc> =
        client.request("query_getSummary", rpc_params![]).await?;
    let block: BlockInfo = client.request("chain_getBlockInfo", rpc_params![]).await?;

    match summary {
        Some(s) => {
            println!("Auction:");
            println!("  Phase: {}", s.phase);
            println!("  Beneficiary: {}", s.beneficiary);
            println!("  Bidding ends: {}", s.bidding_end);
            println!("  Reveal ends: {}", s.reveal_end);
            println!("  Invalid reveals: {}", s.invalid_reveal_policy);
            println!("  Bidders: {} ({} bids)", s.num_bidders, s.num_bids);
            println!("  Deposited: {}", s.total_deposited);
            match s.highest_bidder {
                Some(bidder) => println!("  Highest bid: {} by {}", s.highest_bid, bidder),
                None => println!("  Highest bid: none"),
            }
        }
        None => {
            println!("Auction not initialized");
        }
    }
    println!("Chain: height={}, timestamp={}", block.height, block.timestamp);

    Ok(())
}

async fn bids_cmd(client: &HttpClient, bidder: &str) -> Result<()> {
    let bids = fetch_bids(client, bidder).await?;

    if bids.is_empty() {
        println!("No bids from {}", bidder);
    } else {
        println!("Bids from {}:", bidder);
        for (i, bid) in bids.iter().enumerate() {
            println!(
                "  [{}] Deposit: {}  Commitment: {}...{}",
                i,
                bid.deposit,
                &bid.commitment[..16],
                if bid.consumed { "  (revealed)" } else { "" }
            );
        }
    }

    Ok(())
}

async fn events_cmd(client: &HttpClient, from: u64) -> Result<()> {
    let events: Vec<EventRpc> = client.request("query_getEvents", rpc_params![from]).await?;

    for (i, e) in events.iter().enumerate() {
        let who = e.address.as_deref().map(|a| &a[..16]).unwrap_or("-");
        match e.index {
            Some(index) => println!(
                "{:>4} [{}@{}] {} {} #{} {}",
                from as usize + i,
                e.height,
                e.timestamp,
                e.name,
                who,
                index,
                e.amount
            ),
            None => println!(
                "{:>4} [{}@{}] {} {} {}",
                from as usize + i,
                e.height,
                e.timestamp,
                e.name,
                who,
                e.amount
            ),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client = HttpClientBuilder::default().build(&cli.rpc)?;

    match cli.command {
        Commands::Init {
            beneficiary,
            bidding_duration,
            reveal_duration,
            refund_invalid,
        } => {
            let params = serde_json::json!({
                "beneficiary": beneficiary,
                "bidding_duration": bidding_duration,
                "reveal_duration": reveal_duration,
                "invalid_reveal_policy": if refund_invalid { "refund" } else { "forfeit" },
            });
            let _: bool = client.request("admin_init", rpc_params![params]).await?;
            println!("Auction initialized");
        }

        Commands::Fund { address, amount } => {
            let balance: u64 = client
                .request("admin_fund", rpc_params![address, amount])
                .await?;
            println!("Balance: {}", balance);
        }

        Commands::Bid {
            sender,
            value,
            deposit,
            fake,
            secret_label,
            book,
        } => {
            let mut builder = BidBuilder::new().value(value).fake(fake);
            if let Some(deposit) = deposit {
                builder = builder.deposit(deposit);
            }
            if let Some(label) = secret_label {
                warn!("Labelled secrets are guessable; use only for testing");
                builder = builder.secret(secret_from_label(&label)?);
            }
            place_bid_cmd(&client, &sender, builder, &book).await?;
        }

        Commands::Reveal { sender, book } => {
            reveal_cmd(&client, &sender, &book).await?;
        }

        Commands::Finalize { sender } => {
            let outcome: AuctionOutcomeRpc = client
                .request("auction_finalize", rpc_params![sender])
                .await?;
            match outcome.winner {
                Some(winner) => println!("Auction ended. Winner: {} ({})", winner, outcome.amount),
                None => println!("Auction ended with no valid bids"),
            }
        }

        Commands::Withdraw { sender } => {
            let amount: u64 = client
                .request("auction_withdraw", rpc_params![sender])
                .await?;
            if amount == 0 {
                println!("Nothing to withdraw");
            } else {
                println!("Withdrawn: {}", amount);
            }
        }

        Commands::Status => {
            status_cmd(&client).await?;
        }

        Commands::Bids { bidder } => {
            bids_cmd(&client, &bidder).await?;
        }

        Commands::Pending { address } => {
            let amount: u64 = client
                .request("query_getPendingReturn", rpc_params![address])
                .await?;
            println!("Pending: {}", amount);
        }

        Commands::Balance { address } => {
            let balance: u64 = client
                .request("chain_getBalance", rpc_params![address])
                .await?;
            println!("Balance: {}", balance);
        }

        Commands::Events { from } => {
            events_cmd(&client, from).await?;
        }

        Commands::AdvanceBlock => {
            let info: BlockInfo = client.request("admin_advanceBlock", rpc_params![]).await?;
            println!("Block advanced: height={}, timestamp={}", info.height, info.timestamp);
        }

        Commands::SetTimestamp { timestamp } => {
            let _: bool = client
                .request("admin_setTimestamp", rpc_params![timestamp])
                .await?;
            println!("Timestamp set to {}", timestamp);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_bid_command() {
        let cli = Cli::try_parse_from([
            "auction-cli",
            "bid",
            "--sender",
            "01",
            "--value",
            "100",
            "--deposit",
            "120",
            "--book",
            "alice.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Bid {
                value,
                deposit,
                fake,
                ..
            } => {
                assert_eq!(value, 100);
                assert_eq!(deposit, Some(120));
                assert!(!fake);
            }
            _ => panic!("expected bid command"),
        }
        assert_eq!(cli.rpc, "http://127.0.0.1:9944");
    }
}
