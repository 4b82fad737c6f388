//! End-to-end integration tests for the blind auction.
//!
//! These tests exercise the full auction lifecycle:
//! 1. Auction creation from a genesis config
//! 2. Sealed bid placement with deposits
//! 3. Batched reveal
//! 4. Finalization
//! 5. Withdrawal of pending returns

use std::collections::HashMap;

use auction_client::{create_bid, create_fake_bid, BidBook, BidBuilder, PreparedBid};
use auction_crypto::{commit, commit_opening, random_secret, secret_from_label};
use auction_module::handlers::{
    handle_call, handle_finalize, handle_place_bid, handle_reveal, handle_withdraw,
};
use auction_module::{
    AuctionCall, AuctionError, AuctionEvent, AuctionGenesisConfig, AuctionState, CallContext,
    CallOutcome, Clock, InMemoryTransfer, InvalidRevealPolicy, ManualClock,
};
use auction_types::{Address, Amount, AuctionPhase, BidOpening, Secret};

use rand::rngs::{OsRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const BENEFICIARY: Address = [0xbe; 32];

fn label(s: &str) -> Secret {
    secret_from_label(s).unwrap()
}

fn reveal_all(
    state: &mut AuctionState,
    ctx: &CallContext,
    openings: &[(Amount, bool, Secret)],
) -> Result<(), AuctionError> {
    let values: Vec<Amount> = openings.iter().map(|o| o.0).collect();
    let fakes: Vec<bool> = openings.iter().map(|o| o.1).collect();
    let secrets: Vec<Secret> = openings.iter().map(|o| o.2).collect();
    handle_reveal(state, ctx, &values, &fakes, &secrets)
}

/// Test the complete auction flow, including a reveal that misses an earlier bid.
#[test]
fn test_full_auction_flow() {
    // ========================================
    // Phase 1: Create auction
    // ========================================

    let clock = ManualClock::new(1_700_000_000);
    let config = AuctionGenesisConfig::new(BENEFICIARY, 3600, 3600);
    let mut state = AuctionState::from_clock(&config, &clock).unwrap();
    let mut bank = InMemoryTransfer::new();

    assert_eq!(state.beneficiary, BENEFICIARY);
    assert_eq!(state.phase(clock.now()), AuctionPhase::Bidding);

    // The beneficiary bids too; nothing stops it.
    let alice = BENEFICIARY;
    let bob = [0x01; 32];
    let carol = [0x02; 32];

    // ========================================
    // Phase 2: Sealed bids
    // ========================================

    let bids: [(Address, Amount, &str); 5] = [
        (bob, 100, "secret"),
        (carol, 200, "secret2"),
        (alice, 100, "alice_secret1"),
        (alice, 150, "alice_secret2"),
        (bob, 200, "bob_secret"),
    ];
    for (bidder, value, secret) in bids {
        let ctx = CallContext::from_clock(bidder, &clock).with_value(value);
        handle_place_bid(&mut state, &ctx, commit(value, false, &label(secret))).unwrap();
        clock.advance(10);
    }

    assert_eq!(state.entries_of(&bob).len(), 2);
    assert_eq!(
        state.entries_of(&carol)[0].commitment,
        commit(200, false, &label("secret2"))
    );
    assert_eq!(state.total_deposited(), 750);

    println!("Placed {} sealed bids", state.ledger().len());

    // ========================================
    // Phase 3: Reveal
    // ========================================

    clock.set(state.bidding_end + 1);

    let ctx = CallContext::from_clock(alice, &clock);
    reveal_all(
        &mut state,
        &ctx,
        &[
            (100, false, label("alice_secret1")),
            (150, false, label("alice_secret2")),
        ],
    )
    .unwrap();
    assert_eq!(state.highest_bid(), 150);
    assert_eq!(state.pending_return(&alice), 100);

    // Bob forgot his first bid: the whole call fails.
    let ctx = CallContext::from_clock(bob, &clock);
    let result = reveal_all(&mut state, &ctx, &[(200, false, label("bob_secret"))]);
    assert_eq!(
        result,
        Err(AuctionError::LengthMismatch {
            expected: 2,
            got: 1
        })
    );
    assert_eq!(state.highest_bidder(), Some(alice));

    reveal_all(
        &mut state,
        &ctx,
        &[
            (100, false, label("secret")),
            (200, false, label("bob_secret")),
        ],
    )
    .unwrap();
    assert_eq!(state.highest_bidder(), Some(bob));
    assert_eq!(state.highest_bid(), 200);
    assert_eq!(state.pending_return(&alice), 250);
    assert_eq!(state.pending_return(&bob), 100);

    // Carol ties Bob and does not displace him.
    let ctx = CallContext::from_clock(carol, &clock);
    reveal_all(&mut state, &ctx, &[(200, false, label("secret2"))]).unwrap();
    assert_eq!(state.highest_bidder(), Some(bob));
    assert_eq!(state.pending_return(&carol), 200);
    assert!(state.is_balanced());

    println!("Reveal complete: highest bid {}", state.highest_bid());

    // ========================================
    // Phase 4: Finalize
    // ========================================

    let ctx = CallContext::from_clock(carol, &clock);
    assert!(matches!(
        handle_finalize(&mut state, &ctx),
        Err(AuctionError::PhaseViolation { .. })
    ));

    clock.set(state.reveal_end);
    let ctx = CallContext::from_clock(carol, &clock);
    let outcome = handle_finalize(&mut state, &ctx).unwrap();
    assert_eq!(outcome.winner, Some(bob));
    assert_eq!(outcome.amount, 200);
    assert_eq!(handle_finalize(&mut state, &ctx), Err(AuctionError::AlreadyEnded));

    // ========================================
    // Phase 5: Withdraw
    // ========================================

    for (who, expected) in [(alice, 450), (bob, 100), (carol, 200)] {
        let ctx = CallContext::from_clock(who, &clock);
        assert_eq!(handle_withdraw(&mut state, &ctx, &mut bank).unwrap(), expected);
        assert_eq!(handle_withdraw(&mut state, &ctx, &mut bank).unwrap(), 0);
    }

    assert_eq!(bank.total_paid(), 750);
    let totals = state.fund_totals();
    assert_eq!(totals.withdrawn, 750);
    assert_eq!(totals.pending, 0);
    assert!(totals.is_balanced());

    let ended = state
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, AuctionEvent::AuctionEnded { .. }))
        .count();
    assert_eq!(ended, 1);
}

/// Commitments match `keccak256(abi.encode(uint256, bool, bytes32))`.
#[test]
fn test_commitment_matches_abi_encoding() {
    let commitment = commit(100, false, &label("secret"));
    assert_eq!(
        commitment.to_hex(),
        "00ea96b54208a749d998befbdaff4a0cfe9061dd33108214c6137a615f0bee06"
    );

    let commitment = commit(200, false, &label("secret2"));
    assert_eq!(
        commitment.to_hex(),
        "1704b301febf9c2df1112d9e1f0fca64f0667a0bbda91541f2973329fe799ad8"
    );
}

/// A bidder drives the auction through the client SDK and call messages.
#[test]
fn test_client_book_flow() {
    let mut rng = OsRng;
    let clock = ManualClock::new(0);
    let config = AuctionGenesisConfig::new(BENEFICIARY, 100, 100);
    let mut state = AuctionState::from_clock(&config, &clock).unwrap();
    let mut bank = InMemoryTransfer::new();

    let bidder = [0x0a; 32];
    let rival = [0x0b; 32];
    let mut book = BidBook::new();

    let prepared = [
        create_bid(80, 100, &mut rng).unwrap(),
        create_fake_bid(30, &mut rng),
        BidBuilder::new().value(120).build(&mut rng).unwrap(),
    ];
    for bid in prepared {
        let ctx = CallContext::from_clock(bidder, &clock).with_value(bid.deposit);
        let call = AuctionCall::PlaceBid {
            commitment: bid.commitment,
        };
        let outcome = handle_call(&mut state, &ctx, call, &mut bank).unwrap();
        let index = book.record(bid);
        assert_eq!(outcome, CallOutcome::BidPlaced { index: index as u64 });
    }

    let rival_bid = create_bid(100, 100, &mut rng).unwrap();
    let ctx = CallContext::from_clock(rival, &clock).with_value(rival_bid.deposit);
    handle_place_bid(&mut state, &ctx, rival_bid.commitment).unwrap();

    book.check_alignment(state.entries_of(&bidder)).unwrap();
    assert!(book.check_alignment(state.entries_of(&rival)).is_err());

    clock.set(state.bidding_end);

    let ctx = CallContext::from_clock(rival, &clock);
    reveal_all(
        &mut state,
        &ctx,
        &[(100, false, rival_bid.opening.secret)],
    )
    .unwrap();

    let ctx = CallContext::from_clock(bidder, &clock);
    assert_eq!(
        handle_call(&mut state, &ctx, book.to_reveal_call(), &mut bank).unwrap(),
        CallOutcome::Revealed
    );

    // 80 loses to 100, the decoy is refunded, 120 wins and displaces the rival.
    assert_eq!(state.highest_bidder(), Some(bidder));
    assert_eq!(state.highest_bid(), 120);
    assert_eq!(state.pending_return(&bidder), 100 + 30);
    assert_eq!(state.pending_return(&rival), 100);

    clock.set(state.reveal_end);
    let ctx = CallContext::from_clock(rival, &clock);
    handle_call(&mut state, &ctx, AuctionCall::Finalize, &mut bank).unwrap();

    for who in [bidder, rival, BENEFICIARY] {
        let ctx = CallContext::from_clock(who, &clock);
        handle_call(&mut state, &ctx, AuctionCall::Withdraw, &mut bank).unwrap();
    }
    assert_eq!(bank.received_by(&BENEFICIARY), 120);
    assert_eq!(bank.received_by(&bidder), 130);
    assert_eq!(bank.received_by(&rival), 100);
    assert!(state.is_balanced());
}

/// Bids that are never revealed stay locked in the auction.
#[test]
fn test_unrevealed_bids_stay_locked() {
    let clock = ManualClock::new(0);
    let config = AuctionGenesisConfig::new(BENEFICIARY, 10, 10);
    let mut state = AuctionState::from_clock(&config, &clock).unwrap();
    let mut bank = InMemoryTransfer::new();

    let quiet = [0x0c; 32];
    let ctx = CallContext::from_clock(quiet, &clock).with_value(500);
    handle_place_bid(&mut state, &ctx, commit(500, false, &label("quiet"))).unwrap();

    clock.set(state.reveal_end);
    let outcome = handle_finalize(&mut state, &CallContext::from_clock(quiet, &clock)).unwrap();
    assert_eq!(outcome.winner, None);

    // Too late to reveal now.
    let result = reveal_all(
        &mut state,
        &CallContext::from_clock(quiet, &clock),
        &[(500, false, label("quiet"))],
    );
    assert!(matches!(
        result,
        Err(AuctionError::PhaseViolation {
            got: AuctionPhase::Ended,
            ..
        })
    ));

    let ctx = CallContext::from_clock(quiet, &clock);
    assert_eq!(handle_withdraw(&mut state, &ctx, &mut bank).unwrap(), 0);

    let totals = state.fund_totals();
    assert_eq!(totals.unconsumed, 500);
    assert!(totals.is_balanced());
}

/// Random bid books, reveals and withdrawals never lose or create funds.
#[test]
fn test_randomized_conservation() {
    let mut rng = StdRng::seed_from_u64(0x5eed_b1d5);
    let bidders: Vec<Address> = (1..=5u8).map(|i| [i; 32]).collect();

    for round in 0..25 {
        let policy = if round % 2 == 0 {
            InvalidRevealPolicy::Forfeit
        } else {
            InvalidRevealPolicy::Refund
        };
        let clock = ManualClock::new(1_000);
        let config = AuctionGenesisConfig::new(BENEFICIARY, 100, 100).with_policy(policy);
        let mut state = AuctionState::from_clock(&config, &clock).unwrap();
        let mut bank = InMemoryTransfer::new();
        let mut books: HashMap<Address, Vec<PreparedBid>> = HashMap::new();

        // Bidding
        for _ in 0..rng.gen_range(1..20) {
            let bidder = *bidders.choose(&mut rng).unwrap();
            let value: Amount = rng.gen_range(0..1_000);
            let bid = match rng.gen_range(0..3) {
                0 => create_fake_bid(rng.gen_range(0..200), &mut rng),
                1 => {
                    // underfunded, refunded at reveal
                    let opening = BidOpening {
                        value,
                        fake: false,
                        secret: random_secret(&mut rng),
                    };
                    PreparedBid {
                        commitment: commit_opening(&opening),
                        opening,
                        deposit: value / 2,
                    }
                }
                _ => create_bid(value, value + rng.gen_range(0..100), &mut rng).unwrap(),
            };

            let ctx = CallContext::from_clock(bidder, &clock).with_value(bid.deposit);
            handle_place_bid(&mut state, &ctx, bid.commitment).unwrap();
            books.entry(bidder).or_default().push(bid);
            clock.advance(rng.gen_range(0..5));
            assert!(state.is_balanced());
        }

        // Reveal, in random bidder order
        clock.set(state.bidding_end);
        let mut order = bidders.clone();
        order.shuffle(&mut rng);
        let mut last_high = 0;

        for bidder in order {
            if rng.gen_bool(0.2) {
                continue;
            }
            let book = books.get(&bidder).map(Vec::as_slice).unwrap_or(&[]);
            let mut openings: Vec<(Amount, bool, Secret)> = book
                .iter()
                .map(|b| (b.opening.value, b.opening.fake, b.opening.secret))
                .collect();
            if !openings.is_empty() && rng.gen_bool(0.2) {
                let i = rng.gen_range(0..openings.len());
                openings[i].2 = random_secret(&mut rng);
            }

            let ctx = CallContext::from_clock(bidder, &clock);
            reveal_all(&mut state, &ctx, &openings).unwrap();
            assert_eq!(
                reveal_all(&mut state, &ctx, &openings).is_err(),
                !openings.is_empty()
            );

            assert!(state.highest_bid() >= last_high);
            last_high = state.highest_bid();
            assert!(state.is_balanced());

            if rng.gen_bool(0.3) {
                handle_withdraw(&mut state, &ctx, &mut bank).unwrap();
                assert!(state.is_balanced());
            }
        }

        // Finalize and pay everyone out
        clock.set(state.reveal_end + rng.gen_range(0..10));
        let finalizer = *bidders.choose(&mut rng).unwrap();
        handle_finalize(&mut state, &CallContext::from_clock(finalizer, &clock)).unwrap();
        assert!(state.is_balanced());

        for who in bidders.iter().copied().chain([BENEFICIARY]) {
            let ctx = CallContext::from_clock(who, &clock);
            if rng.gen_bool(0.2) {
                let owed = state.pending_return(&who);
                bank.reject(who);
                let result = handle_withdraw(&mut state, &ctx, &mut bank);
                assert_eq!(result.is_err(), owed > 0);
                assert_eq!(state.pending_return(&who), owed);
                bank.accept(&who);
            }
            handle_withdraw(&mut state, &ctx, &mut bank).unwrap();
        }

        let totals = state.fund_totals();
        assert_eq!(totals.pending, 0);
        assert_eq!(totals.escrowed, 0);
        assert_eq!(totals.withdrawn, bank.total_paid());
        assert!(totals.is_balanced());
        if policy == InvalidRevealPolicy::Refund {
            assert_eq!(totals.forfeited, 0);
        }
    }
}
