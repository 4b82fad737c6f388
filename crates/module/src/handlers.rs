//! Call handlers for the auction module.
//!
//! These functions implement the business logic for each call type. Every
//! handler checks all of its guards before touching state, so a returned error
//! means nothing changed.

use auction_crypto::verify_opening;
use auction_types::{
    Address, Amount, AuctionOutcome, AuctionPhase, BidOpening, Commitment, Secret, Timestamp,
};
use tracing::{debug, info, warn};

use crate::call::{AuctionCall, CallOutcome};
use crate::error::AuctionError;
use crate::events::AuctionEvent;
use crate::genesis::InvalidRevealPolicy;
use crate::host::{Clock, Transfer};
use crate::state::AuctionState as ModuleState;

/// Context provided by the runtime for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Current timestamp
    pub timestamp: Timestamp,
    /// Value attached to the call (for deposits)
    pub value: Amount,
}

impl CallContext {
    pub fn new(sender: Address, timestamp: Timestamp) -> Self {
        Self {
            sender,
            timestamp,
            value: 0,
        }
    }

    /// Build a context stamped with the clock's current time.
    pub fn from_clock(sender: Address, clock: &impl Clock) -> Self {
        Self::new(sender, clock.now())
    }

    /// Attach a deposit.
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

fn require_phase(state: &ModuleState, now: Timestamp, expected: AuctionPhase) -> HandlerResult<()> {
    let got = state.phase(now);
    if got != expected {
        return Err(AuctionError::PhaseViolation { expected, got, now });
    }
    Ok(())
}

/// Handle PlaceBid call.
///
/// Returns the index of the new bid, which the bidder must reveal in order.
pub fn handle_place_bid(
    state: &mut ModuleState,
    ctx: &CallContext,
    commitment: Commitment,
) -> HandlerResult<usize> {
    require_phase(state, ctx.timestamp, AuctionPhase::Bidding)?;

    let total = state
        .total_deposited()
        .checked_add(ctx.value)
        .ok_or(AuctionError::DepositOverflow)?;

    let index = state.ledger.append(ctx.sender, commitment, ctx.value);
    state.set_total_deposited(total);

    debug!(
        bidder = %hex::encode(ctx.sender),
        index,
        deposit = ctx.value,
        %commitment,
        "Bid placed"
    );
    state.record(AuctionEvent::BidPlaced {
        bidder: ctx.sender,
        index: index as u64,
        deposit: ctx.value,
    });

    Ok(index)
}

/// Handle Reveal call.
///
/// The three slices must each hold one entry for every bid the sender ever
/// placed, in placement order.
pub fn handle_reveal(
    state: &mut ModuleState,
    ctx: &CallContext,
    values: &[Amount],
    fakes: &[bool],
    secrets: &[Secret],
) -> HandlerResult<()> {
    require_phase(state, ctx.timestamp, AuctionPhase::Reveal)?;

    let bidder = ctx.sender;
    let expected = state.ledger.count_of(&bidder);
    for got in [values.len(), fakes.len(), secrets.len()] {
        if got != expected {
            return Err(AuctionError::LengthMismatch { expected, got });
        }
    }

    if let Some(index) = state.ledger.first_consumed(&bidder) {
        return Err(AuctionError::AlreadyConsumed { index });
    }

    let sealed: Vec<(Commitment, Amount)> = state
        .entries_of(&bidder)
        .iter()
        .map(|bid| (bid.commitment, bid.deposit))
        .collect();

    for (index, (commitment, deposit)) in sealed.into_iter().enumerate() {
        // Guards above ensure every entry is still unconsumed.
        state.ledger.consume(&bidder, index);

        let opening = BidOpening {
            value: values[index],
            fake: fakes[index],
            secret: secrets[index],
        };

        if !verify_opening(&commitment, &opening) {
            void_bid(state, bidder, index, deposit);
            continue;
        }

        let refund = if opening.fake || deposit < opening.value {
            deposit
        } else if state.try_place(bidder, opening.value) {
            deposit - opening.value
        } else {
            deposit
        };
        state.credit(bidder, refund);
    }

    debug!(bidder = %hex::encode(bidder), bids = expected, "Bids revealed");

    Ok(())
}

/// Apply the configured policy to a bid whose opening did not match.
fn void_bid(state: &mut ModuleState, bidder: Address, index: usize, deposit: Amount) {
    match state.invalid_reveal_policy {
        InvalidRevealPolicy::Forfeit => {
            warn!(bidder = %hex::encode(bidder), index, deposit, "Opening mismatch, deposit forfeited");
            state.add_forfeited(deposit);
            state.record(AuctionEvent::BidForfeited {
                bidder,
                index: index as u64,
                deposit,
            });
        }
        InvalidRevealPolicy::Refund => {
            warn!(bidder = %hex::encode(bidder), index, deposit, "Opening mismatch, deposit refunded");
            state.credit(bidder, deposit);
            state.record(AuctionEvent::BidVoided {
                bidder,
                index: index as u64,
                deposit,
            });
        }
    }
}

/// Handle Finalize call.
///
/// Anyone may finalize once the reveal window has closed. The winning bid is
/// credited to the beneficiary's pending returns.
pub fn handle_finalize(state: &mut ModuleState, ctx: &CallContext) -> HandlerResult<AuctionOutcome> {
    let now = ctx.timestamp;
    if now < state.reveal_end {
        return Err(AuctionError::PhaseViolation {
            expected: AuctionPhase::AwaitingFinalization,
            got: state.phase(now),
            now,
        });
    }
    if state.is_ended() {
        return Err(AuctionError::AlreadyEnded);
    }

    let (winner, amount) = state.end();
    let beneficiary = state.beneficiary;
    state.credit(beneficiary, amount);

    info!(
        winner = ?winner.map(hex::encode),
        amount,
        "Auction ended"
    );
    state.record(AuctionEvent::AuctionEnded { winner, amount });

    Ok(AuctionOutcome { winner, amount })
}

/// Handle Withdraw call.
///
/// The pending balance is zeroed before the transfer is attempted. A failed
/// transfer restores it and reports `TransferFailed`.
pub fn handle_withdraw<T: Transfer + ?Sized>(
    state: &mut ModuleState,
    ctx: &CallContext,
    transfer: &mut T,
) -> HandlerResult<Amount> {
    let to = ctx.sender;
    let amount = state.take_pending(&to);
    if amount == 0 {
        return Ok(0);
    }

    if let Err(err) = transfer.send(&to, amount) {
        state.credit(to, amount);
        warn!(to = %hex::encode(to), amount, error = %err, "Withdrawal failed");
        return Err(AuctionError::TransferFailed(err.to_string()));
    }

    state.add_withdrawn(amount);
    info!(to = %hex::encode(to), amount, "Withdrawn");
    state.record(AuctionEvent::Withdrawn { to, amount });

    Ok(amount)
}

/// Dispatch a call message to its handler.
pub fn handle_call<T: Transfer + ?Sized>(
    state: &mut ModuleState,
    ctx: &CallContext,
    call: AuctionCall,
    transfer: &mut T,
) -> HandlerResult<CallOutcome> {
    debug!(call = call.name(), sender = %hex::encode(ctx.sender), "Handling call");

    match call {
        AuctionCall::PlaceBid { commitment } => {
            let index = handle_place_bid(state, ctx, commitment)?;
            Ok(CallOutcome::BidPlaced {
                index: index as u64,
            })
        }
        AuctionCall::Reveal {
            values,
            fakes,
            secrets,
        } => {
            handle_reveal(state, ctx, &values, &fakes, &secrets)?;
            Ok(CallOutcome::Revealed)
        }
        AuctionCall::Finalize => handle_finalize(state, ctx).map(CallOutcome::Finalized),
        AuctionCall::Withdraw => {
            let amount = handle_withdraw(state, ctx, transfer)?;
            Ok(CallOutcome::Withdrawn { amount })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::AuctionGenesisConfig;
    use crate::host::InMemoryTransfer;
    use auction_crypto::{commit, secret_from_label};

    const BENEFICIARY: Address = [9u8; 32];
    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    // Auction created at 1000: bidding until 1100, reveal until 1150.
    const BIDDING: Timestamp = 1_050;
    const REVEAL: Timestamp = 1_120;
    const AFTER: Timestamp = 1_200;

    fn setup_state() -> ModuleState {
        let config = AuctionGenesisConfig::new(BENEFICIARY, 100, 50);
        ModuleState::new(&config, 1_000).unwrap()
    }

    fn secret(label: &str) -> Secret {
        secret_from_label(label).unwrap()
    }

    fn place(state: &mut ModuleState, bidder: Address, value: Amount, fake: bool, label: &str, deposit: Amount) {
        let ctx = CallContext::new(bidder, BIDDING).with_value(deposit);
        handle_place_bid(state, &ctx, commit(value, fake, &secret(label))).unwrap();
    }

    fn reveal(
        state: &mut ModuleState,
        bidder: Address,
        openings: &[(Amount, bool, &str)],
    ) -> HandlerResult<()> {
        let values: Vec<Amount> = openings.iter().map(|o| o.0).collect();
        let fakes: Vec<bool> = openings.iter().map(|o| o.1).collect();
        let secrets: Vec<Secret> = openings.iter().map(|o| secret(o.2)).collect();
        handle_reveal(state, &CallContext::new(bidder, REVEAL), &values, &fakes, &secrets)
    }

    #[test]
    fn test_place_bid_returns_index() {
        let mut state = setup_state();
        let ctx = CallContext::new(ALICE, BIDDING).with_value(10);

        assert_eq!(handle_place_bid(&mut state, &ctx, Commitment([1u8; 32])).unwrap(), 0);
        assert_eq!(handle_place_bid(&mut state, &ctx, Commitment([2u8; 32])).unwrap(), 1);

        // zero deposit is allowed
        let ctx = CallContext::new(ALICE, BIDDING);
        assert_eq!(handle_place_bid(&mut state, &ctx, Commitment([3u8; 32])).unwrap(), 2);

        assert_eq!(state.entries_of(&ALICE).len(), 3);
        assert_eq!(state.total_deposited(), 20);
        assert!(state.is_balanced());
    }

    #[test]
    fn test_place_bid_after_bidding_end() {
        let mut state = setup_state();

        for now in [1_100, 1_149, 1_150, 5_000] {
            let ctx = CallContext::new(ALICE, now).with_value(10);
            let result = handle_place_bid(&mut state, &ctx, Commitment([1u8; 32]));
            assert!(matches!(
                result,
                Err(AuctionError::PhaseViolation {
                    expected: AuctionPhase::Bidding,
                    ..
                })
            ));
        }
        assert!(state.ledger().is_empty());
    }

    #[test]
    fn test_place_bid_deposit_overflow() {
        let mut state = setup_state();
        place(&mut state, ALICE, 1, false, "a", u64::MAX - 5);

        let ctx = CallContext::new(BOB, BIDDING).with_value(10);
        let result = handle_place_bid(&mut state, &ctx, Commitment([1u8; 32]));
        assert_eq!(result, Err(AuctionError::DepositOverflow));
        assert_eq!(state.entries_of(&BOB).len(), 0);
    }

    #[test]
    fn test_reveal_phase_gating() {
        let mut state = setup_state();
        place(&mut state, ALICE, 100, false, "a", 100);

        let secrets = [secret("a")];
        for now in [1_000, 1_099, 1_150, 2_000] {
            let ctx = CallContext::new(ALICE, now);
            let result = handle_reveal(&mut state, &ctx, &[100], &[false], &secrets);
            assert!(matches!(result, Err(AuctionError::PhaseViolation { .. })));
        }
        assert_eq!(state.highest_bid(), 0);
        assert!(!state.entries_of(&ALICE)[0].is_consumed());
    }

    #[test]
    fn test_scenario_two_bids_same_bidder() {
        let mut state = setup_state();
        place(&mut state, ALICE, 100, false, "a1", 100);
        place(&mut state, ALICE, 150, false, "a2", 150);

        reveal(&mut state, ALICE, &[(100, false, "a1"), (150, false, "a2")]).unwrap();

        assert_eq!(state.highest_bid(), 150);
        assert_eq!(state.highest_bidder(), Some(ALICE));
        assert_eq!(state.pending_return(&ALICE), 100);
        assert!(state.entries_of(&ALICE).iter().all(|bid| bid.is_consumed()));
        assert!(state.is_balanced());
    }

    #[test]
    fn test_scenario_length_mismatch() {
        let mut state = setup_state();
        place(&mut state, ALICE, 100, false, "a1", 100);
        place(&mut state, ALICE, 150, false, "a2", 150);

        let result = reveal(&mut state, ALICE, &[(100, false, "a1")]);
        assert_eq!(
            result,
            Err(AuctionError::LengthMismatch {
                expected: 2,
                got: 1
            })
        );

        assert_eq!(state.highest_bid(), 0);
        assert_eq!(state.highest_bidder(), None);
        assert_eq!(state.pending_return(&ALICE), 0);
        assert!(state.entries_of(&ALICE).iter().all(|bid| !bid.is_consumed()));
    }

    #[test]
    fn test_reveal_unequal_slices() {
        let mut state = setup_state();
        place(&mut state, ALICE, 100, false, "a1", 100);

        let ctx = CallContext::new(ALICE, REVEAL);
        let result = handle_reveal(&mut state, &ctx, &[100], &[false, true], &[secret("a1")]);
        assert!(matches!(result, Err(AuctionError::LengthMismatch { .. })));
        assert!(!state.entries_of(&ALICE)[0].is_consumed());
    }

    #[test]
    fn test_scenario_tie_keeps_incumbent() {
        let mut state = setup_state();
        place(&mut state, ALICE, 100, false, "a", 100);
        place(&mut state, BOB, 100, false, "b", 120);

        reveal(&mut state, ALICE, &[(100, false, "a")]).unwrap();
        reveal(&mut state, BOB, &[(100, false, "b")]).unwrap();

        assert_eq!(state.highest_bidder(), Some(ALICE));
        assert_eq!(state.highest_bid(), 100);
        assert_eq!(state.pending_return(&BOB), 120);
        assert_eq!(state.pending_return(&ALICE), 0);
        assert!(state.is_balanced());
    }

    #[test]
    fn test_scenario_finalize_gating() {
        let mut state = setup_state();
        place(&mut state, ALICE, 100, false, "a", 100);
        reveal(&mut state, ALICE, &[(100, false, "a")]).unwrap();

        let early = CallContext::new(BOB, 1_149);
        assert!(matches!(
            handle_finalize(&mut state, &early),
            Err(AuctionError::PhaseViolation {
                got: AuctionPhase::Reveal,
                ..
            })
        ));
        assert!(!state.is_ended());

        let ctx = CallContext::new(BOB, 1_150);
        let outcome = handle_finalize(&mut state, &ctx).unwrap();
        assert_eq!(
            outcome,
            AuctionOutcome {
                winner: Some(ALICE),
                amount: 100
            }
        );
        assert_eq!(state.pending_return(&BENEFICIARY), 100);

        let ctx = CallContext::new(BOB, AFTER);
        assert_eq!(handle_finalize(&mut state, &ctx), Err(AuctionError::AlreadyEnded));
        assert_eq!(state.pending_return(&BENEFICIARY), 100);
        assert_eq!(state.phase(AFTER), AuctionPhase::Ended);
        assert!(state.is_balanced());
    }

    #[test]
    fn test_double_reveal_rejected() {
        let mut state = setup_state();
        place(&mut state, ALICE, 100, false, "a", 100);
        reveal(&mut state, ALICE, &[(100, false, "a")]).unwrap();

        let result = reveal(&mut state, ALICE, &[(100, false, "a")]);
        assert_eq!(result, Err(AuctionError::AlreadyConsumed { index: 0 }));
        assert_eq!(state.highest_bid(), 100);
        assert_eq!(state.pending_return(&ALICE), 0);
    }

    #[test]
    fn test_fake_and_underfunded_bids_refunded() {
        let mut state = setup_state();
        place(&mut state, ALICE, 500, true, "fake", 40);
        place(&mut state, ALICE, 200, false, "short", 150);
        place(&mut state, ALICE, 60, false, "real", 80);

        reveal(
            &mut state,
            ALICE,
            &[(500, true, "fake"), (200, false, "short"), (60, false, "real")],
        )
        .unwrap();

        assert_eq!(state.highest_bid(), 60);
        assert_eq!(state.pending_return(&ALICE), 40 + 150 + 20);
        assert!(state.is_balanced());
    }

    #[test]
    fn test_mismatched_opening_forfeits_by_default() {
        let mut state = setup_state();
        place(&mut state, ALICE, 100, false, "a", 100);
        place(&mut state, ALICE, 50, false, "b", 70);

        reveal(&mut state, ALICE, &[(100, false, "wrong"), (50, false, "b")]).unwrap();

        assert_eq!(state.highest_bid(), 50);
        assert_eq!(state.pending_return(&ALICE), 20);
        assert_eq!(state.fund_totals().forfeited, 100);
        assert!(state.is_balanced());
        assert!(state
            .events()
            .iter()
            .any(|e| matches!(e, AuctionEvent::BidForfeited { index: 0, deposit: 100, .. })));
    }

    #[test]
    fn test_mismatched_opening_refund_policy() {
        let config = AuctionGenesisConfig::new(BENEFICIARY, 100, 50)
            .with_policy(InvalidRevealPolicy::Refund);
        let mut state = ModuleState::new(&config, 1_000).unwrap();
        place(&mut state, ALICE, 100, false, "a", 100);

        reveal(&mut state, ALICE, &[(100, true, "a")]).unwrap();

        assert_eq!(state.highest_bid(), 0);
        assert_eq!(state.pending_return(&ALICE), 100);
        assert_eq!(state.fund_totals().forfeited, 0);
        assert!(state.is_balanced());
    }

    #[test]
    fn test_outbid_leader_released_to_pending() {
        let mut state = setup_state();
        place(&mut state, ALICE, 100, false, "a", 130);
        place(&mut state, BOB, 120, false, "b", 120);

        reveal(&mut state, ALICE, &[(100, false, "a")]).unwrap();
        assert_eq!(state.pending_return(&ALICE), 30);

        reveal(&mut state, BOB, &[(120, false, "b")]).unwrap();
        assert_eq!(state.highest_bidder(), Some(BOB));
        assert_eq!(state.pending_return(&ALICE), 130);
        assert_eq!(state.pending_return(&BOB), 0);
        assert!(state.is_balanced());
    }

    #[test]
    fn test_withdraw_idempotent() {
        let mut state = setup_state();
        let mut bank = InMemoryTransfer::new();
        place(&mut state, ALICE, 100, false, "a", 100);
        place(&mut state, BOB, 200, false, "b", 250);
        reveal(&mut state, ALICE, &[(100, false, "a")]).unwrap();
        reveal(&mut state, BOB, &[(200, false, "b")]).unwrap();

        // allowed while revealing
        let ctx = CallContext::new(ALICE, REVEAL);
        assert_eq!(handle_withdraw(&mut state, &ctx, &mut bank).unwrap(), 100);
        assert_eq!(handle_withdraw(&mut state, &ctx, &mut bank).unwrap(), 0);
        assert_eq!(bank.received_by(&ALICE), 100);
        assert_eq!(bank.payouts.len(), 1);

        handle_finalize(&mut state, &CallContext::new(ALICE, AFTER)).unwrap();
        let ctx = CallContext::new(BENEFICIARY, AFTER);
        assert_eq!(handle_withdraw(&mut state, &ctx, &mut bank).unwrap(), 200);

        let ctx = CallContext::new(BOB, AFTER);
        assert_eq!(handle_withdraw(&mut state, &ctx, &mut bank).unwrap(), 50);

        let totals = state.fund_totals();
        assert_eq!(totals.withdrawn, 350);
        assert_eq!(totals.pending, 0);
        assert!(totals.is_balanced());
    }

    #[test]
    fn test_withdraw_transfer_failure_restores_balance() {
        let mut state = setup_state();
        let mut bank = InMemoryTransfer::new();
        place(&mut state, ALICE, 10, true, "a", 75);
        reveal(&mut state, ALICE, &[(10, true, "a")]).unwrap();

        bank.reject(ALICE);
        let ctx = CallContext::new(ALICE, AFTER);
        let result = handle_withdraw(&mut state, &ctx, &mut bank);
        assert!(matches!(result, Err(AuctionError::TransferFailed(_))));
        assert_eq!(state.pending_return(&ALICE), 75);
        assert!(state.is_balanced());

        bank.accept(&ALICE);
        assert_eq!(handle_withdraw(&mut state, &ctx, &mut bank).unwrap(), 75);
        assert_eq!(state.pending_return(&ALICE), 0);
    }

    #[test]
    fn test_finalize_without_bids() {
        let mut state = setup_state();
        let outcome = handle_finalize(&mut state, &CallContext::new(ALICE, AFTER)).unwrap();
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.amount, 0);
        assert_eq!(state.pending_return(&BENEFICIARY), 0);
    }

    #[test]
    fn test_handle_call_dispatch() {
        let mut state = setup_state();
        let mut bank = InMemoryTransfer::new();

        let ctx = CallContext::new(ALICE, BIDDING).with_value(90);
        let call = AuctionCall::PlaceBid {
            commitment: commit(70, false, &secret("a")),
        };
        assert_eq!(
            handle_call(&mut state, &ctx, call, &mut bank).unwrap(),
            CallOutcome::BidPlaced { index: 0 }
        );

        let ctx = CallContext::new(ALICE, REVEAL);
        let call = AuctionCall::Reveal {
            values: vec![70],
            fakes: vec![false],
            secrets: vec![secret("a")],
        };
        assert_eq!(
            handle_call(&mut state, &ctx, call, &mut bank).unwrap(),
            CallOutcome::Revealed
        );

        let ctx = CallContext::new(ALICE, AFTER);
        assert_eq!(
            handle_call(&mut state, &ctx, AuctionCall::Withdraw, &mut bank).unwrap(),
            CallOutcome::Withdrawn { amount: 20 }
        );
        assert!(matches!(
            handle_call(&mut state, &ctx, AuctionCall::Finalize, &mut bank).unwrap(),
            CallOutcome::Finalized(AuctionOutcome { amount: 70, .. })
        ));

        let names: Vec<&str> = state.drain_events().iter().map(AuctionEvent::name).collect();
        assert_eq!(
            names,
            ["BidPlaced", "HighestBidIncreased", "Withdrawn", "AuctionEnded"]
        );
        assert!(state.events().is_empty());
    }
}
