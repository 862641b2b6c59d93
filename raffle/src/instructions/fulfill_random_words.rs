use solana_sdk::pubkey::Pubkey;
use tracing::{debug, error, info};

use crate::errors::FulfillError;
use crate::events::RaffleEvent;
use crate::instructions::Context;
use crate::oracle::RandomWord;
use crate::payout::{PayoutExecutor, PayoutFault};
use crate::state::{Phase, RequestId};

/// Oracle callback: draw the winner from the first word, pay out the pot and reopen.
///
/// The winner is `entrants[word mod players]`. The round is only reset after
/// the payout succeeds; a failed payout leaves the phase, entrants and
/// balance as they were and records a [`PayoutFault`].
pub(crate) fn handler(
    ctx: Context<'_>,
    payout: &dyn PayoutExecutor,
    authority: &Pubkey,
    caller: &Pubkey,
    request_id: RequestId,
    random_words: &[RandomWord],
) -> Result<(), FulfillError> {
    let Context {
        round, now, events, ..
    } = ctx;

    if caller != authority {
        debug!(caller = %caller, request_id, "Fulfillment from unauthorized caller");
        return Err(FulfillError::UnauthorizedOracle { caller: *caller });
    }

    if round.phase.pending_request() != Some(request_id) {
        debug!(
            request_id,
            pending = ?round.phase.pending_request(),
            "Fulfillment for unknown request"
        );
        return Err(FulfillError::UnknownRequest { request_id });
    }

    let word = random_words.first().ok_or(FulfillError::NoRandomWords)?;

    let players = round.ledger.count();
    if players == 0 {
        error!(request_id, "Calculating round has no entrants");
        return Err(FulfillError::NoEntrants);
    }
    let winner_index = word.modulo(players as u64) as usize;
    let winner = round
        .ledger
        .entrant_at(winner_index)
        .map_err(|_| FulfillError::NoEntrants)?;
    let amount = round.ledger.total_balance();

    if let Err(source) = payout.pay(&winner, amount) {
        error!(
            request_id,
            winner = %winner,
            amount,
            error = %source,
            "Payout failed, round left calculating"
        );
        round.last_payout_fault = Some(PayoutFault {
            request_id,
            winner,
            amount,
            reason: source.to_string(),
            at: now,
        });
        events.emit(RaffleEvent::PayoutFaulted {
            request_id,
            winner,
            amount,
            reason: source.to_string(),
        });
        return Err(FulfillError::PayoutFailed {
            request_id,
            winner,
            amount,
            source,
        });
    }

    let completed = round.round;
    round.ledger.reset();
    round.recent_winner = Some(winner);
    round.opened_at = now;
    round.phase = Phase::Open;
    round.round = completed.saturating_add(1);
    round.last_payout_fault = None;

    info!(
        request_id,
        round = completed,
        winner = %winner,
        winner_index,
        players,
        payout = amount,
        "Winner picked"
    );

    events.emit(RaffleEvent::WinnerPicked {
        winner,
        payout_amount: amount,
        round: completed,
    });
    Ok(())
}
