use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

use crate::errors::EntryError;
use crate::events::RaffleEvent;
use crate::instructions::Context;

/// Add `participant` to the open round for `amount_paid` lamports.
pub(crate) fn handler(
    ctx: Context<'_>,
    participant: Pubkey,
    amount_paid: u64,
) -> Result<(), EntryError> {
    let Context { round, events, .. } = ctx;
    let state = round.state();

    let new_count = match round.ledger.record_entry(state, participant, amount_paid) {
        Ok(count) => count,
        Err(e) => {
            debug!(participant = %participant, amount_paid, reason = %e, "Entry rejected");
            return Err(e);
        }
    };

    info!(
        participant = %participant,
        amount_paid,
        players = new_count,
        balance = round.ledger.total_balance(),
        "Entry accepted"
    );

    events.emit(RaffleEvent::EntryAccepted {
        participant,
        new_count,
        round: round.round,
    });
    Ok(())
}
