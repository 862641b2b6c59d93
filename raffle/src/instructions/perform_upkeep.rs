use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::errors::UpkeepError;
use crate::events::RaffleEvent;
use crate::instructions::{check_upkeep, Context};
use crate::oracle::{RandomnessOracle, RandomnessRequest};
use crate::state::{Phase, RaffleConfig, RequestId, Round};

/// Request seed: `SHA256(round_le || opened_at_le || players_le || balance_le)`.
fn request_seed(round: u64, opened_at: i64, players: u64, balance: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(round.to_le_bytes());
    hasher.update(opened_at.to_le_bytes());
    hasher.update(players.to_le_bytes());
    hasher.update(balance.to_le_bytes());
    let hash = hasher.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&hash);
    seed
}

/// Oracle request for closing `round`. Stable while the round is calculating,
/// since players, balance and open time are frozen until fulfillment.
pub(crate) fn randomness_request(round: &Round, config: &RaffleConfig) -> RandomnessRequest {
    RandomnessRequest {
        round: round.round,
        seed: request_seed(
            round.round,
            round.opened_at,
            round.ledger.count() as u64,
            round.ledger.total_balance(),
        ),
        key_hash: config.key_hash,
        subscription_id: config.subscription_id,
        request_confirmations: config.request_confirmations,
        callback_compute_limit: config.callback_compute_limit,
        num_words: config.num_words,
    }
}

/// Close the open round and ask the oracle for randomness.
///
/// The upkeep predicate is re-evaluated here regardless of what the caller
/// saw from `check_upkeep`. Nothing changes unless the oracle accepts.
pub(crate) fn handler(
    ctx: Context<'_>,
    oracle: &dyn RandomnessOracle,
) -> Result<RequestId, UpkeepError> {
    let Context {
        round,
        config,
        now,
        events,
    } = ctx;

    if let Phase::Calculating { request_id } = round.phase {
        debug!(pending = request_id, "Upkeep rejected, already calculating");
        return Err(UpkeepError::AlreadyCalculating);
    }

    let players = round.ledger.count();
    let balance = round.ledger.total_balance();
    if !check_upkeep::handler(round, config, now) {
        debug!(players, balance, "Upkeep rejected, not needed");
        return Err(UpkeepError::UpkeepNotNeeded {
            balance,
            players,
            state: round.state(),
        });
    }

    let request = randomness_request(round, config);
    let request_id = oracle.request_random_words(&request).map_err(|e| {
        warn!(round = round.round, error = %e, "Randomness request rejected");
        UpkeepError::from(e)
    })?;

    round.phase = Phase::Calculating { request_id };

    info!(
        request_id,
        round = round.round,
        players,
        balance,
        "Round closed, randomness requested"
    );

    events.emit(RaffleEvent::UpkeepPerformed {
        request_id,
        round: round.round,
    });
    Ok(request_id)
}
