use crate::state::{RaffleConfig, Round};
use crate::upkeep::is_upkeep_needed;

/// Read-only check: would `perform_upkeep` close the round right now?
pub(crate) fn handler(round: &Round, config: &RaffleConfig, now: i64) -> bool {
    is_upkeep_needed(
        round.state(),
        round.ledger.count(),
        round.ledger.total_balance(),
        round.elapsed_since_open(now),
        config.interval,
    )
}
