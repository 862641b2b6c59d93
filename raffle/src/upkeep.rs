use crate::state::RaffleState;

/// Whether the current round should be closed and a winner requested.
///
/// True only when the raffle is open, has at least one entrant and a
/// non-zero balance, and has been open for at least `interval` seconds.
pub fn is_upkeep_needed(
    state: RaffleState,
    entrant_count: usize,
    balance: u64,
    elapsed_since_open: u64,
    interval: u64,
) -> bool {
    let is_open = state == RaffleState::Open;
    let time_passed = elapsed_since_open >= interval;
    let has_players = entrant_count > 0;
    let has_balance = balance > 0;
    is_open && time_passed && has_players && has_balance
}
