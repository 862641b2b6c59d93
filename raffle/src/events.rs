use solana_sdk::pubkey::Pubkey;

use crate::state::RequestId;

/// Notifications emitted by the raffle for observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    /// A participant was added to the current round.
    EntryAccepted {
        participant: Pubkey,
        new_count: usize,
        round: u64,
    },
    /// The round closed and randomness was requested.
    UpkeepPerformed { request_id: RequestId, round: u64 },
    /// The winner was paid and the raffle reopened.
    WinnerPicked {
        winner: Pubkey,
        payout_amount: u64,
        round: u64,
    },
    /// The winner could not be paid; the round is still calculating.
    PayoutFaulted {
        request_id: RequestId,
        winner: Pubkey,
        amount: u64,
        reason: String,
    },
}

impl RaffleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RaffleEvent::EntryAccepted { .. } => "EntryAccepted",
            RaffleEvent::UpkeepPerformed { .. } => "UpkeepPerformed",
            RaffleEvent::WinnerPicked { .. } => "WinnerPicked",
            RaffleEvent::PayoutFaulted { .. } => "PayoutFaulted",
        }
    }
}

/// Receiver for [`RaffleEvent`]s.
///
/// Called with the round lock held, in transition order; must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RaffleEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: RaffleEvent) {}
}
