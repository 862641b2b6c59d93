use std::fmt;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::errors::ConfigError;
use crate::ledger::EntryLedger;
use crate::payout::PayoutFault;

/// Identifier handed out by the oracle for one randomness request.
pub type RequestId = u64;

/// Externally visible raffle state.
///
/// Encoded as `0` (open) / `1` (calculating) on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaffleState {
    /// Accepting entries.
    Open,
    /// Closed, waiting for the oracle to deliver randomness.
    Calculating,
}

impl RaffleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaffleState::Open => "open",
            RaffleState::Calculating => "calculating",
        }
    }
}

impl fmt::Display for RaffleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Calculating => 1,
        }
    }
}

impl TryFrom<u8> for RaffleState {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RaffleState::Open),
            1 => Ok(RaffleState::Calculating),
            other => Err(other),
        }
    }
}

/// Round phase with the pending request id carried by the calculating variant,
/// so "calculating" and "request outstanding" cannot drift apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Open,
    Calculating { request_id: RequestId },
}

impl Phase {
    pub fn state(&self) -> RaffleState {
        match self {
            Phase::Open => RaffleState::Open,
            Phase::Calculating { .. } => RaffleState::Calculating,
        }
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        match self {
            Phase::Open => None,
            Phase::Calculating { request_id } => Some(*request_id),
        }
    }
}

/// Immutable raffle parameters, fixed for the lifetime of a [`Raffle`](crate::Raffle).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum lamports per entry.
    pub entrance_fee: u64,
    /// Seconds a round must stay open before upkeep may close it.
    pub interval: u64,
    /// Oracle key hash ("gas lane") forwarded with every request.
    pub key_hash: [u8; 32],
    /// Oracle subscription charged for requests.
    pub subscription_id: u64,
    /// Compute budget granted to the fulfillment callback.
    pub callback_compute_limit: u32,
    /// Confirmations the oracle waits for before answering.
    pub request_confirmations: u16,
    /// Random words requested per round. Only the first one picks the winner.
    pub num_words: u32,
}

impl RaffleConfig {
    pub const DEFAULT_REQUEST_CONFIRMATIONS: u16 = 3;
    pub const DEFAULT_NUM_WORDS: u32 = 1;
    pub const DEFAULT_CALLBACK_COMPUTE_LIMIT: u32 = 500_000;

    /// Config with the given fee and interval and default oracle parameters.
    pub fn new(entrance_fee: u64, interval: u64) -> Self {
        Self {
            entrance_fee,
            interval,
            key_hash: [0u8; 32],
            subscription_id: 0,
            callback_compute_limit: Self::DEFAULT_CALLBACK_COMPUTE_LIMIT,
            request_confirmations: Self::DEFAULT_REQUEST_CONFIRMATIONS,
            num_words: Self::DEFAULT_NUM_WORDS,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entrance_fee == 0 {
            return Err(ConfigError::ZeroEntranceFee);
        }
        if self.num_words == 0 {
            return Err(ConfigError::ZeroNumWords);
        }
        if self.callback_compute_limit == 0 {
            return Err(ConfigError::ZeroCallbackLimit);
        }
        Ok(())
    }
}

/// The single mutable round, reused across every draw.
#[derive(Debug)]
pub struct Round {
    pub(crate) phase: Phase,
    pub(crate) ledger: EntryLedger,
    /// Unix timestamp of the last transition into [`Phase::Open`].
    pub(crate) opened_at: i64,
    pub(crate) recent_winner: Option<Pubkey>,
    /// Number of completed rounds.
    pub(crate) round: u64,
    pub(crate) last_payout_fault: Option<PayoutFault>,
}

impl Round {
    pub(crate) fn open(entrance_fee: u64, opened_at: i64) -> Self {
        Self {
            phase: Phase::Open,
            ledger: EntryLedger::new(entrance_fee),
            opened_at,
            recent_winner: None,
            round: 0,
            last_payout_fault: None,
        }
    }

    pub fn state(&self) -> RaffleState {
        self.phase.state()
    }

    /// Seconds since the round opened; a clock reading before `opened_at` counts as zero.
    pub fn elapsed_since_open(&self, now: i64) -> u64 {
        u64::try_from(now.saturating_sub(self.opened_at)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_wire_encoding() {
        assert_eq!(u8::from(RaffleState::Open), 0);
        assert_eq!(u8::from(RaffleState::Calculating), 1);
        assert_eq!(RaffleState::try_from(1), Ok(RaffleState::Calculating));
        assert_eq!(RaffleState::try_from(7), Err(7));
    }

    #[test]
    fn phase_carries_pending_request() {
        assert_eq!(Phase::Open.pending_request(), None);
        let phase = Phase::Calculating { request_id: 4 };
        assert_eq!(phase.pending_request(), Some(4));
        assert_eq!(phase.state(), RaffleState::Calculating);
    }

    #[test]
    fn config_rejects_zero_fee() {
        assert_eq!(
            RaffleConfig::new(0, 30).validate(),
            Err(ConfigError::ZeroEntranceFee)
        );
        let mut config = RaffleConfig::new(100, 30);
        config.num_words = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroNumWords));
    }

    #[test]
    fn elapsed_saturates_when_clock_runs_backwards() {
        let round = Round::open(100, 1_000);
        assert_eq!(round.elapsed_since_open(1_030), 30);
        assert_eq!(round.elapsed_since_open(900), 0);
    }
}
