//! Serializable image of the round, for hosts that persist state between runs.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::errors::SnapshotError;
use crate::ledger::EntryLedger;
use crate::state::{Phase, RaffleConfig, RaffleState, RequestId, Round};

/// Round fields as stored by the host. Pubkeys are base58 strings.
///
/// Payout faults are runtime diagnostics and are not part of the image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub state: RaffleState,
    pub pending_request_id: Option<RequestId>,
    pub entrants: Vec<String>,
    pub collected_balance: u64,
    pub opened_at: i64,
    pub recent_winner: Option<String>,
    pub round: u64,
}

fn parse_pubkey(s: &str) -> Result<Pubkey, SnapshotError> {
    Pubkey::from_str(s).map_err(|_| SnapshotError::InvalidPubkey(s.to_string()))
}

impl RoundSnapshot {
    pub(crate) fn capture(round: &Round) -> Self {
        Self {
            state: round.state(),
            pending_request_id: round.phase.pending_request(),
            entrants: round
                .ledger
                .entrants()
                .iter()
                .map(ToString::to_string)
                .collect(),
            collected_balance: round.ledger.total_balance(),
            opened_at: round.opened_at,
            recent_winner: round.recent_winner.map(|w| w.to_string()),
            round: round.round,
        }
    }

    /// Rebuild a [`Round`] after checking the image against the round invariants.
    pub(crate) fn restore(&self, config: &RaffleConfig) -> Result<Round, SnapshotError> {
        config.validate()?;

        let phase = match (self.state, self.pending_request_id) {
            (RaffleState::Open, None) => Phase::Open,
            (RaffleState::Calculating, Some(request_id)) => Phase::Calculating { request_id },
            (state, pending) => {
                return Err(SnapshotError::PendingRequestMismatch { state, pending });
            }
        };

        let entrants = self
            .entrants
            .iter()
            .map(|s| parse_pubkey(s))
            .collect::<Result<Vec<_>, _>>()?;

        if matches!(phase, Phase::Calculating { .. }) && entrants.is_empty() {
            return Err(SnapshotError::EmptyCalculatingRound);
        }

        let required = config
            .entrance_fee
            .checked_mul(entrants.len() as u64)
            .unwrap_or(u64::MAX);
        if self.collected_balance < required {
            return Err(SnapshotError::BalanceBelowFees {
                balance: self.collected_balance,
                required,
            });
        }

        let recent_winner = self
            .recent_winner
            .as_deref()
            .map(parse_pubkey)
            .transpose()?;

        Ok(Round {
            phase,
            ledger: EntryLedger::from_parts(config.entrance_fee, entrants, self.collected_balance),
            opened_at: self.opened_at,
            recent_winner,
            round: self.round,
            last_payout_fault: None,
        })
    }
}
