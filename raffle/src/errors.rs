use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::state::{RaffleState, RequestId};

/// Rejections from [`Raffle::enter`](crate::Raffle::enter).
///
/// Every variant leaves the round untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// The amount paid is below the entrance fee.
    #[error("not enough lamports entered: required {required}, paid {paid}")]
    InsufficientPayment { required: u64, paid: u64 },
    /// A winner is being calculated; entries reopen after fulfillment.
    #[error("raffle is not open")]
    RoundClosed,
    /// The collected balance would overflow u64 (practically unreachable).
    #[error("collected balance overflow")]
    BalanceOverflow,
}

/// Rejections from [`Raffle::perform_upkeep`](crate::Raffle::perform_upkeep).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpkeepError {
    /// The upkeep predicate is false at the time of the call.
    #[error("upkeep not needed (balance: {balance}, players: {players}, state: {state})")]
    UpkeepNotNeeded {
        balance: u64,
        players: usize,
        state: RaffleState,
    },
    /// A randomness request is already outstanding.
    #[error("a winner is already being calculated")]
    AlreadyCalculating,
    /// The oracle refused the randomness request; the round stays open.
    #[error("randomness request rejected: {0}")]
    OracleUnavailable(#[from] OracleError),
}

/// Rejections from [`Raffle::fulfill_random_words`](crate::Raffle::fulfill_random_words).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FulfillError {
    /// The caller is not the oracle authority the raffle was built with.
    #[error("caller {caller} is not the oracle authority")]
    UnauthorizedOracle { caller: Pubkey },
    /// The id does not match the pending request (or nothing is pending).
    #[error("unknown randomness request {request_id}")]
    UnknownRequest { request_id: RequestId },
    /// The fulfillment carried an empty word list.
    #[error("fulfillment carried no random words")]
    NoRandomWords,
    /// The pending round has nobody to draw from.
    ///
    /// Not produced through [`Raffle`](crate::Raffle): upkeep only closes a
    /// round with entrants, and restore refuses an empty calculating round.
    /// The handler still checks before it draws.
    #[error("round has no entrants to draw from")]
    NoEntrants,
    /// The winner could not be paid. The round stays calculating.
    #[error("payout of {amount} lamports to {winner} failed for request {request_id}")]
    PayoutFailed {
        request_id: RequestId,
        winner: Pubkey,
        amount: u64,
        #[source]
        source: PayoutError,
    },
}

/// Returned by [`Raffle::player`](crate::Raffle::player) for an index past the current round.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no player at index {index} (players: {len})")]
pub struct IndexOutOfRange {
    pub index: usize,
    pub len: usize,
}

/// Failures reported by a [`RandomnessOracle`](crate::oracle::RandomnessOracle).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("request queue is full")]
    QueueFull,
    #[error("oracle is shut down")]
    Closed,
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Failures reported by a [`PayoutExecutor`](crate::payout::PayoutExecutor).
///
/// Payouts are all-or-nothing: any error means no lamports moved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayoutError {
    #[error("recipient {recipient} rejected the transfer")]
    Rejected { recipient: Pubkey },
    #[error("balance of {recipient} would overflow")]
    Overflow { recipient: Pubkey },
    #[error("transfer failed: {0}")]
    Transfer(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("entrance fee must be greater than zero")]
    ZeroEntranceFee,
    #[error("at least one random word must be requested")]
    ZeroNumWords,
    #[error("callback compute limit must be greater than zero")]
    ZeroCallbackLimit,
}

/// Rejections when rebuilding a raffle from a [`RoundSnapshot`](crate::snapshot::RoundSnapshot).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("state {state} does not agree with pending request {pending:?}")]
    PendingRequestMismatch {
        state: RaffleState,
        pending: Option<RequestId>,
    },
    #[error("calculating round has no entrants")]
    EmptyCalculatingRound,
    #[error("collected balance {balance} is below {required} owed by entrants")]
    BalanceBelowFees { balance: u64, required: u64 },
    #[error("invalid pubkey {0:?}")]
    InvalidPubkey(String),
}
