use solana_sdk::pubkey::Pubkey;

use crate::errors::PayoutError;
use crate::state::RequestId;

/// Moves the collected pot to the winner.
///
/// A transfer either completes in full or returns an error having moved
/// nothing. Called while the raffle holds its round lock; implementations get
/// plain values only and must not call back into the raffle.
pub trait PayoutExecutor: Send + Sync {
    fn pay(&self, recipient: &Pubkey, amount: u64) -> Result<(), PayoutError>;
}

/// Record of a payout that failed, left in place while the round stays calculating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutFault {
    pub request_id: RequestId,
    pub winner: Pubkey,
    pub amount: u64,
    pub reason: String,
    /// Unix timestamp of the failed attempt.
    pub at: i64,
}
