//! Randomness oracle seam.
//!
//! The raffle asks the oracle for words in [`perform_upkeep`] and receives them
//! later through [`fulfill_random_words`], called by whoever holds the oracle's
//! authority key. Nothing here produces randomness.
//!
//! [`perform_upkeep`]: crate::Raffle::perform_upkeep
//! [`fulfill_random_words`]: crate::Raffle::fulfill_random_words

use solana_sdk::pubkey::Pubkey;

use crate::errors::OracleError;
use crate::state::RequestId;

/// One 32-byte random word, read as an unsigned 256-bit big-endian integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RandomWord(pub [u8; 32]);

impl RandomWord {
    /// Word whose integer value is `value`.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `self mod modulus` over all 256 bits. Returns 0 for a zero modulus.
    pub fn modulo(&self, modulus: u64) -> u64 {
        if modulus == 0 {
            return 0;
        }
        let m = u128::from(modulus);
        let rem = self
            .0
            .iter()
            .fold(0u128, |acc, byte| ((acc << 8) | u128::from(*byte)) % m);
        // rem < modulus
        rem as u64
    }
}

impl From<[u8; 32]> for RandomWord {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Parameters sent to the oracle when a round closes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    /// Round being closed.
    pub round: u64,
    /// Entropy bound to the closing round's state.
    pub seed: [u8; 32],
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_compute_limit: u32,
    pub num_words: u32,
}

/// Client side of an asynchronous randomness provider.
///
/// Implementations are called while the raffle holds its round lock, so they
/// must not call back into the raffle. Delivery happens later, out of band.
pub trait RandomnessOracle: Send + Sync {
    /// Key allowed to deliver fulfillments.
    fn authority(&self) -> Pubkey;

    /// Start an out-of-band request and return its id.
    fn request_random_words(&self, request: &RandomnessRequest) -> Result<RequestId, OracleError>;
}
