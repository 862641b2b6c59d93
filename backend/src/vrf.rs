//! Deterministic randomness for the mock oracle.
//!
//! Uses HMAC-SHA256 keyed by the oracle's secret to produce a 32-byte
//! output that is reproducible from the request but unpredictable without
//! the secret. Multi-word requests are expanded from that single output.

use hmac::{Hmac, Mac};
use raffle::oracle::RandomWord;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Base output for one request.
///
/// ```text
/// output = HMAC-SHA256(secret, seed || round_le || request_id_le)
/// ```
pub fn compute_randomness(hmac_secret: &[u8], seed: &[u8; 32], round: u64, request_id: u64) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(hmac_secret).expect("HMAC accepts keys of any size");

    mac.update(seed);
    mac.update(&round.to_le_bytes());
    mac.update(&request_id.to_le_bytes());

    let bytes = mac.finalize().into_bytes();
    let mut output = [0u8; 32];
    output.copy_from_slice(&bytes);
    output
}

/// Expand a base output into `num_words` words: `word[i] = SHA256(base || i_le)`.
pub fn expand_randomness(base: &[u8; 32], num_words: u32) -> Vec<RandomWord> {
    (0..num_words)
        .map(|i| {
            let mut hasher = Sha256::new();
            hasher.update(base);
            hasher.update(i.to_le_bytes());
            let mut word = [0u8; 32];
            word.copy_from_slice(&hasher.finalize());
            RandomWord(word)
        })
        .collect()
}
