//! In-memory lamport ledger that stands in for on-chain transfers.
//!
//! Entry fees are deposited into the vault before the raffle accepts them and
//! refunded if it does not. Payouts move lamports from the vault to the
//! winner's credited balance, all or nothing.

use raffle::errors::PayoutError;
use raffle::payout::PayoutExecutor;
use solana_sdk::pubkey::Pubkey;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use tracing::info;

#[derive(Debug, Default)]
struct Ledger {
    vault: u64,
    credited: HashMap<Pubkey, u64>,
}

pub struct Treasury {
    ledger: Mutex<Ledger>,
    reject: HashSet<Pubkey>,
}

impl Treasury {
    /// Treasury holding `float` lamports, refusing payouts to `reject`.
    pub fn new(float: u64, reject: impl IntoIterator<Item = Pubkey>) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                vault: float,
                credited: HashMap::new(),
            }),
            reject: reject.into_iter().collect(),
        }
    }

    fn ledger(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take an entry payment into the vault.
    pub fn deposit(&self, amount: u64) -> anyhow::Result<()> {
        let mut ledger = self.ledger();
        ledger.vault = ledger
            .vault
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("treasury vault overflow"))?;
        Ok(())
    }

    /// Return a deposit the raffle did not accept.
    pub fn refund(&self, amount: u64) {
        let mut ledger = self.ledger();
        ledger.vault = ledger.vault.saturating_sub(amount);
    }

    pub fn vault(&self) -> u64 {
        self.ledger().vault
    }

    /// Lamports credited to `recipient` by past payouts.
    pub fn balance_of(&self, recipient: &Pubkey) -> u64 {
        self.ledger().credited.get(recipient).copied().unwrap_or(0)
    }

    /// Every credited balance, keyed by base58 pubkey.
    pub fn credits(&self) -> BTreeMap<String, u64> {
        self.ledger()
            .credited
            .iter()
            .map(|(recipient, amount)| (recipient.to_string(), *amount))
            .collect()
    }

    /// Replace credited balances with stored ones. Nothing changes on error.
    pub fn restore_credits(&self, credits: &BTreeMap<String, u64>) -> anyhow::Result<()> {
        let restored = credits
            .iter()
            .map(|(recipient, amount)| {
                Pubkey::from_str(recipient)
                    .map(|key| (key, *amount))
                    .map_err(|_| anyhow::anyhow!("invalid credited pubkey: {recipient}"))
            })
            .collect::<anyhow::Result<HashMap<_, _>>>()?;
        self.ledger().credited = restored;
        Ok(())
    }
}

impl PayoutExecutor for Treasury {
    fn pay(&self, recipient: &Pubkey, amount: u64) -> Result<(), PayoutError> {
        if self.reject.contains(recipient) {
            return Err(PayoutError::Rejected {
                recipient: *recipient,
            });
        }

        let mut ledger = self.ledger();
        let vault = ledger.vault.checked_sub(amount).ok_or_else(|| {
            PayoutError::Transfer(format!(
                "vault holds {} lamports, payout needs {amount}",
                ledger.vault
            ))
        })?;
        let credited = ledger
            .credited
            .get(recipient)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(PayoutError::Overflow {
                recipient: *recipient,
            })?;

        ledger.vault = vault;
        ledger.credited.insert(*recipient, credited);
        info!(recipient = %recipient, amount, "Payout transferred");
        Ok(())
    }
}
