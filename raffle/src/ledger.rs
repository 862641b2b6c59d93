use solana_sdk::pubkey::Pubkey;

use crate::errors::{EntryError, IndexOutOfRange};
use crate::state::RaffleState;

/// Entrants and collected lamports of the current round.
///
/// Insertion order is the selection key: entrant `i` wins when the drawn
/// value is `i` modulo the entrant count. The same key may appear many times.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryLedger {
    entrance_fee: u64,
    entrants: Vec<Pubkey>,
    balance: u64,
}

impl EntryLedger {
    pub fn new(entrance_fee: u64) -> Self {
        Self {
            entrance_fee,
            entrants: Vec::new(),
            balance: 0,
        }
    }

    pub(crate) fn from_parts(entrance_fee: u64, entrants: Vec<Pubkey>, balance: u64) -> Self {
        Self {
            entrance_fee,
            entrants,
            balance,
        }
    }

    /// Append one entry, returning the new entrant count.
    ///
    /// Overpayment is kept and counted exactly as paid.
    pub fn record_entry(
        &mut self,
        state: RaffleState,
        participant: Pubkey,
        amount_paid: u64,
    ) -> Result<usize, EntryError> {
        if amount_paid < self.entrance_fee {
            return Err(EntryError::InsufficientPayment {
                required: self.entrance_fee,
                paid: amount_paid,
            });
        }
        if state != RaffleState::Open {
            return Err(EntryError::RoundClosed);
        }

        let balance = self
            .balance
            .checked_add(amount_paid)
            .ok_or(EntryError::BalanceOverflow)?;

        self.entrants.push(participant);
        self.balance = balance;
        Ok(self.entrants.len())
    }

    pub fn entrant_at(&self, index: usize) -> Result<Pubkey, IndexOutOfRange> {
        self.entrants.get(index).copied().ok_or(IndexOutOfRange {
            index,
            len: self.entrants.len(),
        })
    }

    pub fn count(&self) -> usize {
        self.entrants.len()
    }

    pub fn total_balance(&self) -> u64 {
        self.balance
    }

    pub fn entrance_fee(&self) -> u64 {
        self.entrance_fee
    }

    pub fn entrants(&self) -> &[Pubkey] {
        &self.entrants
    }

    /// Clear entrants and balance together. Only the fulfillment transition calls this.
    pub(crate) fn reset(&mut self) {
        self.entrants.clear();
        self.balance = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    #[test]
    fn records_entries_in_arrival_order() {
        let mut ledger = EntryLedger::new(100);
        assert_eq!(ledger.record_entry(RaffleState::Open, key(1), 100), Ok(1));
        assert_eq!(ledger.record_entry(RaffleState::Open, key(2), 100), Ok(2));
        assert_eq!(ledger.record_entry(RaffleState::Open, key(1), 100), Ok(3));

        assert_eq!(ledger.entrants(), &[key(1), key(2), key(1)]);
        assert_eq!(ledger.total_balance(), 300);
    }

    #[test]
    fn keeps_overpayment_as_paid() {
        let mut ledger = EntryLedger::new(100);
        ledger.record_entry(RaffleState::Open, key(1), 250).unwrap();
        assert_eq!(ledger.total_balance(), 250);
        assert_eq!(ledger.count(), 1);
    }

    #[test]
    fn underpayment_is_checked_before_state() {
        let mut ledger = EntryLedger::new(100);
        assert_eq!(
            ledger.record_entry(RaffleState::Calculating, key(1), 99),
            Err(EntryError::InsufficientPayment {
                required: 100,
                paid: 99
            })
        );
        assert_eq!(
            ledger.record_entry(RaffleState::Calculating, key(1), 100),
            Err(EntryError::RoundClosed)
        );
        assert_eq!(ledger.count(), 0);
        assert_eq!(ledger.total_balance(), 0);
    }

    #[test]
    fn overflow_leaves_ledger_untouched() {
        let mut ledger = EntryLedger::from_parts(1, vec![key(1)], u64::MAX - 1);
        assert_eq!(
            ledger.record_entry(RaffleState::Open, key(2), 2),
            Err(EntryError::BalanceOverflow)
        );
        assert_eq!(ledger.count(), 1);
        assert_eq!(ledger.total_balance(), u64::MAX - 1);
    }

    #[test]
    fn entrant_lookup_fails_after_reset() {
        let mut ledger = EntryLedger::new(100);
        ledger.record_entry(RaffleState::Open, key(9), 100).unwrap();
        assert_eq!(ledger.entrant_at(0), Ok(key(9)));

        ledger.reset();
        assert_eq!(ledger.entrant_at(0), Err(IndexOutOfRange { index: 0, len: 0 }));
        assert_eq!(ledger.total_balance(), 0);
    }
}
