//! Time-windowed raffle settled by an asynchronous randomness oracle.
//!
//! Participants pay an entrance fee to join the open round. Once the round has
//! been open for the configured interval and holds at least one entry, an
//! external keeper closes it and the raffle requests randomness from the
//! oracle. When the oracle answers, the winner is drawn, paid the whole pot,
//! and the raffle reopens.
//!
//! ## Round lifecycle
//!
//! 1. **Enter**: [`Raffle::enter`] appends a participant while the round is open.
//! 2. **Upkeep**: [`Raffle::check_upkeep`] reports whether the round is due;
//!    [`Raffle::perform_upkeep`] re-checks, requests randomness, and moves the
//!    round to `Calculating`.
//! 3. **Fulfill**: the oracle authority calls [`Raffle::fulfill_random_words`];
//!    the winner `entrants[word mod players]` is paid, the round is reset,
//!    and it is `Open` again.
//!
//! Every public operation runs under one lock, so transitions never interleave.

pub mod clock;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod payout;
pub mod snapshot;
pub mod state;
pub mod upkeep;

mod instructions;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use solana_sdk::pubkey::Pubkey;

use crate::clock::Clock;
use crate::errors::{
    ConfigError, EntryError, FulfillError, IndexOutOfRange, SnapshotError, UpkeepError,
};
use crate::events::{EventSink, NoopSink};
use crate::instructions::Context;
use crate::oracle::{RandomWord, RandomnessOracle, RandomnessRequest};
use crate::payout::{PayoutExecutor, PayoutFault};
use crate::snapshot::RoundSnapshot;
use crate::state::{RaffleConfig, RaffleState, RequestId, Round};

/// Consistent read of the current round, see [`Raffle::view`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaffleView {
    pub state: RaffleState,
    pub pending_request: Option<RequestId>,
    pub number_of_players: usize,
    pub balance: u64,
    pub recent_winner: Option<Pubkey>,
    pub latest_timestamp: i64,
    pub round: u64,
    pub last_payout_fault: Option<PayoutFault>,
}

/// A raffle instance: immutable config, the shared round, and its collaborators.
///
/// `Raffle` is `Send + Sync`; share it behind an `Arc` between entry handlers,
/// the keeper, and the oracle fulfiller.
pub struct Raffle {
    config: RaffleConfig,
    round: Mutex<Round>,
    oracle: Arc<dyn RandomnessOracle>,
    payout: Arc<dyn PayoutExecutor>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl Raffle {
    /// Create a raffle whose first round opens now.
    pub fn new(
        config: RaffleConfig,
        oracle: Arc<dyn RandomnessOracle>,
        payout: Arc<dyn PayoutExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let round = Round::open(config.entrance_fee, clock.unix_timestamp());
        Ok(Self {
            config,
            round: Mutex::new(round),
            oracle,
            payout,
            clock,
            events: Arc::new(NoopSink),
        })
    }

    /// Resume a raffle from a stored [`RoundSnapshot`].
    pub fn from_snapshot(
        config: RaffleConfig,
        snapshot: &RoundSnapshot,
        oracle: Arc<dyn RandomnessOracle>,
        payout: Arc<dyn PayoutExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SnapshotError> {
        let round = snapshot.restore(&config)?;
        Ok(Self {
            config,
            round: Mutex::new(round),
            oracle,
            payout,
            clock,
            events: Arc::new(NoopSink),
        })
    }

    /// Route [`RaffleEvent`](events::RaffleEvent)s to `events`.
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    // Handlers only write after every fallible step, so a poisoned round is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, Round> {
        self.round.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn context<'a>(&'a self, round: &'a mut Round) -> Context<'a> {
        Context {
            round,
            config: &self.config,
            now: self.clock.unix_timestamp(),
            events: self.events.as_ref(),
        }
    }

    /// Enter the current round, paying `amount_paid` lamports.
    pub fn enter(&self, participant: &Pubkey, amount_paid: u64) -> Result<(), EntryError> {
        let mut round = self.lock();
        instructions::enter::handler(self.context(&mut round), *participant, amount_paid)
    }

    /// Whether [`perform_upkeep`](Self::perform_upkeep) would close the round now.
    pub fn check_upkeep(&self) -> bool {
        let round = self.lock();
        instructions::check_upkeep::handler(&round, &self.config, self.clock.unix_timestamp())
    }

    /// Close the round and request randomness, returning the oracle's request id.
    pub fn perform_upkeep(&self) -> Result<RequestId, UpkeepError> {
        let mut round = self.lock();
        instructions::perform_upkeep::handler(self.context(&mut round), self.oracle.as_ref())
    }

    /// Deliver randomness for the pending request. Only the oracle authority may call this.
    pub fn fulfill_random_words(
        &self,
        caller: &Pubkey,
        request_id: RequestId,
        random_words: &[RandomWord],
    ) -> Result<(), FulfillError> {
        let authority = self.oracle.authority();
        let mut round = self.lock();
        instructions::fulfill_random_words::handler(
            self.context(&mut round),
            self.payout.as_ref(),
            &authority,
            caller,
            request_id,
            random_words,
        )
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> u64 {
        self.config.interval
    }

    pub fn num_words(&self) -> u32 {
        self.config.num_words
    }

    pub fn request_confirmations(&self) -> u16 {
        self.config.request_confirmations
    }

    pub fn config(&self) -> &RaffleConfig {
        &self.config
    }

    pub fn number_of_players(&self) -> usize {
        self.lock().ledger.count()
    }

    /// Player at `index` in the current round.
    pub fn player(&self, index: usize) -> Result<Pubkey, IndexOutOfRange> {
        self.lock().ledger.entrant_at(index)
    }

    /// Lamports collected in the current round.
    pub fn balance(&self) -> u64 {
        self.lock().ledger.total_balance()
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.lock().recent_winner
    }

    pub fn lottery_state(&self) -> RaffleState {
        self.lock().state()
    }

    /// Unix timestamp at which the current round opened.
    pub fn latest_timestamp(&self) -> i64 {
        self.lock().opened_at
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.lock().phase.pending_request()
    }

    /// The outstanding request and its parameters, rebuilt from the frozen
    /// round. Hosts use it to re-issue a request after restoring a snapshot.
    pub fn pending_randomness_request(&self) -> Option<(RequestId, RandomnessRequest)> {
        let round = self.lock();
        let request_id = round.phase.pending_request()?;
        Some((
            request_id,
            instructions::perform_upkeep::randomness_request(&round, &self.config),
        ))
    }

    /// Number of completed rounds.
    pub fn round(&self) -> u64 {
        self.lock().round
    }

    pub fn last_payout_fault(&self) -> Option<PayoutFault> {
        self.lock().last_payout_fault.clone()
    }

    /// Every round field read under one lock acquisition.
    pub fn view(&self) -> RaffleView {
        let round = self.lock();
        RaffleView {
            state: round.state(),
            pending_request: round.phase.pending_request(),
            number_of_players: round.ledger.count(),
            balance: round.ledger.total_balance(),
            recent_winner: round.recent_winner,
            latest_timestamp: round.opened_at,
            round: round.round,
            last_payout_fault: round.last_payout_fault.clone(),
        }
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot::capture(&self.lock())
    }
}
