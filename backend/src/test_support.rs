//! Shared wiring for service unit tests.

use raffle::Raffle;
use raffle::clock::Clock;
use raffle::state::RaffleConfig;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::mpsc;

use crate::coordinator::{MockCoordinator, RandomWordsRequested};
use crate::events::BroadcastSink;
use crate::metrics::Metrics;
use crate::treasury::Treasury;

pub const FEE: u64 = 100;
pub const INTERVAL: u64 = 30;
pub const SECRET: &[u8] = b"test-secret";

pub fn key(n: u8) -> Pubkey {
    Pubkey::new_from_array([n; 32])
}

pub fn authority() -> Pubkey {
    key(200)
}

pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn unix_timestamp(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Fixture {
    pub raffle: Arc<Raffle>,
    pub coordinator: Arc<MockCoordinator>,
    pub requests: mpsc::Receiver<RandomWordsRequested>,
    pub treasury: Arc<Treasury>,
    pub clock: Arc<ManualClock>,
    pub metrics: Arc<Metrics>,
    pub sink: BroadcastSink,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(16, [])
    }

    pub fn with_queue(capacity: usize) -> Self {
        Self::build(capacity, [])
    }

    pub fn rejecting(recipient: Pubkey) -> Self {
        Self::build(16, [recipient])
    }

    fn build(capacity: usize, reject: impl IntoIterator<Item = Pubkey>) -> Self {
        let (coordinator, requests) = MockCoordinator::new(authority(), capacity);
        let coordinator = Arc::new(coordinator);
        let treasury = Arc::new(Treasury::new(0, reject));
        let clock = Arc::new(ManualClock(AtomicI64::new(1_700_000_000)));
        let sink = BroadcastSink::new(64);
        let raffle = Raffle::new(
            RaffleConfig::new(FEE, INTERVAL),
            coordinator.clone(),
            treasury.clone(),
            clock.clone(),
        )
        .unwrap()
        .with_event_sink(Arc::new(sink.clone()));

        Self {
            raffle: Arc::new(raffle),
            coordinator,
            requests,
            treasury,
            clock,
            metrics: Arc::new(Metrics::new()),
            sink,
        }
    }

    /// Pay `amount` into the treasury and enter player `n`.
    pub fn enter(&self, n: u8, amount: u64) {
        self.treasury.deposit(amount).unwrap();
        self.raffle.enter(&key(n), amount).unwrap();
    }

    pub fn pass_interval(&self) {
        self.clock.advance(INTERVAL as i64);
    }
}
