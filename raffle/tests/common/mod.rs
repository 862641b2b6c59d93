#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use raffle::clock::Clock;
use raffle::errors::{OracleError, PayoutError};
use raffle::events::{EventSink, RaffleEvent};
use raffle::oracle::{RandomnessOracle, RandomnessRequest};
use raffle::payout::PayoutExecutor;
use raffle::state::{RaffleConfig, RequestId};
use raffle::Raffle;
use solana_sdk::pubkey::Pubkey;

pub const START: i64 = 1_700_000_000;
pub const FEE: u64 = 100;
pub const INTERVAL: u64 = 30;

pub fn key(n: u8) -> Pubkey {
    Pubkey::new_from_array([n; 32])
}

pub fn oracle_authority() -> Pubkey {
    key(200)
}

/// Clock that only moves when told to.
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn unix_timestamp(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Oracle that records requests and hands out ids starting at 1.
pub struct ScriptedOracle {
    next_id: AtomicU64,
    refuse: AtomicBool,
    pub requests: Mutex<Vec<RandomnessRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            refuse: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl RandomnessOracle for ScriptedOracle {
    fn authority(&self) -> Pubkey {
        oracle_authority()
    }

    fn request_random_words(&self, request: &RandomnessRequest) -> Result<RequestId, OracleError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(OracleError::QueueFull);
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

/// Payout executor that records transfers and can be switched to reject them.
pub struct RecordingPayout {
    failing: AtomicBool,
    pub transfers: Mutex<Vec<(Pubkey, u64)>>,
}

impl RecordingPayout {
    pub fn new() -> Self {
        Self {
            failing: AtomicBool::new(false),
            transfers: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn transfers(&self) -> Vec<(Pubkey, u64)> {
        self.transfers.lock().unwrap().clone()
    }
}

impl PayoutExecutor for RecordingPayout {
    fn pay(&self, recipient: &Pubkey, amount: u64) -> Result<(), PayoutError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PayoutError::Rejected {
                recipient: *recipient,
            });
        }
        self.transfers.lock().unwrap().push((*recipient, amount));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink(pub Mutex<Vec<RaffleEvent>>);

impl RecordingSink {
    pub fn events(&self) -> Vec<RaffleEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: RaffleEvent) {
        self.0.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub raffle: Arc<Raffle>,
    pub clock: Arc<ManualClock>,
    pub oracle: Arc<ScriptedOracle>,
    pub payout: Arc<RecordingPayout>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RaffleConfig::new(FEE, INTERVAL))
    }

    pub fn with_config(config: RaffleConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let oracle = Arc::new(ScriptedOracle::new());
        let payout = Arc::new(RecordingPayout::new());
        let sink = Arc::new(RecordingSink::default());
        let raffle = Raffle::new(config, oracle.clone(), payout.clone(), clock.clone())
            .unwrap()
            .with_event_sink(sink.clone());
        Self {
            raffle: Arc::new(raffle),
            clock,
            oracle,
            payout,
            sink,
        }
    }

    /// Enter `n` distinct players (keys 1..=n) at the exact fee.
    pub fn enter_players(&self, n: u8) {
        for i in 1..=n {
            self.raffle.enter(&key(i), FEE).unwrap();
        }
    }

    pub fn pass_interval(&self) {
        self.clock.advance(INTERVAL as i64 + 1);
    }
}
